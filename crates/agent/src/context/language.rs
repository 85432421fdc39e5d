//! Script-based language detection.

use verdant_core::context::Language;
use verdant_core::message::Message;

/// Detect the language of a single text from the script of its letters.
///
/// Returns `None` when the text has no letters or the Cyrillic and Latin
/// counts are equal.
pub fn detect(text: &str) -> Option<Language> {
    let (mut cyrillic, mut latin) = (0usize, 0usize);
    for c in text.chars() {
        if is_cyrillic(c) {
            cyrillic += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }
    match cyrillic.cmp(&latin) {
        std::cmp::Ordering::Greater => Some(Language::Ru),
        std::cmp::Ordering::Less => Some(Language::En),
        std::cmp::Ordering::Equal => None,
    }
}

/// Majority vote over the given user messages. A tie leaves the language unset.
pub fn vote<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Option<Language> {
    let (mut ru, mut en) = (0usize, 0usize);
    for message in messages {
        match detect(&message.content) {
            Some(Language::Ru) => ru += 1,
            Some(Language::En) => en += 1,
            None => {}
        }
    }
    match ru.cmp(&en) {
        std::cmp::Ordering::Greater => Some(Language::Ru),
        std::cmp::Ordering::Less => Some(Language::En),
        std::cmp::Ordering::Equal => None,
    }
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_script() {
        assert_eq!(detect("Какие растения подходят для тени?"), Some(Language::Ru));
        assert_eq!(detect("Which plants like shade?"), Some(Language::En));
        assert_eq!(detect("Посади hosta у забора"), Some(Language::Ru));
    }

    #[test]
    fn no_letters_is_ambiguous() {
        assert_eq!(detect(""), None);
        assert_eq!(detect("123 ?!"), None);
        assert_eq!(detect("ab аб"), None);
    }

    #[test]
    fn vote_picks_majority_and_ties_are_unset() {
        let msgs = [
            Message::user("привет"),
            Message::user("hello"),
            Message::user("как дела"),
        ];
        assert_eq!(vote(&msgs), Some(Language::Ru));

        let tied = [Message::user("привет"), Message::user("hello")];
        assert_eq!(vote(&tied), None);
        assert_eq!(vote(std::iter::empty()), None);
    }
}
