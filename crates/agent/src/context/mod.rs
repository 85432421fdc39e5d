//! Per-request context construction.
//!
//! | Derived field | Source |
//! |---------------|--------|
//! | `history` | caller history minus typing/error placeholders |
//! | `recent_image_analyses` | newest non-empty analysis notes, oldest first |
//! | `has_recent_images_in_history` | images within the recent-message window |
//! | `language` | current message script, else a vote over recent user turns |
//! | `attachments` | caller attachments, else images borrowed from history |

pub mod builder;
pub mod language;

pub use builder::ContextBuilder;
