//! LLM Provider implementations for Verdant.
//!
//! All providers implement the `verdant_core::Provider` trait. The
//! orchestration core only ever talks to a [`FallbackProvider`] built by
//! [`router::build_from_config`].

pub mod fallback;
pub mod keys;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackProvider;
pub use keys::KeyRing;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, build_provider};
