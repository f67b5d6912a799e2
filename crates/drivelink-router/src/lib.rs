//! Visitor-facing routes: the link page and the login call behind it.

pub mod envelope;
mod extract;
mod public;
mod render;

pub use extract::{BAD_BODY, JsonBody};
pub use public::public_router;
