//! JSON encoding for files written by Taskdeck.
//!
//! Output is pretty-printed with 2-space indentation and a trailing newline,
//! so a credential document stays readable when inspected by hand.

mod json;

pub use json::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};
