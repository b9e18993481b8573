//! Response line parsing.
//!
//! [`classify`] decides which kind of response a line is from its first
//! few tokens; [`scan`] holds the index-based primitives the dispatcher
//! uses to pull fields out of a line without a full tokenizer.

mod classify;
pub mod scan;

pub use classify::{ResponseKind, classify};
