//! Platform utilities.
//!
//! - [`path`] - Shell-like path expansion for CLI arguments

pub mod path;

pub use path::{absolutize, expand};
