//! Severity levels.
//!
//! Levels are named, carry a caller-supplied numeric rank (higher rank means
//! more severe) and a color token used by the development formatter.

pub mod registry;

pub use registry::*;
