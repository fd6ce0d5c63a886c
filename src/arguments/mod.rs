//! Argument declaration registry
//!
//! Declares configuration keys once, tracks which of them are required and
//! hands the command-line side of each declaration to clap.

pub mod options;
pub mod registry;

pub use options::{Action, DeclareOptions, Nargs};
pub use registry::{infer_required_key, ArgumentDeclaration, ArgumentRegistry, ParseFailure};
