//! autocli: resolve application configuration from three channels
//!
//! Command-line arguments, INI-style config files and environment variables
//! are merged into one [`ResolvedConfig`] with the precedence
//! `command line > config file > environment`. Keys are declared once with
//! [`CliRuntime::declare`]; the runtime infers which of them are required and
//! records runtime input problems as [`ErrorRecord`]s instead of exiting.
//!
//! ```no_run
//! use autocli::{CliRuntime, DeclareOptions, RuntimeOptions};
//!
//! let mut runtime = CliRuntime::new(RuntimeOptions::new().description("Some CLI app"));
//! runtime
//!     .declare(["-s", "--sample"], DeclareOptions::new().dest("sample_var").required(true))
//!     .expect("valid declaration");
//! let config = runtime.resolve().clone();
//! for error in runtime.errors() {
//!     eprintln!("{}", error);
//! }
//! println!("{}", config);
//! ```

pub mod arguments;
pub mod config;
pub mod domain;
pub mod error;
pub mod runtime;

pub use arguments::{Action, ArgumentDeclaration, DeclareOptions, Nargs};
pub use config::ConfigFileLoader;
pub use domain::{Channel, ConfigValue, ErrorRecord, ResolvedConfig};
pub use error::DeclarationError;
pub use runtime::{CliRuntime, RuntimeOptions};
