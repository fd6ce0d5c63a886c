//! Declaration-time errors
//!
//! These are programming mistakes in how arguments are declared, so unlike
//! runtime input problems they are returned to the caller instead of being
//! recorded as [`ErrorRecord`](crate::domain::ErrorRecord)s.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("argument needs a name, flags or a dest")]
    MissingName,

    #[error("invalid option string '{0}': must be '-x' or '--name'")]
    InvalidFlag(String),

    #[error("positional argument '{name}' cannot also have option strings ({extra})")]
    PositionalWithFlags { name: String, extra: String },

    #[error("'required' is an invalid option for positional argument '{0}'")]
    RequiredOnPositional(String),

    #[error("action {action} is only valid for flags, not positional argument '{name}'")]
    FlagActionOnPositional { name: String, action: String },

    #[error("required positional argument '{required}' cannot follow optional positional '{optional}'")]
    PositionalOrder { optional: String, required: String },

    #[error("positional argument '{positional}' cannot follow multi-valued positional '{multiple}' unless it is the last one, required and single-valued")]
    PositionalAfterMultiple { multiple: String, positional: String },

    #[error("argument '{0}' stores a value, so nargs cannot be 0")]
    ZeroNargs(String),

    #[error("default '{default}' of argument '{key}' is not one of its choices")]
    DefaultNotInChoices { key: String, default: String },

    #[error("conflicting destination '{0}'")]
    ConflictingDest(String),

    #[error("conflicting option string '{0}'")]
    ConflictingFlag(String),

    #[error("cannot declare '{0}' after configuration has been resolved")]
    AlreadyResolved(String),
}
