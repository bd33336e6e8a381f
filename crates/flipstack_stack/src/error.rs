//! Construction errors

use flipstack_core::ConfigError;
use thiserror::Error;

/// Errors raised while building a section stack
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    /// No sections were supplied
    #[error("Section stack needs at least one section")]
    Empty,

    /// Two sections share an id
    #[error("Duplicate section id `{0}`")]
    DuplicateId(String),
}

/// Errors raised while building a navigation engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stack(#[from] StackError),
}
