//! Error types for target configuration and inline asm constraint checks.

use thiserror::Error;

/// Errors raised while building a target description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("Unsupported target triple: {triple} (expected riscv32 or riscv64)")]
    UnknownArch {
        triple: String,
    },

    #[error("Unknown capability table ABI: {name}")]
    UnknownCapTableAbi {
        name: String,
    },
}

/// Rejection of an inline asm operand constraint.
///
/// Never fatal to a compilation: the asm parser reports it as a diagnostic
/// and carries on with the remaining operands.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("invalid input constraint '{constraint}' in asm")]
    Unrecognized {
        constraint: char,
    },
}

/// Result type alias for target configuration.
pub type TargetResult<T> = Result<T, TargetError>;

/// Result type alias for constraint validation.
pub type ConstraintResult<T> = Result<T, ConstraintError>;
