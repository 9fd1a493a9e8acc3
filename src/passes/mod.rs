//! Machine function passes.
//!
//! A pass receives exclusive access to one [`MachineFunction`] at a time and
//! reports whether it changed anything, so the scheduler knows which analyses
//! to invalidate. Passes keep no state shared across functions and may run
//! on different functions in parallel.

use crate::mir::{MachineFunction, Opcode};
use thiserror::Error;

pub mod ustore;

pub use ustore::{ustore_equivalent, UStorePass, UStoreStats, USTORE_TABLE};

/// Errors that abort a pass on the current function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    #[error("{pass}: malformed {opcode} in {function}/{block} at index {index}: {reason}")]
    MalformedOperands {
        pass: &'static str,
        function: String,
        block: String,
        index: usize,
        opcode: Opcode,
        reason: String,
    },
}

/// Result type alias for pass execution.
pub type PassResult<T> = Result<T, PassError>;

pub trait MachineFunctionPass {
    fn name(&self) -> &'static str;

    /// Run on `func`; `Ok(true)` when the function was modified.
    fn run_on_function(&mut self, func: &mut MachineFunction) -> PassResult<bool>;
}
