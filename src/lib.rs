//! cheri-codegen - CHERI RISC-V backend support.
//!
//! Two pieces of a compiler backend for capability-extended RISC-V:
//!
//! - a target feature descriptor that turns `+name` feature tokens into the
//!   predefined macro set, data layout, register tables and inline asm
//!   constraint rules of the target, and
//! - a machine function pass that rewrites capability stores with base +
//!   immediate addressing into an explicit offset increment followed by an
//!   uninitialized store.
//!
//! # Primary Usage
//!
//! ```
//! use cheri_codegen::mir::parse_functions;
//! use cheri_codegen::passes::{MachineFunctionPass, UStorePass};
//!
//! let mut funcs = parse_functions(
//!     "f {\nentry:\n    CAPSTORE32 $x10, $x11, 8, $c12\n    RET\n}\n",
//! )?;
//! let mut pass = UStorePass::new();
//! assert!(pass.run_on_function(&mut funcs[0])?);
//! assert_eq!(funcs[0].instr_count(), 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - [`target`] - feature state, macros, registers, asm constraints
//! - [`mir`] - machine IR model and its text format
//! - [`passes`] - machine function passes

pub mod mir;
pub mod passes;
pub mod target;

pub use mir::{MachineBasicBlock, MachineFunction, MachineInstr, MachineOperand, Opcode, Register};
pub use passes::{MachineFunctionPass, PassError, PassResult, UStorePass};
pub use target::{Arch, MacroSet, TargetFeaturesBuilder, TargetInfo};
