// This module groups everything that describes a CHERI-extended RISC-V compilation
// target. A TargetFeaturesBuilder collects the triple, ABI name, capability-table
// ABI and the ordered "+name" feature tokens; finalize() turns it into an immutable
// TargetInfo that can be shared across threads. From the finalized state the target
// derives the preprocessor macro set, the data layout string, the register name and
// alias tables, and the inline assembly constraint rules consumed by the asm parser.

//! CHERI RISC-V target description.
//!
//! # Usage
//!
//! ```
//! use cheri_codegen::target::{Arch, MacroSet, TargetFeaturesBuilder};
//!
//! let mut builder = TargetFeaturesBuilder::new(Arch::Riscv32);
//! builder.configure(["+m", "+xcheri"]);
//! let target = builder.finalize();
//!
//! let mut macros = MacroSet::new();
//! target.target_defines(&mut macros);
//! assert_eq!(macros.get("__riscv_clen"), Some("64"));
//! ```

pub mod constraints;
pub mod error;
pub mod features;
pub mod macros;
pub mod registers;

pub use constraints::{
    check_asm_operands, validate_asm_constraint, AsmDiagnostic, AsmOperand, ConstraintInfo,
    ImmediateRange,
};
pub use error::{ConstraintError, ConstraintResult, TargetError, TargetResult};
pub use features::{Arch, CapTableAbi, Feature, FeatureSet, TargetFeaturesBuilder, TargetInfo};
pub use macros::{MacroBuilder, MacroDefinition, MacroSet};
pub use registers::{canonical_register_name, RegAlias, GCC_REG_ALIASES, GCC_REG_NAMES};
