//! Inline assembly operand constraints.
//!
//! RISC-V defines three immediate constraint letters on top of the generic
//! ones handled by the asm parser:
//!
//! | Letter | Meaning                                  | Range           |
//! |--------|------------------------------------------|-----------------|
//! | `I`    | 12-bit signed immediate                  | `-2048..=2047`  |
//! | `J`    | integer zero                             | `0..=0`         |
//! | `K`    | 5-bit unsigned immediate (CSR accesses)  | `0..=31`        |
//!
//! Anything else is rejected. A rejection is reported as a diagnostic by the
//! caller; it never aborts the rest of the asm statement.

use super::error::{ConstraintError, ConstraintResult};
use std::fmt;

/// Inclusive range an immediate operand must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImmediateRange {
    pub min: i64,
    pub max: i64,
}

impl ImmediateRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Range admitting a single value.
    pub const fn exactly(value: i64) -> Self {
        Self::new(value, value)
    }

    pub const fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl fmt::Display for ImmediateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// What a recognized constraint letter requires of its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintInfo {
    RequiresImmediate(ImmediateRange),
}

impl ConstraintInfo {
    pub const fn immediate_range(&self) -> ImmediateRange {
        match self {
            ConstraintInfo::RequiresImmediate(range) => *range,
        }
    }
}

const SIMM12: ImmediateRange = ImmediateRange::new(-2048, 2047);
const ZERO: ImmediateRange = ImmediateRange::exactly(0);
const UIMM5: ImmediateRange = ImmediateRange::new(0, 31);

/// Validate a single target-specific constraint letter.
pub fn validate_asm_constraint(constraint: char) -> ConstraintResult<ConstraintInfo> {
    match constraint {
        'I' => Ok(ConstraintInfo::RequiresImmediate(SIMM12)),
        'J' => Ok(ConstraintInfo::RequiresImmediate(ZERO)),
        'K' => Ok(ConstraintInfo::RequiresImmediate(UIMM5)),
        _ => Err(ConstraintError::Unrecognized { constraint }),
    }
}

/// One operand of an inline asm statement as seen by the constraint checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsmOperand {
    pub constraint: char,
    /// Constant value, when the operand is an integer constant expression.
    pub value: Option<i64>,
}

impl AsmOperand {
    pub const fn new(constraint: char, value: Option<i64>) -> Self {
        Self { constraint, value }
    }
}

/// Diagnostic produced for an offending asm operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmDiagnostic {
    /// Position of the operand in the asm statement.
    pub operand: usize,
    pub message: String,
}

impl fmt::Display for AsmDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operand {}: {}", self.operand, self.message)
    }
}

/// Check every operand of an asm statement.
///
/// Returns one diagnostic per bad operand; well-formed operands produce
/// nothing. Checking continues past a rejected operand.
pub fn check_asm_operands(operands: &[AsmOperand]) -> Vec<AsmDiagnostic> {
    let mut diagnostics = Vec::new();

    for (idx, operand) in operands.iter().enumerate() {
        match validate_asm_constraint(operand.constraint) {
            Ok(info) => {
                let range = info.immediate_range();
                match operand.value {
                    Some(value) if !range.contains(value) => {
                        diagnostics.push(AsmDiagnostic {
                            operand: idx,
                            message: format!(
                                "value '{}' out of range for constraint '{}' (expected {})",
                                value, operand.constraint, range
                            ),
                        });
                    }
                    Some(_) => {}
                    None => {
                        diagnostics.push(AsmDiagnostic {
                            operand: idx,
                            message: format!(
                                "constraint '{}' expects an integer constant expression",
                                operand.constraint
                            ),
                        });
                    }
                }
            }
            Err(err) => {
                log::debug!("Rejected asm operand {}: {}", idx, err);
                diagnostics.push(AsmDiagnostic {
                    operand: idx,
                    message: err.to_string(),
                });
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simm12_bounds() {
        let range = validate_asm_constraint('I').unwrap().immediate_range();
        for value in -2048..=2047 {
            assert!(range.contains(value), "{value} should be accepted");
        }
        assert!(!range.contains(2048));
        assert!(!range.contains(-2049));
    }

    #[test]
    fn test_zero() {
        let range = validate_asm_constraint('J').unwrap().immediate_range();
        assert!(range.contains(0));
        assert!(!range.contains(1));
        assert!(!range.contains(-1));
    }

    #[test]
    fn test_uimm5_bounds() {
        let range = validate_asm_constraint('K').unwrap().immediate_range();
        for value in 0..=31 {
            assert!(range.contains(value));
        }
        assert!(!range.contains(-1));
        assert!(!range.contains(32));
    }

    #[test]
    fn test_unknown_letter_rejected() {
        for letter in ['i', 'L', 'r', 'm', '0', '%'] {
            assert_eq!(
                validate_asm_constraint(letter),
                Err(ConstraintError::Unrecognized { constraint: letter })
            );
        }
        assert_eq!(
            validate_asm_constraint('Q').unwrap_err().to_string(),
            "invalid input constraint 'Q' in asm"
        );
    }

    #[test]
    fn test_check_continues_after_rejection() {
        let operands = [
            AsmOperand::new('Z', Some(1)),
            AsmOperand::new('I', Some(100)),
            AsmOperand::new('K', Some(32)),
            AsmOperand::new('J', Some(0)),
        ];
        let diagnostics = check_asm_operands(&operands);

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].operand, 0);
        assert!(diagnostics[0].message.contains("'Z'"));
        assert_eq!(diagnostics[1].operand, 2);
        assert!(diagnostics[1].message.contains("out of range"));
    }
}
