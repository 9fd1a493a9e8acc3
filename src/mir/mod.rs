// This module models the slice of machine IR that the CHERI rewrite passes need: functions
// made of named basic blocks, blocks holding an ordered list of machine instructions, and
// instructions made of an opcode and an ordered operand list. Operands are physical integer
// registers ($xN), capability registers ($cN), virtual registers (%N) or immediates. Blocks
// support positional insert-before and removal, which is all a local rewrite needs. A small
// text format (see parser.rs) lets tests and the driver write functions by hand; Display
// prints the same format back so rewritten functions can be inspected or re-parsed.

//! Machine IR for CHERI RISC-V.
//!
//! # Text format
//!
//! ```text
//! ; Comments start with semicolon
//! store_fn {
//! entry:
//!     CAPSTORE32 $x10, $x11, 8, $c12
//!     RET
//! }
//! ```

use std::fmt;

pub mod parser;

pub use parser::{parse_functions, ParseError, ParseResult};

/// Machine opcodes known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Capability-relative stores with base + immediate addressing.
    CapStore8,
    CapStore832,
    CapStore864,
    CapStore16,
    CapStore1632,
    CapStore32,
    CapStore3264,
    CapStore64,
    // Stores through an already offset capability.
    UCapStore8,
    UCapStore832,
    UCapStore864,
    UCapStore16,
    UCapStore1632,
    UCapStore32,
    UCapStore3264,
    UCapStore64,
    CIncOffset,
    CSetBounds,
    CMove,
    Add,
    Addi,
    Lw,
    Ld,
    Sw,
    Sd,
    Nop,
    Ret,
}

impl Opcode {
    pub const ALL: [Opcode; 27] = [
        Opcode::CapStore8,
        Opcode::CapStore832,
        Opcode::CapStore864,
        Opcode::CapStore16,
        Opcode::CapStore1632,
        Opcode::CapStore32,
        Opcode::CapStore3264,
        Opcode::CapStore64,
        Opcode::UCapStore8,
        Opcode::UCapStore832,
        Opcode::UCapStore864,
        Opcode::UCapStore16,
        Opcode::UCapStore1632,
        Opcode::UCapStore32,
        Opcode::UCapStore3264,
        Opcode::UCapStore64,
        Opcode::CIncOffset,
        Opcode::CSetBounds,
        Opcode::CMove,
        Opcode::Add,
        Opcode::Addi,
        Opcode::Lw,
        Opcode::Ld,
        Opcode::Sw,
        Opcode::Sd,
        Opcode::Nop,
        Opcode::Ret,
    ];

    pub const fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            CapStore8 => "CAPSTORE8",
            CapStore832 => "CAPSTORE832",
            CapStore864 => "CAPSTORE864",
            CapStore16 => "CAPSTORE16",
            CapStore1632 => "CAPSTORE1632",
            CapStore32 => "CAPSTORE32",
            CapStore3264 => "CAPSTORE3264",
            CapStore64 => "CAPSTORE64",
            UCapStore8 => "UCAPSTORE8",
            UCapStore832 => "UCAPSTORE832",
            UCapStore864 => "UCAPSTORE864",
            UCapStore16 => "UCAPSTORE16",
            UCapStore1632 => "UCAPSTORE1632",
            UCapStore32 => "UCAPSTORE32",
            UCapStore3264 => "UCAPSTORE3264",
            UCapStore64 => "UCAPSTORE64",
            CIncOffset => "CINCOFFSET",
            CSetBounds => "CSETBOUNDS",
            CMove => "CMOVE",
            Add => "ADD",
            Addi => "ADDI",
            Lw => "LW",
            Ld => "LD",
            Sw => "SW",
            Sd => "SD",
            Nop => "NOP",
            Ret => "RET",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == s)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Integer register `x0`..`x31`.
    Gpr(u8),
    /// Capability register `c0`..`c31`.
    Cap(u8),
    /// Virtual register, not yet allocated.
    Virtual(u32),
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Gpr(n) => write!(f, "$x{n}"),
            Register::Cap(n) => write!(f, "$c{n}"),
            Register::Virtual(n) => write!(f, "%{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineOperand {
    Reg(Register),
    Imm(i64),
}

impl MachineOperand {
    pub const fn is_reg(&self) -> bool {
        matches!(self, MachineOperand::Reg(_))
    }

    pub const fn is_imm(&self) -> bool {
        matches!(self, MachineOperand::Imm(_))
    }

    pub const fn reg(&self) -> Option<Register> {
        match self {
            MachineOperand::Reg(reg) => Some(*reg),
            MachineOperand::Imm(_) => None,
        }
    }
}

impl fmt::Display for MachineOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineOperand::Reg(reg) => write!(f, "{reg}"),
            MachineOperand::Imm(imm) => write!(f, "{imm}"),
        }
    }
}

/// A single machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInstr {
    opcode: Opcode,
    operands: Vec<MachineOperand>,
}

impl MachineInstr {
    pub fn new(opcode: Opcode, operands: Vec<MachineOperand>) -> Self {
        Self { opcode, operands }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> &[MachineOperand] {
        &self.operands
    }

    pub fn operand(&self, idx: usize) -> Option<&MachineOperand> {
        self.operands.get(idx)
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }
}

impl fmt::Display for MachineInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (i, op) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{op}")?;
        }
        Ok(())
    }
}

/// Ordered instruction list of one basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineBasicBlock {
    name: String,
    instrs: Vec<MachineInstr>,
}

impl MachineBasicBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instrs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instrs(&self) -> &[MachineInstr] {
        &self.instrs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MachineInstr> {
        self.instrs.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&MachineInstr> {
        self.instrs.get(idx)
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn push(&mut self, instr: MachineInstr) {
        self.instrs.push(instr);
    }

    /// Insert `instr` so that it ends up at position `idx`.
    ///
    /// Panics if `idx > len`.
    pub fn insert_before(&mut self, idx: usize, instr: MachineInstr) {
        self.instrs.insert(idx, instr);
    }

    /// Remove and return the instruction at `idx`. Panics if out of bounds.
    pub fn remove(&mut self, idx: usize) -> MachineInstr {
        self.instrs.remove(idx)
    }
}

impl<'a> IntoIterator for &'a MachineBasicBlock {
    type Item = &'a MachineInstr;
    type IntoIter = std::slice::Iter<'a, MachineInstr>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for MachineBasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for instr in &self.instrs {
            writeln!(f, "    {instr}")?;
        }
        Ok(())
    }
}

/// A function's machine code, owned by the code generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFunction {
    name: String,
    blocks: Vec<MachineBasicBlock>,
}

impl MachineFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_block(&mut self, block: MachineBasicBlock) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[MachineBasicBlock] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [MachineBasicBlock] {
        &mut self.blocks
    }

    pub fn block(&self, name: &str) -> Option<&MachineBasicBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Total number of instructions over all blocks.
    pub fn instr_count(&self) -> usize {
        self.blocks.iter().map(MachineBasicBlock::len).sum()
    }
}

impl fmt::Display for MachineFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.name)?;
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        writeln!(f, "}}")
    }
}
