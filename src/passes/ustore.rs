// This module implements the uninitialized-store rewrite. Every capability store with
// base + immediate addressing (CAPSTORE8 ... CAPSTORE64, including the truncating
// variants) is replaced by two instructions: a CINCOFFSET that materialises the offset
// capability into the store's second register operand, followed by the matching
// UCAPSTORE that writes through the capability base. The operand mapping is fixed by the
// instruction definitions:
//
//   CAPSTORE rs, rt, offset, cb  =>  CINCOFFSET rt, cb, cb
//                                    UCAPSTORE  cb, offset, rs, cb
//
// The rewrite is purely local and keyed on the opcode; no data-flow information is
// consulted. Operand shapes are checked for the whole function before anything is
// mutated, so a malformed store aborts the pass without leaving a half-rewritten
// function behind. Replacement opcodes never appear in the table, which makes the pass
// idempotent.

//! Capability store to uninitialized store rewrite.

use super::{MachineFunctionPass, PassError, PassResult};
use crate::mir::{MachineBasicBlock, MachineFunction, MachineInstr, MachineOperand, Opcode, Register};

/// Capability store opcodes and their uninitialized-store counterparts.
pub static USTORE_TABLE: [(Opcode, Opcode); 8] = [
    (Opcode::CapStore8, Opcode::UCapStore8),
    (Opcode::CapStore832, Opcode::UCapStore832),
    (Opcode::CapStore864, Opcode::UCapStore864),
    (Opcode::CapStore16, Opcode::UCapStore16),
    (Opcode::CapStore1632, Opcode::UCapStore1632),
    (Opcode::CapStore32, Opcode::UCapStore32),
    (Opcode::CapStore3264, Opcode::UCapStore3264),
    (Opcode::CapStore64, Opcode::UCapStore64),
];

/// Uninitialized-store opcode replacing `opcode`, if it is a capability store.
pub fn ustore_equivalent(opcode: Opcode) -> Option<Opcode> {
    USTORE_TABLE
        .iter()
        .find(|(store, _)| *store == opcode)
        .map(|(_, ustore)| *ustore)
}

/// Operands of a capability store in definition order: value, scratch
/// destination, immediate offset, capability base.
fn store_operands(instr: &MachineInstr) -> Result<[MachineOperand; 4], String> {
    let &[value, scratch, offset, base] = instr.operands() else {
        return Err(format!("expected 4 operands, found {}", instr.num_operands()));
    };

    if !value.is_reg() {
        return Err(format!("value operand must be a register, found {value}"));
    }
    if !scratch.is_reg() {
        return Err(format!("scratch operand must be a register, found {scratch}"));
    }
    if !offset.is_imm() {
        return Err(format!("offset operand must be an immediate, found {offset}"));
    }
    match base.reg() {
        Some(Register::Cap(_)) | Some(Register::Virtual(_)) => {}
        _ => return Err(format!("base operand must be a capability register, found {base}")),
    }

    Ok([value, scratch, offset, base])
}

/// Counters accumulated over all functions a [`UStorePass`] has run on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UStoreStats {
    pub functions_changed: usize,
    pub stores_rewritten: usize,
}

/// Replaces capability stores with an offset increment plus uninitialized store.
#[derive(Debug, Default)]
pub struct UStorePass {
    stats: UStoreStats,
}

impl UStorePass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> UStoreStats {
        self.stats
    }

    fn malformed(
        &self,
        func: &str,
        block: &str,
        index: usize,
        opcode: Opcode,
        reason: String,
    ) -> PassError {
        PassError::MalformedOperands {
            pass: self.name(),
            function: func.to_string(),
            block: block.to_string(),
            index,
            opcode,
            reason,
        }
    }

    /// Checks every capability store in `func` and collects, per block, the
    /// stores to rewrite together with their validated operands.
    fn verify(&self, func: &MachineFunction) -> PassResult<Vec<Vec<StoreSite>>> {
        let mut plan = Vec::with_capacity(func.blocks().len());
        for block in func.blocks() {
            let mut sites = Vec::new();
            for (index, instr) in block.iter().enumerate() {
                let Some(ustore) = ustore_equivalent(instr.opcode()) else {
                    continue;
                };
                let operands = store_operands(instr)
                    .map_err(|reason| self.malformed(func.name(), block.name(), index, instr.opcode(), reason))?;
                sites.push(StoreSite { index, ustore, operands });
            }
            plan.push(sites);
        }
        Ok(plan)
    }
}

/// A verified capability store: its position before rewriting, the
/// replacement opcode and the store's operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StoreSite {
    index: usize,
    ustore: Opcode,
    operands: [MachineOperand; 4],
}

/// Replaces each site in `block`, in program order. Returns the number of
/// stores rewritten.
fn rewrite_block(block: &mut MachineBasicBlock, sites: &[StoreSite]) -> usize {
    for (shift, site) in sites.iter().enumerate() {
        // Every earlier rewrite grew the block by one.
        let idx = site.index + shift;
        let [value, scratch, offset, base] = site.operands;

        let incr = MachineInstr::new(Opcode::CIncOffset, vec![scratch, base, base]);
        let store = MachineInstr::new(site.ustore, vec![base, offset, value, base]);
        log::trace!("{}: {} => {}; {}", block.name(), block.instrs()[idx], incr, store);

        block.insert_before(idx, incr);
        block.insert_before(idx + 1, store);
        block.remove(idx + 2);
    }
    sites.len()
}

impl MachineFunctionPass for UStorePass {
    fn name(&self) -> &'static str {
        "ustore"
    }

    fn run_on_function(&mut self, func: &mut MachineFunction) -> PassResult<bool> {
        log::debug!("{}: running on {} ({} instructions)", self.name(), func.name(), func.instr_count());

        let plan = self.verify(func)?;

        let func_name = func.name().to_string();
        let mut rewritten = 0;
        for (block, sites) in func.blocks_mut().iter_mut().zip(&plan) {
            rewritten += rewrite_block(block, sites);
        }

        if rewritten > 0 {
            self.stats.functions_changed += 1;
            self.stats.stores_rewritten += rewritten;
        }
        log::debug!("{}: rewrote {} stores in {}", self.name(), rewritten, func_name);

        Ok(rewritten > 0)
    }
}
