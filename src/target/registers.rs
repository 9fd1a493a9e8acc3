// Static register tables for CHERI RISC-V: the 32 integer registers x0-x31 followed by
// the 32 capability registers c0-c31, plus the ABI alias for each of them (zero/ra/sp
// and their capability counterparts cnull/cra/csp). The tables feed register printing
// and parsing in the assembler and the register allocator, and are also used to resolve
// register names written in inline asm clobber lists.

//! Register name and alias tables.

use hashbrown::HashMap;
use std::sync::OnceLock;

/// Canonical architectural register names, integer bank first.
#[rustfmt::skip]
pub static GCC_REG_NAMES: [&str; 64] = [
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7",
    "x8", "x9", "x10", "x11", "x12", "x13", "x14", "x15",
    "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23",
    "x24", "x25", "x26", "x27", "x28", "x29", "x30", "x31",
    "c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7",
    "c8", "c9", "c10", "c11", "c12", "c13", "c14", "c15",
    "c16", "c17", "c18", "c19", "c20", "c21", "c22", "c23",
    "c24", "c25", "c26", "c27", "c28", "c29", "c30", "c31",
];

/// An ABI-friendly register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegAlias {
    pub alias: &'static str,
    pub canonical: &'static str,
}

const fn alias(alias: &'static str, canonical: &'static str) -> RegAlias {
    RegAlias { alias, canonical }
}

/// ABI aliases for every entry of [`GCC_REG_NAMES`].
#[rustfmt::skip]
pub static GCC_REG_ALIASES: [RegAlias; 64] = [
    alias("zero", "x0"), alias("ra", "x1"), alias("sp", "x2"), alias("gp", "x3"),
    alias("tp", "x4"), alias("t0", "x5"), alias("t1", "x6"), alias("t2", "x7"),
    alias("s0", "x8"), alias("s1", "x9"), alias("a0", "x10"), alias("a1", "x11"),
    alias("a2", "x12"), alias("a3", "x13"), alias("a4", "x14"), alias("a5", "x15"),
    alias("a6", "x16"), alias("a7", "x17"), alias("s2", "x18"), alias("s3", "x19"),
    alias("s4", "x20"), alias("s5", "x21"), alias("s6", "x22"), alias("s7", "x23"),
    alias("s8", "x24"), alias("s9", "x25"), alias("s10", "x26"), alias("s11", "x27"),
    alias("t3", "x28"), alias("t4", "x29"), alias("t5", "x30"), alias("t6", "x31"),
    alias("cnull", "c0"), alias("cra", "c1"), alias("csp", "c2"), alias("cgp", "c3"),
    alias("ctp", "c4"), alias("ct0", "c5"), alias("ct1", "c6"), alias("ct2", "c7"),
    alias("cs0", "c8"), alias("cs1", "c9"), alias("ca0", "c10"), alias("ca1", "c11"),
    alias("ca2", "c12"), alias("ca3", "c13"),
    // ca4 is c14; c15 belongs to ca5 alone. Do not map ca4 to c15.
    alias("ca4", "c14"), alias("ca5", "c15"),
    alias("ca6", "c16"), alias("ca7", "c17"), alias("cs2", "c18"), alias("cs3", "c19"),
    alias("cs4", "c20"), alias("cs5", "c21"), alias("cs6", "c22"), alias("cs7", "c23"),
    alias("cs8", "c24"), alias("cs9", "c25"), alias("cs10", "c26"), alias("cs11", "c27"),
    alias("ct3", "c28"), alias("ct4", "c29"), alias("ct5", "c30"), alias("ct6", "c31"),
];

fn name_index() -> &'static HashMap<&'static str, &'static str> {
    static INDEX: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::with_capacity(GCC_REG_NAMES.len() + GCC_REG_ALIASES.len());
        for name in GCC_REG_NAMES {
            index.insert(name, name);
        }
        for entry in &GCC_REG_ALIASES {
            index.insert(entry.alias, entry.canonical);
        }
        index
    })
}

/// Resolve a register name or ABI alias to its canonical name.
///
/// Accepts an optional leading `$`, as written in assembly listings.
pub fn canonical_register_name(name: &str) -> Option<&'static str> {
    let name = name.strip_prefix('$').unwrap_or(name);
    name_index().get(name).copied()
}
