// This module implements the target feature descriptor. TargetFeaturesBuilder is the only
// mutable stage: it receives the architecture (directly or from a triple), the ABI name,
// the capability-table ABI and the ordered "+name" feature tokens. Tokens set boolean
// flags in a FeatureSet; "+xcheri" also fixes the capability width at twice the pointer
// width. Unknown tokens never fail configuration, they are remembered and logged so the
// driver can warn. finalize() consumes the builder and returns TargetInfo, the immutable
// view that answers has_feature queries and derives the predefined macros and the data
// layout string. Because the builder is consumed, no consumer can observe a partially
// configured target and finalization cannot run twice.

//! Target feature state for CHERI RISC-V.

use super::error::{TargetError, TargetResult};
use super::macros::MacroBuilder;
use super::registers::{RegAlias, GCC_REG_ALIASES, GCC_REG_NAMES};
use std::fmt;
use std::str::FromStr;

/// Base RISC-V architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Riscv32,
    Riscv64,
}

impl Arch {
    /// Architecture named by the first component of a target triple.
    pub fn from_triple(triple: &str) -> TargetResult<Self> {
        match triple.split('-').next().unwrap_or_default() {
            "riscv32" => Ok(Arch::Riscv32),
            "riscv64" => Ok(Arch::Riscv64),
            _ => Err(TargetError::UnknownArch {
                triple: triple.to_string(),
            }),
        }
    }

    pub const fn pointer_width(self) -> u32 {
        match self {
            Arch::Riscv32 => 32,
            Arch::Riscv64 => 64,
        }
    }

    pub const fn default_abi(self) -> &'static str {
        match self {
            Arch::Riscv32 => "ilp32",
            Arch::Riscv64 => "lp64",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Arch::Riscv32 => "riscv32",
            Arch::Riscv64 => "riscv64",
        }
    }
}

/// Instruction set extensions understood by the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Feature {
    /// Integer multiply/divide.
    M = 0,
    /// Atomics.
    A = 1,
    /// Single precision float.
    F = 2,
    /// Double precision float.
    D = 3,
    /// Compressed encodings.
    C = 4,
    /// CHERI capabilities.
    XCheri = 5,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::M,
        Feature::A,
        Feature::F,
        Feature::D,
        Feature::C,
        Feature::XCheri,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "m" => Some(Feature::M),
            "a" => Some(Feature::A),
            "f" => Some(Feature::F),
            "d" => Some(Feature::D),
            "c" => Some(Feature::C),
            "xcheri" => Some(Feature::XCheri),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Feature::M => "m",
            Feature::A => "a",
            Feature::F => "f",
            Feature::D => "d",
            Feature::C => "c",
            Feature::XCheri => "xcheri",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of enabled extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FeatureSet {
    bits: u8,
}

impl FeatureSet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub const fn contains(&self, feature: Feature) -> bool {
        self.bits & feature.bit() != 0
    }

    pub fn insert(&mut self, feature: Feature) {
        self.bits |= feature.bit();
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

/// How capability-table entries are reached under the pure-capability ABI.
///
/// The discriminant order is ABI-visible: `__CHERI_CAPABILITY_TABLE__` is
/// defined as the ordinal plus one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CapTableAbi {
    #[default]
    Legacy = 0,
    Plt = 1,
    Pcrel = 2,
    FunctionDescriptor = 3,
}

impl CapTableAbi {
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            CapTableAbi::Legacy => "legacy",
            CapTableAbi::Plt => "plt",
            CapTableAbi::Pcrel => "pcrel",
            CapTableAbi::FunctionDescriptor => "fn-desc",
        }
    }
}

impl FromStr for CapTableAbi {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(CapTableAbi::Legacy),
            "plt" => Ok(CapTableAbi::Plt),
            "pcrel" => Ok(CapTableAbi::Pcrel),
            "fn-desc" => Ok(CapTableAbi::FunctionDescriptor),
            _ => Err(TargetError::UnknownCapTableAbi { name: s.to_string() }),
        }
    }
}

/// ABI names under which pointers are capabilities.
fn is_capability_abi(abi: &str) -> bool {
    abi.starts_with("il32pc64") || abi.starts_with("l64pc128")
}

/// Mutable configuration stage of a target.
#[derive(Debug, Clone)]
pub struct TargetFeaturesBuilder {
    arch: Arch,
    abi: String,
    cap_table_abi: CapTableAbi,
    features: FeatureSet,
    cap_width: Option<u32>,
    ignored: Vec<String>,
}

impl TargetFeaturesBuilder {
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            abi: arch.default_abi().to_string(),
            cap_table_abi: CapTableAbi::default(),
            features: FeatureSet::empty(),
            cap_width: None,
            ignored: Vec::new(),
        }
    }

    /// Start from a triple such as `riscv64-unknown-freebsd`.
    pub fn from_triple(triple: &str) -> TargetResult<Self> {
        Ok(Self::new(Arch::from_triple(triple)?))
    }

    /// Select the ABI by name (`ilp32`, `lp64`, `il32pc64`, `l64pc128`, ...).
    pub fn abi(&mut self, abi: &str) -> &mut Self {
        self.abi = abi.to_string();
        self
    }

    pub fn cap_table_abi(&mut self, abi: CapTableAbi) -> &mut Self {
        self.cap_table_abi = abi;
        self
    }

    /// Apply feature tokens in order.
    ///
    /// Only `+name` tokens for known extensions have an effect. Everything
    /// else is accepted and recorded in [`ignored_features`](Self::ignored_features).
    pub fn configure<I, S>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            let token = token.as_ref();
            let feature = token.strip_prefix('+').and_then(Feature::from_name);

            match feature {
                Some(Feature::XCheri) => {
                    self.features.insert(Feature::XCheri);
                    self.cap_width = Some(self.arch.pointer_width() * 2);
                }
                Some(feature) => self.features.insert(feature),
                None => {
                    log::debug!("Ignoring target feature token '{}'", token);
                    self.ignored.push(token.to_string());
                }
            }
        }
        self
    }

    /// Tokens that had no effect, in the order they were seen.
    pub fn ignored_features(&self) -> &[String] {
        &self.ignored
    }

    /// Freeze the configuration.
    pub fn finalize(self) -> TargetInfo {
        let capability_abi = is_capability_abi(&self.abi);
        let data_layout = compute_data_layout(
            self.arch,
            self.cap_width,
            capability_abi && self.cap_width.is_some(),
        );

        let info = TargetInfo {
            arch: self.arch,
            abi: self.abi,
            capability_abi,
            cap_table_abi: self.cap_table_abi,
            features: self.features,
            cap_width: self.cap_width,
            data_layout,
        };
        log::debug!("Finalized target: {}", info);
        info
    }
}

fn compute_data_layout(arch: Arch, cap_width: Option<u32>, purecap: bool) -> String {
    let ptr = arch.pointer_width();
    let mut layout = String::from("e-m:e");

    if let Some(cap) = cap_width {
        layout.push_str(&format!("-pf200:{cap}:{cap}:{cap}:{ptr}"));
    }

    match arch {
        Arch::Riscv32 => layout.push_str("-p:32:32-i64:64-n32-S128"),
        Arch::Riscv64 => layout.push_str("-p:64:64-i64:64-i128:128-n64-S128"),
    }

    if purecap {
        layout.push_str("-A200-P200-G200");
    }
    layout
}

const CHERI_PERMISSIONS: [&str; 11] = [
    "__CHERI_CAP_PERMISSION_GLOBAL__",
    "__CHERI_CAP_PERMISSION_PERMIT_EXECUTE__",
    "__CHERI_CAP_PERMISSION_PERMIT_LOAD__",
    "__CHERI_CAP_PERMISSION_PERMIT_STORE__",
    "__CHERI_CAP_PERMISSION_PERMIT_LOAD_CAPABILITY__",
    "__CHERI_CAP_PERMISSION_PERMIT_STORE_CAPABILITY__",
    "__CHERI_CAP_PERMISSION_PERMIT_STORE_LOCAL__",
    "__CHERI_CAP_PERMISSION_PERMIT_SEAL__",
    "__CHERI_CAP_PERMISSION_PERMIT_CCALL__",
    "__CHERI_CAP_PERMISSION_PERMIT_UNSEAL__",
    "__CHERI_CAP_PERMISSION_ACCESS_SYSTEM_REGISTERS__",
];

/// Finalized, immutable description of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    arch: Arch,
    abi: String,
    capability_abi: bool,
    cap_table_abi: CapTableAbi,
    features: FeatureSet,
    cap_width: Option<u32>,
    data_layout: String,
}

impl TargetInfo {
    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn abi(&self) -> &str {
        &self.abi
    }

    /// Whether pointers are capabilities under the selected ABI.
    pub fn is_capability_abi(&self) -> bool {
        self.capability_abi
    }

    pub fn cap_table_abi(&self) -> CapTableAbi {
        self.cap_table_abi
    }

    pub fn pointer_width(&self) -> u32 {
        self.arch.pointer_width()
    }

    /// Capability width in bits, present once `+xcheri` is enabled.
    pub fn capability_width(&self) -> Option<u32> {
        self.cap_width
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    pub fn data_layout(&self) -> &str {
        &self.data_layout
    }

    pub fn has_feature(&self, name: &str) -> bool {
        match name {
            "riscv" => true,
            "riscv32" => self.arch == Arch::Riscv32,
            "riscv64" => self.arch == Arch::Riscv64,
            _ => Feature::from_name(name).is_some_and(|f| self.features.contains(f)),
        }
    }

    pub fn gcc_reg_names(&self) -> &'static [&'static str] {
        &GCC_REG_NAMES
    }

    pub fn gcc_reg_aliases(&self) -> &'static [RegAlias] {
        &GCC_REG_ALIASES
    }

    /// Emit the predefined macros for this target.
    pub fn target_defines<B: MacroBuilder + ?Sized>(&self, builder: &mut B) {
        let has = |f| self.features.contains(f);

        builder.define("__ELF__");
        builder.define("__riscv");
        builder.define_macro("__riscv_xlen", &self.pointer_width().to_string());
        builder.define("__riscv_cmodel_medlow");
        builder.define("__riscv_float_abi_soft");

        if has(Feature::M) {
            builder.define("__riscv_mul");
            builder.define("__riscv_div");
            builder.define("__riscv_muldiv");
        }

        if has(Feature::A) {
            builder.define("__riscv_atomic");
        }

        if has(Feature::F) || has(Feature::D) {
            builder.define_macro("__riscv_flen", if has(Feature::D) { "64" } else { "32" });
            builder.define("__riscv_fdiv");
            builder.define("__riscv_fsqrt");
        }

        if has(Feature::C) {
            builder.define("__riscv_compressed");
        }

        if has(Feature::XCheri) {
            if self.capability_abi && self.cap_table_abi != CapTableAbi::Legacy {
                builder.define_macro(
                    "__CHERI_CAPABILITY_TABLE__",
                    &(self.cap_table_abi.ordinal() + 1).to_string(),
                );
            }

            for (bit, name) in CHERI_PERMISSIONS.iter().enumerate() {
                builder.define_macro(name, &(1u32 << bit).to_string());
            }

            let clen = self.cap_width.unwrap_or(self.pointer_width() * 2);
            builder.define_macro("__riscv_clen", &clen.to_string());
        }
    }
}

impl fmt::Display for TargetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} abi={}", self.arch.name(), self.abi)?;
        for feature in self.features.iter() {
            write!(f, " +{}", feature.name())?;
        }
        if let Some(width) = self.cap_width {
            write!(f, " clen={width}")?;
        }
        Ok(())
    }
}
