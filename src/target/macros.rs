//! Preprocessor macro sink.
//!
//! [`TargetInfo::target_defines`](super::TargetInfo::target_defines) writes
//! into any [`MacroBuilder`]; [`MacroSet`] is the ordered in-memory
//! implementation used by the driver and the tests.

use std::fmt;

/// Receiver for predefined macros.
pub trait MacroBuilder {
    /// Define `name` with the given replacement text.
    fn define_macro(&mut self, name: &str, value: &str);

    /// Define `name` as `1`, like `-Dname` on a compiler command line.
    fn define(&mut self, name: &str) {
        self.define_macro(name, "1");
    }
}

/// A single `#define`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub value: String,
}

/// Ordered set of macro definitions.
///
/// Redefining a name replaces its value in place and keeps the original
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroSet {
    defs: Vec<MacroDefinition>,
}

impl MacroSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name`, if defined.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.defs
            .iter()
            .find(|def| def.name == name)
            .map(|def| def.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.defs.iter()
    }

    /// Defined names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|def| def.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl MacroBuilder for MacroSet {
    fn define_macro(&mut self, name: &str, value: &str) {
        match self.defs.iter_mut().find(|def| def.name == name) {
            Some(def) => def.value = value.to_string(),
            None => self.defs.push(MacroDefinition {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for MacroDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#define {} {}", self.name, self.value)
    }
}

impl fmt::Display for MacroSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for def in &self.defs {
            writeln!(f, "{def}")?;
        }
        Ok(())
    }
}
