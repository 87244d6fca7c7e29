use std::collections::{BTreeMap, BTreeSet};

use mcs51_rs::disasm::auto_label;

use crate::analyze::{Analysis, LabelKind};
use crate::symbols::{Scope, SymbolTable};

/// Final label names: external LABEL names plus generated ones for every
/// classified address that lacks one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelNames {
    names: BTreeMap<u16, String>,
}

impl LabelNames {
    /// Call only once the worklist is drained.
    pub fn assign(analysis: &Analysis, symbols: &SymbolTable) -> Self {
        let mut names: BTreeMap<u16, String> = symbols.scope(Scope::Label).clone();
        for (&addr, &kind) in &analysis.labels {
            if names.contains_key(&addr) {
                continue;
            }
            let mut seen = BTreeSet::new();
            let name = resolve(addr, kind, analysis, symbols, &mut seen);
            names.insert(addr, name);
        }
        Self { names }
    }

    pub fn get(&self, addr: u16) -> Option<&str> {
        self.names.get(&addr).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> + '_ {
        self.names.iter().map(|(&addr, name)| (addr, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Name of `addr`, following forwarding chains. An address met twice ends
/// the chain with a `cycle_XXXX` tag.
fn resolve(
    addr: u16,
    kind: LabelKind,
    analysis: &Analysis,
    symbols: &SymbolTable,
    seen: &mut BTreeSet<u16>,
) -> String {
    if let Some(name) = symbols.get(Scope::Label, addr) {
        return name.to_string();
    }
    let kind = analysis.labels.get(&addr).copied().unwrap_or(kind);
    match analysis.forwards.get(&addr) {
        Some(_) if seen.contains(&addr) => auto_label("cycle", addr),
        Some(&target) => {
            seen.insert(addr);
            let inner = resolve(target, kind, analysis, symbols, seen);
            format!("fwd_{addr:04X}_{inner}")
        }
        None => auto_label(kind.prefix(), addr),
    }
}
