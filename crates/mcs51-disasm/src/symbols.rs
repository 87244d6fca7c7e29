use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use mcs51_rs::disasm::hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Code segment starts, emitted as `org`.
    Code,
    /// Direct-addressed RAM and SFRs.
    Data,
    Bit,
    /// Code labels.
    Label,
}

impl Scope {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "CODE" => Some(Scope::Code),
            "DATA" => Some(Scope::Data),
            "BIT" => Some(Scope::Bit),
            "LABEL" => Some(Scope::Label),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Code => "CODE",
            Scope::Data => "DATA",
            Scope::Bit => "BIT",
            Scope::Label => "LABEL",
        }
    }
}

/// Known names, per scope, keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    code: BTreeMap<u16, String>,
    data: BTreeMap<u16, String>,
    bit: BTreeMap<u16, String>,
    label: BTreeMap<u16, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Definition<'a> {
    name: &'a str,
    scope: &'a str,
    addr: u32,
}

fn take_while(s: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let end = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// `[;]name SCOPE addr[h]`, anything after the address is ignored.
fn parse_definition(line: &str) -> Option<Definition<'_>> {
    let rest = line.strip_prefix(';').unwrap_or(line);
    let (name, rest) = take_while(rest, |c| c.is_ascii_alphanumeric() || c == '_');
    let (gap, rest) = take_while(rest, char::is_whitespace);
    let (scope, rest) = take_while(rest, |c| c.is_ascii_uppercase());
    let (gap2, rest) = take_while(rest, char::is_whitespace);
    let (digits, rest) = take_while(rest, |c| c.is_ascii_digit() || ('A'..='F').contains(&c));
    if name.is_empty() || gap.is_empty() || scope.is_empty() || gap2.is_empty() || digits.is_empty() {
        return None;
    }
    let radix = if rest.starts_with(['h', 'H']) { 16 } else { 10 };
    let addr = u32::from_str_radix(digits, radix).ok()?;
    Some(Definition { name, scope, addr })
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut BTreeMap<u16, String> {
        match scope {
            Scope::Code => &mut self.code,
            Scope::Data => &mut self.data,
            Scope::Bit => &mut self.bit,
            Scope::Label => &mut self.label,
        }
    }

    pub fn scope(&self, scope: Scope) -> &BTreeMap<u16, String> {
        match scope {
            Scope::Code => &self.code,
            Scope::Data => &self.data,
            Scope::Bit => &self.bit,
            Scope::Label => &self.label,
        }
    }

    pub fn get(&self, scope: Scope, addr: u16) -> Option<&str> {
        self.scope(scope).get(&addr).map(String::as_str)
    }

    pub fn contains(&self, scope: Scope, addr: u16) -> bool {
        self.scope(scope).contains_key(&addr)
    }

    /// Adds a name; a previous name at the same address is replaced.
    pub fn define(&mut self, scope: Scope, addr: u16, name: impl Into<String>) {
        let name = name.into();
        if let Some(old) = self.scope_mut(scope).insert(addr, name.clone()) {
            warn!("overriding {} {} from {} to {}", scope.as_str(), hex(addr.into()), old, name);
        }
    }

    /// Reads definition lines and returns the code segment starts by name.
    pub fn include(&mut self, text: &str) -> BTreeMap<String, u16> {
        let mut starts = BTreeMap::new();
        for line in text.lines() {
            let parsed = parse_definition(line).and_then(|d| Some((d.name, d.scope, u16::try_from(d.addr).ok()?)));
            match parsed {
                Some((name, scope_word, addr)) => {
                    let Some(scope) = Scope::from_word(scope_word) else { continue };
                    self.define(scope, addr, name);
                    if scope == Scope::Code {
                        starts.insert(name.to_string(), addr);
                    }
                }
                None if !line.is_empty() && !line.starts_with(';') => {
                    warn!("unrecognized definition: {line}");
                }
                None => {}
            }
        }
        starts
    }

    pub fn code_starts(&self) -> impl Iterator<Item = u16> + '_ {
        self.code.keys().copied()
    }
}
