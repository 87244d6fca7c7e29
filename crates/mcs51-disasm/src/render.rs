use std::fmt::Write as _;

use mcs51_rs::decoder::Decoder;
use mcs51_rs::disasm::{db_line, dw_line, fmt_decoded, hex, SymbolNames};
use mcs51_rs::{Catalog, Mcs51Decoder, Rom};

use crate::analyze::{Analysis, LabelKind};
use crate::names::LabelNames;
use crate::symbols::{Scope, SymbolTable};

/// Operand names: DATA and BIT symbols, then resolved labels.
pub struct Resolver<'a> {
    pub symbols: &'a SymbolTable,
    pub names: &'a LabelNames,
}

impl SymbolNames for Resolver<'_> {
    fn direct(&self, addr: u8) -> Option<&str> {
        self.symbols.get(Scope::Data, addr.into())
    }

    fn bit(&self, addr: u8) -> Option<&str> {
        self.symbols.get(Scope::Bit, addr.into())
    }

    fn label(&self, addr: u16) -> Option<&str> {
        self.names.get(addr)
    }
}

/// Second pass: turns the frozen analysis into assembler text.
pub struct Renderer<'a> {
    rom: &'a Rom,
    decoder: Mcs51Decoder<'a>,
    symbols: &'a SymbolTable,
    analysis: &'a Analysis,
    names: &'a LabelNames,
    out: String,
}

impl<'a> Renderer<'a> {
    pub fn new(
        catalog: &'a Catalog,
        offset: u16,
        rom: &'a Rom,
        symbols: &'a SymbolTable,
        analysis: &'a Analysis,
        names: &'a LabelNames,
    ) -> Self {
        Self { rom, decoder: Mcs51Decoder::new(catalog, offset), symbols, analysis, names, out: String::new() }
    }

    fn resolver(&self) -> Resolver<'a> {
        Resolver { symbols: self.symbols, names: self.names }
    }

    /// Emits the origin directive and label for `pc`; true if an `org` was printed.
    fn origin_and_label(&mut self, pc: usize, force_org: bool, just_started: bool) -> bool {
        let addr = u16::try_from(pc).ok();
        let segment = addr.and_then(|a| self.symbols.get(Scope::Code, a));
        let label = addr.and_then(|a| self.names.get(a));
        let org = match segment {
            Some(name) => {
                let _ = writeln!(self.out, "\norg\t{name}");
                true
            }
            None if force_org => {
                let _ = writeln!(self.out, "\norg\t{}", hex(pc as u32));
                true
            }
            None => {
                if just_started && label.is_none() {
                    let _ = writeln!(self.out, ";org\t{}", hex(pc as u32));
                }
                false
            }
        };
        if let Some(label) = label {
            let _ = writeln!(self.out, "{label}:");
        }
        org
    }

    /// Renders `[start, end)` as instructions. Undecodable bytes become `db`
    /// lines, one byte at a time.
    pub fn code_block(&mut self, start: usize, end: usize, mut force_org: bool) -> usize {
        let image = self.rom;
        let rom = image.as_slice();
        let end = end.min(rom.len());
        let resolver = self.resolver();
        let mut pc = start;
        while pc < end {
            if self.origin_and_label(pc, force_org, pc == start) {
                force_org = false;
            }
            match self.decoder.decode(rom, pc) {
                Ok(d) => {
                    let _ = writeln!(self.out, "{}", fmt_decoded(&d, &resolver));
                    if d.desc.exits_flow() {
                        let _ = writeln!(self.out);
                    }
                    pc = d.next_pc();
                }
                Err(_) => {
                    let _ = writeln!(self.out, "{}", db_line(rom[pc], pc));
                    pc += 1;
                }
            }
        }
        pc
    }

    /// Renders `[start, end)` as `db`/`dw` lines. A block made only of
    /// erased bytes (0FFh) prints just its labels and returns `start`;
    /// otherwise every byte is dumped and the end of the block is returned.
    pub fn data_block(&mut self, start: usize, end: usize, mut force_org: bool) -> usize {
        let image = self.rom;
        let rom = image.as_slice();
        let end = end.min(rom.len());
        if start >= end {
            return start;
        }
        if rom[start..end].iter().all(|&b| b == 0xFF) {
            for pc in start..end {
                let labeled = u16::try_from(pc).is_ok_and(|a| self.names.get(a).is_some());
                if labeled && self.origin_and_label(pc, force_org || pc != start, pc == start) {
                    force_org = false;
                }
            }
            return start;
        }
        let mut pc = start;
        while pc < end {
            if self.origin_and_label(pc, force_org, pc == start) {
                force_org = false;
            }
            let table_entry =
                u16::try_from(pc).ok().and_then(|a| self.analysis.labels.get(&a)) == Some(&LabelKind::Addr);
            let (line, length) = match image.read_be16(pc) {
                Some(word) if table_entry && pc + 1 < end => (dw_line(word, pc), 2),
                _ => (db_line(rom[pc], pc), 1),
            };
            let _ = writeln!(self.out, "{line}");
            pc += length;
        }
        pc
    }

    /// Renders every code and data run of the image in address order.
    pub fn sweep(mut self) -> String {
        let mut done_to = 0;
        for region in self.analysis.regions() {
            let start = region.start.max(done_to.min(region.end));
            if start >= region.end {
                continue;
            }
            let force_org = start != done_to;
            done_to = if region.code {
                self.code_block(start, region.end, force_org)
            } else {
                self.data_block(start, region.end, force_org)
            };
        }
        self.out
    }
}
