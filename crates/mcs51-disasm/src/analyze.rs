use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use mcs51_rs::decoder::Decoder;
use mcs51_rs::disasm::{bit_location, hex};
use mcs51_rs::{Catalog, Mcs51Decoder, Operand, Rom};

use crate::symbols::{Scope, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    /// Reached by a control transfer.
    Jump,
    /// Loaded into DPTR; constant data in program memory.
    Dptr,
    /// Entry of an address table, supplied by the caller.
    Addr,
}

impl LabelKind {
    pub fn prefix(self) -> &'static str {
        match self {
            LabelKind::Jump => "jump",
            LabelKind::Dptr => "dptr",
            LabelKind::Addr => "addr",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Load bias subtracted from absolute addresses in `ljmp`/`lcall`/`mov DPTR`.
    pub offset: u16,
    /// Treat the whole image as code.
    pub all_is_code: bool,
    /// Call targets that never return.
    pub no_return_from: BTreeSet<u16>,
    /// Addresses holding 2-byte code addresses.
    pub indirect_targets: BTreeSet<u16>,
}

/// Reachability scan state. Mutated only while the worklist drains; see
/// [`Analyzer::finish`] for the frozen result.
pub struct Analyzer<'a> {
    rom: &'a Rom,
    symbols: &'a SymbolTable,
    decoder: Mcs51Decoder<'a>,
    all_is_code: bool,
    no_return_from: BTreeSet<u16>,
    labels: BTreeMap<u16, LabelKind>,
    forwards: BTreeMap<u16, u16>,
    sfr_warnings: BTreeSet<u8>,
    visited: BTreeSet<u16>,
    code: BitVec,
}

impl<'a> Analyzer<'a> {
    pub fn new(catalog: &'a Catalog, rom: &'a Rom, symbols: &'a SymbolTable, config: AnalyzerConfig) -> Self {
        let labels = config.indirect_targets.iter().map(|&addr| (addr, LabelKind::Addr)).collect();
        Self {
            rom,
            symbols,
            decoder: Mcs51Decoder::new(catalog, config.offset),
            all_is_code: config.all_is_code,
            no_return_from: config.no_return_from,
            labels,
            forwards: BTreeMap::new(),
            sfr_warnings: BTreeSet::new(),
            visited: BTreeSet::new(),
            code: BitVec::repeat(false, rom.len()),
        }
    }

    pub fn labels(&self) -> &BTreeMap<u16, LabelKind> {
        &self.labels
    }

    pub fn forwards(&self) -> &BTreeMap<u16, u16> {
        &self.forwards
    }

    fn check_sfr(&mut self, addr: u8) {
        if addr >= 0x80 && !self.symbols.contains(Scope::Data, addr.into()) && self.sfr_warnings.insert(addr) {
            warn!("unknown SFR {}", hex(addr.into()));
        }
    }

    /// Follow code linearly from `start` until flow leaves it.
    ///
    /// Newly found jump targets are appended to `queue` in discovery order.
    /// Returns the address just past the last instruction scanned; a decode
    /// failure ends the scan at the failing instruction. With `force` the
    /// scan continues past instructions that would otherwise end it.
    pub fn scan(&mut self, start: u16, queue: &mut VecDeque<u16>, force: bool) -> usize {
        let image = self.rom;
        let rom = image.as_slice();
        let mut discovered = Vec::new();
        let mut pc = usize::from(start);
        while pc < rom.len() {
            let decoded = match self.decoder.decode(rom, pc) {
                Ok(d) => d,
                Err(err) => {
                    trace!(%err, "scan from {} stops", hex(start.into()));
                    break;
                }
            };
            let desc = decoded.desc;
            let mut exits = desc.exits_flow() && !force;
            for &operand in &decoded.operands {
                match operand {
                    Operand::Label(target) if usize::from(target) == pc => {}
                    Operand::Label(target) => {
                        let kind = if desc.is_pointer_load() {
                            LabelKind::Dptr
                        } else {
                            if pc == usize::from(start) && desc.exits_flow() {
                                self.forwards.insert(start, target);
                            }
                            if self.no_return_from.contains(&target) {
                                exits = true;
                            }
                            LabelKind::Jump
                        };
                        if let Entry::Vacant(slot) = self.labels.entry(target) {
                            slot.insert(kind);
                            if kind == LabelKind::Jump {
                                discovered.push(target);
                            }
                        }
                    }
                    Operand::Direct(addr) => self.check_sfr(addr),
                    Operand::Bit(bit) if !self.symbols.contains(Scope::Bit, bit.into()) => {
                        self.check_sfr(bit_location(bit).0);
                    }
                    Operand::Bit(_) | Operand::Immediate(_) => {}
                }
            }
            pc = decoded.next_pc();
            if exits {
                break;
            }
        }
        let end = pc.min(self.code.len());
        if usize::from(start) < end {
            self.code[usize::from(start)..end].fill(true);
        }
        debug!("scanned {}..{}, {} new targets", hex(start.into()), hex(pc as u32), discovered.len());
        queue.extend(discovered);
        pc
    }

    /// Drain the worklist seeded with `entries`.
    pub fn run<I: IntoIterator<Item = u16>>(&mut self, entries: I) {
        let mut queue: VecDeque<u16> = entries.into_iter().collect();
        self.drain(&mut queue);
        if self.all_is_code {
            let mut pc = 0usize;
            while pc < self.rom.len() {
                let Ok(start) = u16::try_from(pc) else { break };
                let end = self.scan(start, &mut queue, true);
                pc = if end > pc { end } else { pc + 1 };
            }
            self.drain(&mut queue);
            self.code.fill(true);
        }
        debug!("worklist drained: {} labels, {} forwards", self.labels.len(), self.forwards.len());
    }

    fn drain(&mut self, queue: &mut VecDeque<u16>) {
        while let Some(start) = queue.pop_front() {
            if !self.visited.insert(start) {
                continue;
            }
            self.scan(start, queue, false);
        }
    }

    pub fn finish(self) -> Analysis {
        Analysis { labels: self.labels, forwards: self.forwards, code: self.code }
    }
}

/// A contiguous run of code or data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
    pub code: bool,
}

/// Frozen analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub labels: BTreeMap<u16, LabelKind>,
    /// Blocks consisting of a single unconditional jump: from -> to.
    pub forwards: BTreeMap<u16, u16>,
    /// One bit per image byte, set for bytes reached as code.
    pub code: BitVec,
}

impl Analysis {
    pub fn is_code(&self, addr: usize) -> bool {
        self.code.get(addr).is_some_and(|b| *b)
    }

    /// Splits the image into alternating code and data regions.
    pub fn regions(&self) -> Vec<Region> {
        let mut regions = Vec::new();
        let mut start = 0;
        while start < self.code.len() {
            let code = self.code[start];
            let rest = &self.code[start..];
            let run = if code { rest.first_zero() } else { rest.first_one() }.unwrap_or(rest.len());
            regions.push(Region { start, end: start + run, code });
            start += run;
        }
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(bytes: &[u8], config: AnalyzerConfig, entries: &[u16]) -> Analysis {
        let catalog = Catalog::new();
        let rom = Rom::new(bytes.to_vec()).unwrap();
        let symbols = SymbolTable::new();
        let mut analyzer = Analyzer::new(&catalog, &rom, &symbols, config);
        analyzer.run(entries.iter().copied());
        analyzer.finish()
    }

    #[test]
    fn ljmp_target_is_enqueued() {
        let catalog = Catalog::new();
        let rom = Rom::new(vec![0x02, 0x12, 0x34]).unwrap();
        let symbols = SymbolTable::new();
        let mut analyzer = Analyzer::new(&catalog, &rom, &symbols, AnalyzerConfig::default());
        let mut queue = VecDeque::new();
        let end = analyzer.scan(0, &mut queue, false);
        assert_eq!(end, 3);
        assert_eq!(queue, VecDeque::from([0x1234]));
        assert_eq!(analyzer.labels().get(&0x1234), Some(&LabelKind::Jump));
        // a lone ljmp forwards its block
        assert_eq!(analyzer.forwards().get(&0), Some(&0x1234));
    }

    #[test]
    fn self_jump_leaves_no_label() {
        let a = analyze(&[0x80, 0xFE], AnalyzerConfig::default(), &[0]);
        assert!(a.labels.is_empty());
        assert!(a.forwards.is_empty());
        assert!(a.is_code(0) && a.is_code(1));
    }

    #[test]
    fn dptr_load_is_data_and_not_followed() {
        // mov DPTR, #0006h; ret; nop; nop; 0xFF
        let a = analyze(&[0x90, 0x00, 0x06, 0x22, 0x00, 0x00, 0x02], AnalyzerConfig::default(), &[0]);
        assert_eq!(a.labels.get(&6), Some(&LabelKind::Dptr));
        assert!(!a.is_code(6));
        assert_eq!(a.regions(), vec![
            Region { start: 0, end: 4, code: true },
            Region { start: 4, end: 7, code: false },
        ]);
    }

    #[test]
    fn first_classification_wins() {
        // mov DPTR, #0008h; lcall 0008h; ret; ...; 0008h: ret
        let bytes = [0x90, 0x00, 0x08, 0x12, 0x00, 0x08, 0x22, 0x00, 0x22];
        let a = analyze(&bytes, AnalyzerConfig::default(), &[0]);
        assert_eq!(a.labels.get(&8), Some(&LabelKind::Dptr));
        // never enqueued as code
        assert!(!a.is_code(8));
    }

    #[test]
    fn no_return_call_ends_the_block() {
        // lcall 0005h; nop (unreached); 0005h: sjmp $
        let bytes = [0x12, 0x00, 0x05, 0x00, 0x00, 0x80, 0xFE];
        let config = AnalyzerConfig { no_return_from: BTreeSet::from([5]), ..Default::default() };
        let a = analyze(&bytes, config, &[0]);
        assert!(a.is_code(2));
        assert!(!a.is_code(3));
        assert!(a.is_code(5));
        // not a forwarding block: lcall itself falls through
        assert!(a.forwards.is_empty());

        let a = analyze(&bytes, AnalyzerConfig::default(), &[0]);
        assert!(a.is_code(3) && a.is_code(4));
    }

    #[test]
    fn forwarding_only_for_first_instruction() {
        // 0000h: sjmp 0004h; 0002h: nop; nop; 0004h: ret
        let a = analyze(&[0x80, 0x02, 0x00, 0x00, 0x22], AnalyzerConfig::default(), &[0]);
        assert_eq!(a.forwards, BTreeMap::from([(0, 4)]));
        // 0000h: nop; sjmp 0004h
        let a = analyze(&[0x00, 0x80, 0x01, 0x00, 0x22], AnalyzerConfig::default(), &[0]);
        assert!(a.forwards.is_empty());
    }

    #[test]
    fn indirect_targets_preseed_labels() {
        let config = AnalyzerConfig { indirect_targets: BTreeSet::from([2]), ..Default::default() };
        let a = analyze(&[0x22, 0x00, 0x12, 0x34], config, &[0]);
        assert_eq!(a.labels.get(&2), Some(&LabelKind::Addr));
        assert!(!a.is_code(2));
    }

    #[test]
    fn decode_failure_stops_without_classifying() {
        // nop; ljmp with one operand byte missing
        let catalog = Catalog::new();
        let rom = Rom::new(vec![0x00, 0x02, 0x12]).unwrap();
        let symbols = SymbolTable::new();
        let mut analyzer = Analyzer::new(&catalog, &rom, &symbols, AnalyzerConfig::default());
        let mut queue = VecDeque::new();
        assert_eq!(analyzer.scan(0, &mut queue, false), 1);
        assert!(queue.is_empty());
        assert!(analyzer.labels().is_empty());
    }

    #[test]
    fn force_scans_through_exits() {
        let catalog = Catalog::new();
        let rom = Rom::new(vec![0x22, 0x00, 0x22]).unwrap();
        let symbols = SymbolTable::new();
        let mut analyzer = Analyzer::new(&catalog, &rom, &symbols, AnalyzerConfig::default());
        let mut queue = VecDeque::new();
        assert_eq!(analyzer.scan(0, &mut queue, false), 1);
        assert_eq!(analyzer.scan(0, &mut queue, true), 3);
    }

    #[test]
    fn label_table_grows_monotonically() {
        // a chain of short jumps, each target reached once
        let bytes = [0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x70, 0xF8, 0x22];
        let catalog = Catalog::new();
        let rom = Rom::new(bytes.to_vec()).unwrap();
        let symbols = SymbolTable::new();
        let mut analyzer = Analyzer::new(&catalog, &rom, &symbols, AnalyzerConfig::default());
        let mut queue = VecDeque::from([0u16]);
        let mut sizes = Vec::new();
        let mut scans = 0;
        while let Some(start) = queue.pop_front() {
            analyzer.scan(start, &mut queue, false);
            sizes.push(analyzer.labels().len());
            scans += 1;
            assert!(scans <= rom.len());
        }
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
        assert!(analyzer.labels().len() <= rom.len());
        assert_eq!(analyzer.labels().keys().copied().collect::<Vec<_>>(), vec![0, 2, 4, 6]);
    }

    #[test]
    fn unknown_sfr_recorded_once_per_address() {
        // mov 99h, A; mov 99h, A; setb 98h; mov 30h, A; setb 10h; ret
        let bytes = vec![0xF5, 0x99, 0xF5, 0x99, 0xD2, 0x98, 0xF5, 0x30, 0xD2, 0x10, 0x22];
        let catalog = Catalog::new();
        let rom = Rom::new(bytes).unwrap();

        let warnings = |symbols: &SymbolTable| {
            let mut analyzer = Analyzer::new(&catalog, &rom, symbols, AnalyzerConfig::default());
            analyzer.run([0]);
            analyzer.sfr_warnings
        };

        let mut symbols = SymbolTable::new();
        assert_eq!(warnings(&symbols), BTreeSet::from([0x98, 0x99]));

        symbols.include("SBUF DATA 99h\n");
        assert_eq!(warnings(&symbols), BTreeSet::from([0x98]));

        // a named bit is not reduced to its byte
        symbols.include("RI BIT 98h\n");
        assert!(warnings(&symbols).is_empty());
    }

    #[test]
    fn all_is_code_marks_everything() {
        let config = AnalyzerConfig { all_is_code: true, ..Default::default() };
        let a = analyze(&[0x22, 0xFF, 0x80, 0xFC, 0x02], config, &[]);
        assert_eq!(a.regions(), vec![Region { start: 0, end: 5, code: true }]);
        // sjmp at 0002h targets 0000h
        assert_eq!(a.labels.get(&0), Some(&LabelKind::Jump));
    }
}
