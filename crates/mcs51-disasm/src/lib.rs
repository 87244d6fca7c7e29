pub mod analyze;
pub mod model;
pub mod names;
pub mod render;
pub mod symbols;

// Re-export commonly used types/functions for the CLI and tests
pub use analyze::{Analysis, Analyzer, AnalyzerConfig, LabelKind, Region};
pub use model::load_raw_bin;
pub use names::LabelNames;
pub use render::{Renderer, Resolver};
pub use symbols::{Scope, SymbolTable};

use mcs51_rs::{Catalog, Rom};

/// Worklist seeds: segment starts from the symbol table plus `extra`, or
/// address 0 when neither supplies any.
pub fn entry_points(symbols: &SymbolTable, extra: &[u16]) -> Vec<u16> {
    let mut seeds: Vec<u16> = symbols.code_starts().chain(extra.iter().copied()).collect();
    seeds.sort_unstable();
    seeds.dedup();
    if seeds.is_empty() {
        seeds.push(0);
    }
    seeds
}

#[derive(Debug, Clone)]
pub struct Disassembly {
    pub text: String,
    pub analysis: Analysis,
    pub names: LabelNames,
}

/// Analyze, name, then render `rom` in one go.
pub fn disassemble(
    catalog: &Catalog,
    rom: &Rom,
    symbols: &SymbolTable,
    config: AnalyzerConfig,
    entries: &[u16],
) -> Disassembly {
    let offset = config.offset;
    let mut analyzer = Analyzer::new(catalog, rom, symbols, config);
    analyzer.run(entry_points(symbols, entries));
    let analysis = analyzer.finish();
    let names = LabelNames::assign(&analysis, symbols);
    let text = Renderer::new(catalog, offset, rom, symbols, &analysis, &names).sweep();
    Disassembly { text, analysis, names }
}
