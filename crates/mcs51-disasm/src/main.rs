use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use mcs51_disasm::{disassemble, load_raw_bin, AnalyzerConfig, LabelKind, Scope, SymbolTable};
use mcs51_rs::{Catalog, Descriptor};

#[derive(Parser, Debug)]
#[command(author, version, about = "8051/8052 disassembler CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Disassemble a raw ROM image
    Disasm(DisasmArgs),
    /// Print the instruction catalog
    Opcodes {
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Args, Debug)]
struct DisasmArgs {
    /// Input binary path
    #[arg(value_name = "BINFILE")]
    input: PathBuf,
    /// Load address of the image; subtracted from absolute addresses
    #[arg(long, value_parser = parse_addr, default_value = "0")]
    offset: u16,
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Symbol definition file (`name SCOPE addr[h]` per line). Repeatable.
    #[arg(long = "symbols", value_name = "FILE")]
    symbols: Vec<PathBuf>,
    /// Extra entry point. Repeatable.
    #[arg(long = "entry", value_name = "ADDR", value_parser = parse_addr)]
    entries: Vec<u16>,
    /// Call target that never returns. Repeatable.
    #[arg(long = "no-return", value_name = "ADDR", value_parser = parse_addr)]
    no_return: Vec<u16>,
    /// Address holding a 2-byte code address. Repeatable.
    #[arg(long = "indirect", value_name = "ADDR", value_parser = parse_addr)]
    indirect: Vec<u16>,
    /// Render the whole image as code
    #[arg(long)]
    all_is_code: bool,
    /// Import labels from JSON (Vec<{ addr, name }>)
    #[arg(long, value_name = "FILE")]
    labels_in: Option<PathBuf>,
    /// Export labels to JSON (Vec<{ addr, name, kind }>)
    #[arg(long, value_name = "FILE")]
    labels_out: Option<PathBuf>,
    /// Write listing to file instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Decimal, `0x` hex or assembler-style `h`-suffixed hex.
fn parse_addr(s: &str) -> Result<u16> {
    let s = s.trim();
    let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)?
    } else if let Some(hex) = s.strip_suffix('h').or_else(|| s.strip_suffix('H')) {
        u16::from_str_radix(hex, 16)?
    } else {
        s.parse::<u16>()?
    };
    Ok(value)
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct LabelKV {
    addr: u16,
    name: String,
}

#[derive(Debug, Clone, serde::Serialize)]
struct LabelOut {
    addr: u16,
    name: String,
    kind: Option<LabelKind>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct DescriptorOut<'a> {
    template: String,
    #[serde(flatten)]
    desc: &'a Descriptor,
}

fn run_disasm(args: DisasmArgs) -> Result<()> {
    let DisasmArgs {
        input,
        offset,
        skip,
        len,
        symbols: symbol_files,
        entries,
        no_return,
        indirect,
        all_is_code,
        labels_in,
        labels_out,
        out,
    } = args;

    let rom = load_raw_bin(&input, skip, len)?;
    let mut symbols = SymbolTable::new();
    for path in &symbol_files {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let starts = symbols.include(&text);
        debug!("{}: {} segment starts", path.display(), starts.len());
    }
    if let Some(path) = &labels_in {
        let txt = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let labels: Vec<LabelKV> = serde_json::from_str(&txt).with_context(|| format!("parsing {}", path.display()))?;
        for kv in labels {
            symbols.define(Scope::Label, kv.addr, kv.name);
        }
    }

    let config = AnalyzerConfig {
        offset,
        all_is_code,
        no_return_from: no_return.into_iter().collect::<BTreeSet<_>>(),
        indirect_targets: indirect.into_iter().collect::<BTreeSet<_>>(),
    };
    let catalog = Catalog::new();
    let result = disassemble(&catalog, &rom, &symbols, config, &entries);

    if let Some(path) = &labels_out {
        let arr: Vec<LabelOut> = result
            .names
            .iter()
            .map(|(addr, name)| LabelOut {
                addr,
                name: name.to_string(),
                kind: result.analysis.labels.get(&addr).copied(),
            })
            .collect();
        std::fs::write(path, serde_json::to_string_pretty(&arr)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    match out {
        Some(path) => std::fs::write(&path, &result.text).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", result.text),
    }
    Ok(())
}

fn list_opcodes(catalog: &Catalog, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut buf = String::new();
            for desc in catalog.iter() {
                let _ = writeln!(buf, "{desc}");
            }
            Ok(buf)
        }
        OutputFormat::Json => {
            let arr: Vec<DescriptorOut> = catalog
                .iter()
                .map(|desc| DescriptorOut {
                    template: desc.render_with(|i| format!("{{{i}}}")),
                    desc,
                })
                .collect();
            Ok(serde_json::to_string_pretty(&arr)?)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Opcodes { format } => {
            let text = list_opcodes(&Catalog::new(), format)?;
            println!("{}", text.trim_end());
        }
        Command::Disasm(args) => run_disasm(args)?,
    }
    Ok(())
}
