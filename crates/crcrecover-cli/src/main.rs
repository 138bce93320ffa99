//! crcrecover - Recover short ZIP entry contents from their CRC32 and size
//!
//! This tool lists the entries of a ZIP archive, lets the user pick some, and
//! brute-forces every string of each entry's size until its CRC32 matches.

use anyhow::{Context, Result};
use clap::{Args, Parser, ValueEnum};
use crcrecover_core::{
    list_entries, parse_selection, sort_entries, ArchiveEntry, CancellationToken, Charset,
    LineSink, SearchConfig, SearchPolicy, SearchSpec, SearchStatus, Searcher,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Recover short ZIP entry contents from their CRC32 and size
#[derive(Parser, Debug)]
#[command(name = "crcrecover")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Content length in bytes (with --crc)
    #[arg(short, long, requires = "crc")]
    length: Option<u64>,

    /// Add ASCII punctuation to the alphanumeric charset
    #[arg(short, long)]
    symbols: bool,

    /// Use exactly these characters instead of a built-in charset
    #[arg(long, conflicts_with = "symbols")]
    charset: Option<String>,

    /// Number of worker threads (default: available parallelism)
    #[arg(short = 'j', long, env = "CRCRECOVER_WORKERS")]
    workers: Option<usize>,

    /// What to do once a match is found
    #[arg(long, value_enum, default_value = "first")]
    policy: PolicyArg,

    /// Entries to search, e.g. "0-3,5" (prompts on stdin when omitted)
    #[arg(long)]
    select: Option<String>,

    /// Give up on each search after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Only list archive entries without searching
    #[arg(long)]
    list_only: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a ZIP archive whose entries should be recovered
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// CRC32 to search for directly, in hexadecimal
    #[arg(long, value_parser = parse_hex_crc, requires = "length")]
    crc: Option<u32>,
}

/// Match policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Stop at the first match
    First,
    /// Report every match in the search space
    All,
}

impl From<PolicyArg> for SearchPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::First => SearchPolicy::StopOnFirstMatch,
            PolicyArg::All => SearchPolicy::CollectAll,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let searcher = Searcher::with_config(search_config(&cli));
    let charset = build_charset(&cli);
    debug!("Using charset of {} characters: {}", charset.len(), charset);

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_archive(&cli, &searcher, &charset, file)
    } else if let (Some(crc), Some(length)) = (cli.input.crc, cli.length) {
        let spec = SearchSpec::new(length, crc, charset);
        run_search(&searcher, &spec, &format!("{:08x}", crc))
    } else {
        anyhow::bail!("Either --file or --crc with --length must be specified")
    }
}

/// Parse a CRC32 given in hex, with or without a `0x` prefix
fn parse_hex_crc(s: &str) -> std::result::Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex CRC32 '{}': {}", s, e))
}

fn build_charset(cli: &Cli) -> Charset {
    match cli.charset {
        Some(ref chars) => Charset::new(chars),
        None => Charset::for_symbols(cli.symbols),
    }
}

fn search_config(cli: &Cli) -> SearchConfig {
    let mut config = SearchConfig::new().policy(cli.policy.into());
    if let Some(workers) = cli.workers {
        config = config.workers(workers);
    }
    if let Some(secs) = cli.timeout {
        config = config.timeout(Duration::from_secs(secs));
    }
    config
}

/// One line of the entry listing
fn entry_line(index: usize, entry: &ArchiveEntry) -> String {
    format!(
        "{}. Name: {}, Size: {}, CRC32: {:x}",
        index, entry.name, entry.uncompressed_size, entry.checksum
    )
}

/// List an archive, ask which entries to recover, and search each of them
fn process_archive(cli: &Cli, searcher: &Searcher, charset: &Charset, path: &Path) -> Result<()> {
    let mut entries = list_entries(path)
        .with_context(|| format!("Failed to read archive: {}", path.display()))?;
    entries.retain(|entry| !entry.is_dir());
    sort_entries(&mut entries);

    if entries.is_empty() {
        println!("No file entries in {}", path.display());
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        println!("{}", entry_line(i, entry));
    }

    if cli.list_only {
        return Ok(());
    }

    let input = match cli.select {
        Some(ref text) => text.clone(),
        None => prompt_selection()?,
    };
    let choices = parse_selection(&input).context("Invalid selection")?;
    info!("Selected {} entr(ies)", choices.len());

    for choice in choices {
        let Some(entry) = entries.get(choice) else {
            warn!("Invalid choice: {} (listing has {} entries)", choice, entries.len());
            continue;
        };

        let spec = SearchSpec::from_entry(entry, charset.clone());
        if let Err(e) = run_search(searcher, &spec, &entry.name) {
            // Oversized entries are expected in real archives; keep going
            match e.downcast_ref::<crcrecover_core::Error>() {
                Some(core) if core.is_configuration() => warn!("Skipping {}: {}", entry.name, core),
                _ => return Err(e),
            }
        }
    }

    Ok(())
}

fn prompt_selection() -> Result<String> {
    print!("Enter the numbers of the files you want to select (e.g., 0-3,5,7-9): ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read selection from stdin")?;
    Ok(line)
}

/// Run one search, printing matches to stdout as they are found
fn run_search(searcher: &Searcher, spec: &SearchSpec, label: &str) -> Result<()> {
    info!(
        "Searching {} (length {}, crc {:08x})",
        label, spec.length, spec.target_checksum
    );

    let stdout = io::stdout();
    let mut sink = LineSink::new(stdout.lock());
    let result = searcher.search_with(spec, &CancellationToken::new(), &mut sink)?;

    match result.status {
        SearchStatus::Cancelled => warn!(
            "Search for {} timed out after {} candidates",
            label, result.evaluated
        ),
        _ if !result.is_found() => println!("No match found for {}", label),
        _ => {}
    }

    info!(
        "{}: {}, {} match(es), {} candidates evaluated",
        label,
        result.status.as_str(),
        result.matches.len(),
        result.evaluated
    );
    Ok(())
}
