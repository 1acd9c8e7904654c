//! fast-search - find files by name, size, modification time, access rights
//! and content.
//!
//! Usage:
//!   fast-search --dirs /var/log --file_suffixes .log --file_content_words ERROR
//!   fast-search --dirs ~/src,~/docs --file_prefixes img_ --file_size_range [0,1048576]
//!   fast-search --help

use std::collections::BTreeSet;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeZone};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use fastsearch_content::{
    AccessRight, MatchEvent, ModifiedRange, PoolConfig, SearchCriteria, SearchReport, Searcher,
    ShutdownOutcome, SizeRange,
};

/// Timestamp format of `--file_modified_time_range` bounds.
const TIME_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Parser)]
#[command(
    name = "fast-search",
    version,
    about = "Find files by name, size, modification time, access rights and content",
    long_about = "fast-search walks the given directories (following symbolic links) and \
                  prints every file that satisfies all of the given conditions.\n\n\
                  Within one condition the listed values are alternatives. When content \
                  words are given, files passing the other conditions are scanned line by \
                  line and each matching line is printed instead of the file."
)]
struct Cli {
    /// Directories to search (comma-delimited)
    #[arg(long = "dirs", value_delimiter = ',', required = true)]
    dirs: Vec<PathBuf>,

    /// File name prefixes (comma-delimited)
    #[arg(long = "file_prefixes", value_delimiter = ',')]
    file_prefixes: Vec<String>,

    /// File name suffixes (comma-delimited)
    #[arg(long = "file_suffixes", value_delimiter = ',')]
    file_suffixes: Vec<String>,

    /// Substrings of the file name (comma-delimited)
    #[arg(long = "file_names", value_delimiter = ',')]
    file_names: Vec<String>,

    /// Inclusive size range in bytes
    #[arg(long = "file_size_range", value_name = "[MIN,MAX]", value_parser = parse_size_range)]
    file_size_range: Option<SizeRange>,

    /// Inclusive modification time range, in local time
    #[arg(
        long = "file_modified_time_range",
        value_name = "[yyyyMMddHHmmss,yyyyMMddHHmmss]",
        value_parser = parse_time_range
    )]
    file_modified_time_range: Option<ModifiedRange>,

    /// Required access rights: read, write, execute (comma-delimited)
    #[arg(long = "file_access", value_delimiter = ',')]
    file_access: Vec<String>,

    /// Words to look for in file contents (comma-delimited)
    #[arg(long = "file_content_words", value_delimiter = ',')]
    file_content_words: Vec<String>,

    /// Number of content search workers (0 = automatic)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log debug details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    // Usage errors exit with 1 like every other configuration error.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(1);
        }
        Err(err) => err.exit(),
    };

    init_tracing(cli.verbose);

    let criteria = build_criteria(&cli)?;
    let pool_config = PoolConfig::builder()
        .workers(cli.workers)
        .build()
        .context("Invalid worker pool configuration")?;
    let searcher = Searcher::new(criteria).with_pool_config(pool_config);

    run_search(searcher, cli.format)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Turn command line values into validated search criteria.
fn build_criteria(cli: &Cli) -> Result<SearchCriteria> {
    let criteria = SearchCriteria::builder()
        .roots(cli.dirs.clone())
        .name_prefixes(non_empty("--file_prefixes", &cli.file_prefixes)?)
        .name_suffixes(non_empty("--file_suffixes", &cli.file_suffixes)?)
        .name_substrings(non_empty("--file_names", &cli.file_names)?)
        .size_range(cli.file_size_range)
        .modified_range(cli.file_modified_time_range)
        .access(parse_access(&cli.file_access)?)
        .content_words(non_empty("--file_content_words", &cli.file_content_words)?)
        .build()?;
    Ok(criteria)
}

/// Drop blank entries from a list flag. A flag given with nothing but blank
/// entries is an error.
fn non_empty(flag: &str, values: &[String]) -> Result<Vec<String>> {
    let kept: Vec<String> = values.iter().filter(|v| !v.is_empty()).cloned().collect();
    if kept.is_empty() && !values.is_empty() {
        bail!("{flag} is empty");
    }
    Ok(kept)
}

/// Parse access rights, skipping unknown names with a warning.
fn parse_access(values: &[String]) -> Result<BTreeSet<AccessRight>> {
    let mut rights = BTreeSet::new();
    for value in values.iter().filter(|v| !v.is_empty()) {
        match AccessRight::from_str(value) {
            Ok(right) => {
                rights.insert(right);
            }
            Err(_) => warn!("ignoring unknown access right `{value}`"),
        }
    }
    if rights.is_empty() && !values.is_empty() {
        bail!("--file_access has no valid right (expected read, write or execute)");
    }
    Ok(rights)
}

/// Split `[a,b]` (brackets optional) into its two trimmed parts.
fn parse_pair(s: &str) -> Result<(&str, &str), String> {
    let inner = s.trim();
    let inner = inner.strip_prefix('[').unwrap_or(inner);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    match inner.split(',').collect::<Vec<_>>().as_slice() {
        [min, max] => Ok((min.trim(), max.trim())),
        _ => Err(format!("expected [min,max], got `{s}`")),
    }
}

fn parse_size_range(s: &str) -> Result<SizeRange, String> {
    let (min, max) = parse_pair(s)?;
    let min = min
        .parse::<u64>()
        .map_err(|e| format!("invalid minimum size `{min}`: {e}"))?;
    let max = max
        .parse::<u64>()
        .map_err(|e| format!("invalid maximum size `{max}`: {e}"))?;
    Ok(SizeRange::new(min, max))
}

fn parse_time_range(s: &str) -> Result<ModifiedRange, String> {
    let (min, max) = parse_pair(s)?;
    Ok(ModifiedRange::new(local_millis(min)?, local_millis(max)?))
}

/// Milliseconds since the Unix epoch of a local `yyyyMMddHHmmss` timestamp.
fn local_millis(s: &str) -> Result<i64, String> {
    let naive = NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| format!("invalid timestamp `{s}` (expected yyyyMMddHHmmss): {e}"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.timestamp_millis())
        .ok_or_else(|| format!("timestamp `{s}` does not exist in the local time zone"))
}

/// Run the search on a background thread and print events as they arrive.
fn run_search(searcher: Searcher, format: OutputFormat) -> Result<()> {
    let (tx, rx) = unbounded();
    let handle = thread::Builder::new()
        .name("fast-search-walker".to_string())
        .spawn(move || searcher.run(tx))
        .context("Failed to start search thread")?;

    let mut printer = Printer::new(format);
    print_events(&rx, &mut printer, || handle.is_finished())?;

    let report = handle
        .join()
        .map_err(|_| eyre!("search thread panicked"))??;

    // Workers that were abandoned may still hold a sender; take whatever
    // arrived before the report was produced.
    for event in rx.try_iter() {
        printer.print(&event)?;
    }
    printer.flush()?;

    print_summary(&report);
    Ok(())
}

/// Print events until the channel closes or `finished` reports the search
/// is over.
fn print_events(
    rx: &Receiver<MatchEvent>,
    printer: &mut Printer,
    finished: impl Fn() -> bool,
) -> Result<()> {
    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => printer.print(&event)?,
            Err(RecvTimeoutError::Timeout) => {
                if finished() {
                    return Ok(());
                }
                printer.flush()?;
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

struct Printer {
    format: OutputFormat,
    out: BufWriter<io::Stdout>,
    attribute_matches: u64,
}

impl Printer {
    fn new(format: OutputFormat) -> Self {
        Self {
            format,
            out: BufWriter::new(io::stdout()),
            attribute_matches: 0,
        }
    }

    fn print(&mut self, event: &MatchEvent) -> Result<()> {
        match self.format {
            OutputFormat::Text => match event {
                MatchEvent::AttributeMatch { path } => {
                    self.attribute_matches += 1;
                    writeln!(self.out, "{} => {}", self.attribute_matches, path.display())?;
                }
                MatchEvent::ContentMatch {
                    path,
                    line_number,
                    line,
                } => {
                    writeln!(self.out, "match:{},{},[ {} ]", path.display(), line_number, line)?;
                }
            },
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, event)?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn print_summary(report: &SearchReport) {
    eprintln!(
        "{} file match(es), {} content match(es) in {} file(s) scanned ({}), {:.2}s",
        report.attribute_matches(),
        report.content_matches(),
        report.content.files_scanned,
        format_size(report.content.bytes_scanned),
        report.total_duration.as_secs_f64()
    );
    if !report.warnings.is_empty() {
        eprintln!("{} warning(s) during search", report.warnings.len());
    }
    match report.shutdown {
        ShutdownOutcome::Clean => {}
        ShutdownOutcome::Forced => eprintln!("content search workers had to be force-stopped"),
        ShutdownOutcome::Abandoned { still_running } => {
            eprintln!("unable to shut down cleanly: {still_running} worker(s) abandoned")
        }
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_range() {
        let range = parse_size_range("[10,2000]").unwrap();
        assert_eq!((range.min, range.max), (10, 2000));

        let range = parse_size_range(" 0 , 5 ").unwrap();
        assert_eq!((range.min, range.max), (0, 5));

        assert!(parse_size_range("[10]").is_err());
        assert!(parse_size_range("[1,2,3]").is_err());
        assert!(parse_size_range("[-1,5]").is_err());
    }

    #[test]
    fn test_parse_time_range_in_local_time() {
        let range = parse_time_range("[20230101000000,20231231235959]").unwrap();
        let expected = Local
            .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
            .earliest()
            .unwrap()
            .timestamp_millis();
        assert_eq!(range.min_millis, expected);
        assert!(range.min_millis < range.max_millis);

        assert!(parse_time_range("[2023-01-01,20231231235959]").is_err());
    }

    #[test]
    fn test_reversed_time_range_is_rejected() {
        let cli = Cli::try_parse_from([
            "fast-search",
            "--dirs",
            ".",
            "--file_modified_time_range",
            "[20240101000000,20230101000000]",
        ])
        .unwrap();
        assert!(build_criteria(&cli).is_err());
    }

    #[test]
    fn test_no_condition_is_rejected() {
        let cli = Cli::try_parse_from(["fast-search", "--dirs", "."]).unwrap();
        assert!(build_criteria(&cli).is_err());
    }

    #[test]
    fn test_comma_delimited_lists() {
        let cli = Cli::try_parse_from([
            "fast-search",
            "--dirs",
            "/a,/b",
            "--file_suffixes",
            ".rs,,.toml",
            "--file_access",
            "READ,bogus,execute",
        ])
        .unwrap();
        let criteria = build_criteria(&cli).unwrap();

        assert_eq!(criteria.roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(criteria.name_suffixes, vec![".rs", ".toml"]);
        assert_eq!(
            criteria.access,
            BTreeSet::from([AccessRight::Readable, AccessRight::Executable])
        );
    }

    #[test]
    fn test_blank_list_is_rejected() {
        let cli =
            Cli::try_parse_from(["fast-search", "--dirs", ".", "--file_prefixes", ","]).unwrap();
        assert!(build_criteria(&cli).is_err());
    }

    #[test]
    fn test_missing_dirs_is_usage_error() {
        assert!(Cli::try_parse_from(["fast-search", "--file_prefixes", "a"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
