//! unbuild CLI - remove incremental-build pages from slide decks

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use unbuild::{
    BatchOptions, BatchReport, BuildDirection, DedupOptions, DocumentOutcome, DocumentReport,
    DuplicateKeep, Unbuild,
};

#[derive(Parser)]
#[command(name = "unbuild")]
#[command(author = "iyulab")]
#[command(version)]
#[command(
    about = "Remove incremental-build pages from slide deck PDFs",
    long_about = None
)]
struct Cli {
    /// Source directory
    #[arg(value_name = "SRC")]
    src: Option<PathBuf>,

    /// Destination directory
    #[arg(value_name = "DST")]
    dst: Option<PathBuf>,

    #[command(flatten)]
    dedup: DedupArgs,

    #[command(flatten)]
    batch: BatchArgs,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every PDF in a directory tree
    Batch {
        /// Source directory
        #[arg(value_name = "SRC")]
        src: PathBuf,

        /// Destination directory (created if absent)
        #[arg(value_name = "DST")]
        dst: PathBuf,

        #[command(flatten)]
        dedup: DedupArgs,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Process a single PDF
    File {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <name>_unbuilt.pdf next to the input)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        dedup: DedupArgs,
    },

    /// Show runs and kept pages without writing anything
    Inspect {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        dedup: DedupArgs,
    },

    /// Show version information
    Version,
}

/// Options controlling how pages are compared.
#[derive(Args, Clone)]
struct DedupArgs {
    /// Position tolerance in points
    #[arg(long, value_name = "PT", default_value_t = unbuild::options::DEFAULT_TOLERANCE)]
    tolerance: f32,

    /// Direction in which builds add content
    #[arg(long, value_enum, default_value = "forward")]
    direction: DirectionArg,

    /// Which of several identical complete pages survives
    #[arg(long, value_enum, default_value = "earliest")]
    keep: KeepArg,

    /// Page comparison strategy
    #[arg(long, value_enum, default_value = "containment")]
    strategy: StrategyArg,

    /// Height fraction compared by the header-band strategy
    #[arg(long, value_name = "FRACTION", default_value_t = unbuild::options::DEFAULT_HEADER_FRACTION)]
    header_fraction: f32,

    /// Ignore text runs matching this regular expression (e.g. slide numbers)
    #[arg(long, value_name = "REGEX")]
    ignore_text: Option<String>,

    /// Fail a document when any page cannot be decoded
    #[arg(long)]
    strict: bool,

    /// Decode pages one at a time
    #[arg(long)]
    sequential: bool,

    /// Compress streams in written documents
    #[arg(long)]
    compress: bool,
}

/// Options controlling directory processing.
#[derive(Args, Clone)]
struct BatchArgs {
    /// Documents processed concurrently (default: available cores)
    #[arg(short, long, env = "UNBUILD_JOBS", value_name = "N")]
    jobs: Option<usize>,

    /// Do not copy files that are not PDFs
    #[arg(long)]
    no_copy: bool,

    /// Analyze only; write nothing
    #[arg(long)]
    dry_run: bool,

    /// Write the batch report as JSON to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    /// Each page adds to the previous one
    Forward,
    /// Each page removes from the previous one
    Reverse,
    /// Either way
    Either,
}

impl From<DirectionArg> for BuildDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Forward => BuildDirection::Forward,
            DirectionArg::Reverse => BuildDirection::Reverse,
            DirectionArg::Either => BuildDirection::Either,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum KeepArg {
    /// Keep the first identical copy
    Earliest,
    /// Keep the last identical copy
    Latest,
}

impl From<KeepArg> for DuplicateKeep {
    fn from(arg: KeepArg) -> Self {
        match arg {
            KeepArg::Earliest => DuplicateKeep::Earliest,
            KeepArg::Latest => DuplicateKeep::Latest,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Every element of the earlier page appears on the later one
    Containment,
    /// The title area of both pages matches
    HeaderBand,
}

impl DedupArgs {
    fn to_options(&self) -> DedupOptions {
        let mut options = DedupOptions::new()
            .with_tolerance(self.tolerance)
            .with_direction(self.direction.into())
            .with_keep(self.keep.into())
            .with_parallel(!self.sequential)
            .with_compress(self.compress);

        if self.strategy == StrategyArg::HeaderBand {
            options = options.header_band(self.header_fraction);
        }
        if self.strict {
            options = options.strict();
        }
        if let Some(ref pattern) = self.ignore_text {
            options = options.with_ignore_text(pattern.clone());
        }
        options
    }
}

impl BatchArgs {
    fn to_options(&self) -> BatchOptions {
        let mut options = BatchOptions::new().with_copy_unsupported(!self.no_copy);
        if let Some(jobs) = self.jobs {
            options = options.with_jobs(jobs);
        }
        if self.dry_run {
            options = options.dry_run();
        }
        options
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Batch {
            src,
            dst,
            dedup,
            batch,
        }) => cmd_batch(&src, &dst, &dedup, &batch),
        Some(Commands::File {
            input,
            output,
            dedup,
        }) => cmd_file(&input, output.as_deref(), &dedup),
        Some(Commands::Inspect { input, json, dedup }) => cmd_inspect(&input, json, &dedup),
        Some(Commands::Version) => {
            cmd_version();
            Ok(true)
        }
        None => match (cli.src, cli.dst) {
            (Some(src), Some(dst)) => cmd_batch(&src, &dst, &cli.dedup, &cli.batch),
            _ => {
                println!("{}", "Usage: unbuild <SRC> <DST>".yellow());
                println!("       unbuild --help for more information");
                Ok(true)
            }
        },
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when any document failed.
fn cmd_batch(
    src: &Path,
    dst: &Path,
    dedup: &DedupArgs,
    batch: &BatchArgs,
) -> Result<bool, Box<dyn std::error::Error>> {
    let runner = Unbuild::new()
        .with_options(dedup.to_options())
        .with_batch_options(batch.to_options())
        .runner()?;

    let plan = runner.plan(src, dst)?;
    log::debug!(
        "Found {} documents and {} other files under {}",
        plan.documents.len(),
        plan.others.len(),
        src.display()
    );
    if plan.documents.is_empty() {
        println!("{} {}", "No PDF files found in".yellow(), src.display());
    }

    let pb = ProgressBar::new(plan.documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let report = runner.run_plan(&plan, dst, |outcome| {
        if let Some(source) = outcome.source() {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            pb.set_message(name);
        }
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    print_batch_summary(&report, batch.dry_run);

    if let Some(ref path) = batch.report {
        fs::write(path, report.to_json()?)?;
        println!("{} {}", "Report saved to".green(), path.display());
    }

    Ok(!report.has_failures())
}

fn print_batch_summary(report: &BatchReport, dry_run: bool) {
    let title = if dry_run {
        "Batch Analysis (dry run)"
    } else {
        "Batch Summary"
    };
    println!("{}", title.cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for outcome in &report.outcomes {
        match outcome {
            DocumentOutcome::Processed(doc) => {
                println!(
                    "  {} {} ({} -> {} pages)",
                    "✓".green(),
                    relative_name(doc.source.as_deref(), &report.source_root),
                    doc.page_count,
                    doc.kept.len()
                );
                for issue in &doc.page_issues {
                    println!(
                        "      {} page {}: {}",
                        "!".yellow(),
                        issue.page + 1,
                        issue.reason.dimmed()
                    );
                }
            }
            DocumentOutcome::Failed(failure) => {
                println!(
                    "  {} {} [{}] {}",
                    "✗".red(),
                    relative_name(Some(&failure.source), &report.source_root),
                    failure.kind,
                    failure.message.red()
                );
            }
        }
    }
    for failure in &report.copy_failures {
        println!(
            "  {} {} [copy] {}",
            "✗".red(),
            relative_name(Some(&failure.source), &report.source_root),
            failure.message.red()
        );
    }

    let succeeded = report.succeeded().count();
    let failed = report.failed().count();
    println!();
    println!(
        "{}: {}  {}: {}  {}: {}  {}: {}",
        "Processed".bold(),
        succeeded.to_string().green(),
        "Failed".bold(),
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        },
        "Pages removed".bold(),
        report.total_removed(),
        "Copied".bold(),
        report.copied.len()
    );
}

fn relative_name(path: Option<&Path>, root: &Path) -> String {
    match path {
        Some(p) => p.strip_prefix(root).unwrap_or(p).display().to_string(),
        None => "<memory>".to_string(),
    }
}

fn cmd_file(
    input: &Path,
    output: Option<&Path>,
    dedup: &DedupArgs,
) -> Result<bool, Box<dyn std::error::Error>> {
    let output = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        input.with_file_name(format!("{}_unbuilt.pdf", stem))
    });

    let report = Unbuild::new()
        .with_options(dedup.to_options())
        .process_file(input, &output)?;

    print_document_report(&report);
    println!("{} {}", "Saved to".green(), output.display());
    Ok(true)
}

fn cmd_inspect(
    input: &Path,
    json: bool,
    dedup: &DedupArgs,
) -> Result<bool, Box<dyn std::error::Error>> {
    let analysis = Unbuild::new()
        .with_options(dedup.to_options())
        .analyze(input)?;

    if json {
        let report = analysis.into_report(Some(input.to_path_buf()), None);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(true);
    }

    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for page in &analysis.pages {
        let (w, h) = page.dimensions();
        if page.is_unreadable() {
            println!("  {:>4}  {}", page.index + 1, "unreadable".red());
        } else {
            println!(
                "  {:>4}  {:>5} elements  {}x{} pt",
                page.index + 1,
                page.signature.len(),
                w.round(),
                h.round()
            );
        }
    }
    println!();

    let report = analysis.into_report(Some(input.to_path_buf()), None);
    print_document_report(&report);
    Ok(true)
}

fn print_document_report(report: &DocumentReport) {
    println!("{}", "Runs".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for run in &report.runs {
        if run.is_singleton() {
            println!("  {:>4}       {} {}", run.start + 1, "keep".green(), run.representative + 1);
        } else {
            println!(
                "  {:>4}-{:<4}  {} {}",
                run.start + 1,
                run.end + 1,
                "keep".green(),
                run.representative + 1
            );
        }
    }
    for issue in &report.page_issues {
        println!(
            "  {} page {}: {}",
            "!".yellow(),
            issue.page + 1,
            issue.reason.dimmed()
        );
    }
    println!();
    println!(
        "{}: {}  {}: {}  {}: {}",
        "Pages".bold(),
        report.page_count,
        "Kept".bold(),
        report.kept.len().to_string().green(),
        "Removed".bold(),
        report.removed_count()
    );
}

fn cmd_version() {
    println!("{} {}", "unbuild".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Incremental-build page remover for slide decks");
    println!();
    println!("License: MIT");
}
