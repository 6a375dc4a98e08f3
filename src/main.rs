use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, Level};
use snv_edges::config::EdgeConfig;
use snv_edges::contingency::VariantIndex;
use snv_edges::ground_truth::GroundTruth;
use snv_edges::structure::SnvStructure;
use snv_edges::types::Acceptance;
use snv_edges::{bam_loader, edges, output};
use std::path::Path;

#[derive(Parser)]
#[command(name = "snv-edges")]
#[command(version)]
#[command(about = "Find linked minor-allele pairs across aligned reads", long_about = None)]
struct Args {
    /// Input SAM/BAM/CRAM file of reads aligned to one reference
    #[arg(short, long)]
    input: String,

    /// Output CSV file path
    #[arg(short, long)]
    output: String,

    /// Reference contig to analyse (defaults to the first in the header)
    #[arg(long)]
    contig: Option<String>,

    /// FASTA of known haplotypes; edges are flagged when a haplotype carries both alleles
    #[arg(long)]
    ground_truth: Option<String>,

    /// Minimum minor reads per variant and per pair
    #[arg(long, default_value = "10")]
    min_o22: u64,

    /// First reference position to analyse (0-based, inclusive)
    #[arg(long, default_value = "0")]
    start: usize,

    /// Last reference position to analyse (0-based, inclusive)
    #[arg(long)]
    end: Option<usize>,

    /// Pairs closer than or at this distance are never linked
    #[arg(long, default_value = "1")]
    close_positions: usize,

    /// Tolerated read error; weight and threshold of the error ratio
    #[arg(long, default_value = "0.1")]
    max_read_error: f64,

    /// Numerator of the per-pair Bonferroni threshold
    #[arg(long, default_value = "1e-7")]
    adjustment: f64,

    /// Treat the sample as single-end even if mates are present
    #[arg(long)]
    single_read: bool,

    /// Typical fragment length (defaults to the mean read span)
    #[arg(long)]
    fragment_length: Option<f64>,

    /// Skip pairs involving a deletion
    #[arg(long)]
    ignore_deletions: bool,

    /// Number of threads for parallel processing
    #[arg(long, default_value_t = num_cpus())]
    threads: usize,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Log every accepted pair
    #[arg(short, long)]
    verbose: bool,
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

macro_rules! progress {
    ($quiet:expr) => {
        if !$quiet {
            eprintln!();
        }
    };
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

fn make_progress_bar(quiet: bool, len: u64) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("  [{elapsed_precise}/{eta_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::Debug } else { Level::Info };
    simple_logger::init_with_level(level)?;

    // Configure rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    if !Path::new(&args.input).exists() {
        anyhow::bail!("Input file not found: {}", args.input);
    }

    progress!(args.quiet, "SNV Edge Finder");
    progress!(args.quiet, "=========================================");
    progress!(args.quiet, "Input: {}", args.input);
    progress!(args.quiet, "Output CSV: {}", args.output);
    progress!(args.quiet, "Min o22: {}", args.min_o22);
    progress!(args.quiet, "Max read error: {}", args.max_read_error);
    progress!(args.quiet, "Adjustment: {:e}", args.adjustment);
    progress!(args.quiet, "Threads: {}", args.threads);
    progress!(args.quiet);

    // Step 1: Load reads
    progress!(args.quiet, "Step 1: Loading aligned reads...");
    let sample = bam_loader::load_reads(Path::new(&args.input), args.contig.as_deref(), args.quiet)?;
    if sample.reads.is_empty() {
        anyhow::bail!("No reads passed filters!");
    }

    let ground_truth = match args.ground_truth {
        Some(ref path) => {
            let truth = GroundTruth::from_fasta(Path::new(path))?;
            progress!(args.quiet, "Ground truth haplotypes: {}", truth.len());
            Some(truth)
        }
        None => None,
    };

    // Step 2: Variant table
    progress!(args.quiet);
    progress!(args.quiet, "Step 2: Building variant table...");
    let single_read = args.single_read || !sample.paired;
    let structure = SnvStructure::from_reads(sample.reads, sample.reference_length);
    let fragment_length = args.fragment_length.unwrap_or_else(|| structure.mean_read_span());
    progress!(args.quiet, "  Observed minor variants: {}", structure.observed_variants());
    progress!(args.quiet, "  Reads: {} ({})", structure.reads().len(), if single_read { "single" } else { "paired" });
    progress!(args.quiet, "  Fragment length: {:.1}", fragment_length);

    let config = EdgeConfig {
        min_o22: args.min_o22,
        start_position: args.start,
        end_position: args.end.unwrap_or(usize::MAX),
        close_positions: args.close_positions,
        max_read_error: args.max_read_error,
        adjustment: args.adjustment,
        single_read,
        fragment_length,
        ignore_deletions: args.ignore_deletions,
    };

    // Step 3: Scan anchors (parallelized)
    progress!(args.quiet);
    progress!(args.quiet, "Step 3: Testing variant pairs...");
    let pb = make_progress_bar(args.quiet, structure.width() as u64)?;
    let scan = edges::find_edges(&structure, &config, ground_truth.as_ref(), Some(&pb))?;
    pb.finish_and_clear();

    if !scan.failures.is_empty() {
        warn!("{} anchor task(s) failed; their pairs are missing from the output", scan.failures.len());
    }

    // Step 4: Summary
    progress!(args.quiet);
    progress!(args.quiet, "Step 4: Summary");
    progress!(args.quiet, "  Edges: {}", scan.edges.len());
    progress!(args.quiet, "  Exact test: {}", scan.count(Acceptance::Exact));
    progress!(args.quiet, "  Error-ratio heuristic: {}", scan.count(Acceptance::Heuristic));
    if ground_truth.is_some() {
        progress!(args.quiet, "  Matching ground truth: {} / {}", scan.true_edges(), scan.edges.len());
    }

    progress!(args.quiet);
    progress!(args.quiet, "Step 5: Writing edges to CSV...");
    output::write_edges(&scan.edges, Path::new(&args.output))?;

    info!("Wrote {} edges to {}", scan.edges.len(), args.output);
    Ok(())
}
