use std::path::PathBuf;
use std::time::Instant;
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use blocksum::dataset::{self, DatasetReader};
use blocksum::io::{create_progress_bar, TimingWriter};
use blocksum::sweep::{FailurePolicy, Sweep, DEFAULT_END, DEFAULT_FIRST, DEFAULT_LENGTH};

#[derive(Parser, Debug)]
#[command(name = "blocksum")]
#[command(about = "Time a fixed fan-out parallel sum across a range of worker counts", long_about = None)]
struct Args {
    /// Number of consecutive integers (1..=N) to sum
    #[arg(short = 'n', long, default_value_t = DEFAULT_LENGTH)]
    length: usize,

    /// Smallest worker count to time
    #[arg(long, default_value_t = DEFAULT_FIRST)]
    from: usize,

    /// Worker count to stop before (exclusive)
    #[arg(long, default_value_t = DEFAULT_END)]
    to: usize,

    /// Output file for the timing record
    #[arg(short, long, value_name = "OUTPUT", default_value = "output.txt")]
    output: PathBuf,

    /// Read the sequence from a file of little-endian i64 values instead
    #[arg(short, long, value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Log failing passes and keep sweeping instead of aborting
    #[arg(short, long)]
    keep_going: bool,

    /// Disable progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let sweep = Sweep::new(args.from, args.to)?;

    let hardware_threads = num_cpus::get();
    info!(hardware_threads, max_workers = sweep.max_workers(), "starting sweep");
    if sweep.max_workers() > hardware_threads {
        warn!(
            hardware_threads,
            max_workers = sweep.max_workers(),
            "sweep oversubscribes the available hardware threads"
        );
    }

    // Build or load the sequence
    let data = match &args.input {
        Some(path) => {
            let reader = DatasetReader::new(path)?;
            info!(path = %path.display(), len = reader.len(), "loaded dataset");
            reader.to_vec()
        }
        None => dataset::iota(args.length),
    };
    let expected = dataset::reference_sum(&data)?;

    let mut writer = TimingWriter::new(&args.output)?;

    let progress = if !args.quiet {
        Some(create_progress_bar(sweep.len()))
    } else {
        None
    };

    let policy = if args.keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };

    let start_time = Instant::now();

    let summary = sweep.run(&data, expected, policy, |sample| {
        writer.write_sample(sample.workers, &sample.watch)?;
        if let Some(ref pb) = progress {
            pb.inc(1);
        }
        Ok(())
    })?;

    if let Some(ref pb) = progress {
        pb.finish_with_message("Sweep complete");
    }

    let written = writer.finish()?;

    info!(
        completed = summary.completed,
        failed = summary.failed,
        samples = written,
        elapsed = ?start_time.elapsed(),
        output = %args.output.display(),
        "sweep finished"
    );

    if summary.failed > 0 {
        anyhow::bail!("{} of {} passes failed", summary.failed, sweep.len());
    }

    Ok(())
}
