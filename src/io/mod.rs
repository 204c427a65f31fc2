use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::timer::Stopwatch;

pub const HEADER: &str = "number_of_threads,time";

/// Writes one `workers,milliseconds` line per timed pass.
pub struct TimingWriter {
    writer: BufWriter<File>,
    samples_written: usize,
}

impl TimingWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .with_context(|| {
                format!("Failed to create output file: {}", path.as_ref().display())
            })?;

        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        writeln!(writer, "{}", HEADER)?;

        Ok(Self {
            writer,
            samples_written: 0,
        })
    }

    pub fn write_sample(&mut self, workers: usize, watch: &Stopwatch) -> Result<()> {
        writeln!(self.writer, "{},{:.6}", workers, watch.millis())?;
        self.samples_written += 1;
        Ok(())
    }

    /// Flushes buffered lines and returns how many samples were written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush().context("Failed to flush output file")?;
        Ok(self.samples_written)
    }
}

pub fn create_progress_bar(total_steps: usize) -> ProgressBar {
    let pb = ProgressBar::new(total_steps as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} worker counts ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
