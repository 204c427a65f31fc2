use anyhow::{bail, Context, Result};
use std::ops::Range;
use tracing::{debug, error};

use crate::reduce::{parallel_accumulate, SequenceView};
use crate::timer::Stopwatch;

pub const DEFAULT_LENGTH: usize = 10_000_000;
pub const DEFAULT_FIRST: usize = 1;
pub const DEFAULT_END: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Abort,
    Continue,
}

#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub workers: usize,
    pub watch: Stopwatch,
    pub total: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub completed: usize,
    pub failed: usize,
}

pub struct Sweep {
    first: usize,
    end: usize,
}

impl Sweep {
    pub fn new(first: usize, end: usize) -> Result<Self> {
        if first == 0 {
            bail!("Worker counts must start at 1 or more");
        }
        if first >= end {
            bail!("Empty worker range: {}..{}", first, end);
        }

        Ok(Self { first, end })
    }

    pub fn worker_counts(&self) -> Range<usize> {
        self.first..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first >= self.end
    }

    pub fn max_workers(&self) -> usize {
        self.end - 1
    }

    /// Errors returned by `on_sample` abort regardless of `policy`.
    pub fn run<F>(
        &self,
        data: &[i64],
        expected: i64,
        policy: FailurePolicy,
        mut on_sample: F,
    ) -> Result<SweepSummary>
    where
        F: FnMut(&Sample) -> Result<()>,
    {
        let mut summary = SweepSummary::default();

        for workers in self.worker_counts() {
            match measure(data, workers, expected) {
                Ok(sample) => {
                    debug!(workers, elapsed = ?sample.watch.elapsed(), "pass complete");
                    on_sample(&sample)?;
                    summary.completed += 1;
                }
                Err(err) if policy == FailurePolicy::Continue => {
                    error!(workers, error = ?err, "pass failed, continuing sweep");
                    summary.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(summary)
    }
}

fn measure(data: &[i64], workers: usize, expected: i64) -> Result<Sample> {
    let mut watch = Stopwatch::start();
    let total = parallel_accumulate(SequenceView::full(data), 0, workers)
        .with_context(|| format!("Reduction with {} workers failed", workers))?;
    watch.stop();

    if total != expected {
        bail!(
            "Reduction with {} workers returned {}, expected {}",
            workers,
            total,
            expected
        );
    }

    Ok(Sample {
        workers,
        watch,
        total,
    })
}
