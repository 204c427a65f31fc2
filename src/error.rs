use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReduceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("worker {index} failed on block {start}..{end}: {message}")]
    WorkerFailure {
        index: usize,
        start: usize,
        end: usize,
        message: String,
    },
    #[error("combining {blocks} partial sums failed: {message}")]
    CombineFailure { blocks: usize, message: String },
    #[error("failed to spawn worker {index}: {source}")]
    ResourceExhaustion {
        index: usize,
        #[source]
        source: io::Error,
    },
}
