pub mod dataset;
pub mod error;
pub mod io;
pub mod reduce;
pub mod sweep;
pub mod timer;

pub use error::ReduceError;
pub use reduce::{
    accumulate_block, parallel_accumulate, parallel_reduce_with, Block, BlockPlan, SequenceView,
};
