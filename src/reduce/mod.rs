use std::any::Any;
use std::io;
use std::iter;
use std::ops::Add;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ScopedJoinHandle};

use tracing::{debug, warn};

use crate::error::ReduceError;

pub type Result<T> = std::result::Result<T, ReduceError>;

pub trait Element: Copy + Default + Add<Output = Self> + Send + Sync {}

impl<T> Element for T where T: Copy + Default + Add<Output = T> + Send + Sync {}

#[derive(Debug, Clone, Copy)]
pub struct SequenceView<'a, T> {
    data: &'a [T],
    start: usize,
    end: usize,
}

impl<'a, T> SequenceView<'a, T> {
    pub fn new(data: &'a [T], start: usize, end: usize) -> Result<Self> {
        if start > end || end > data.len() {
            return Err(ReduceError::InvalidArgument(format!(
                "view {}..{} is out of bounds for a sequence of length {}",
                start,
                end,
                data.len()
            )));
        }

        Ok(Self { data, start, end })
    }

    pub fn full(data: &'a [T]) -> Self {
        Self {
            data,
            start: 0,
            end: data.len(),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_slice(&self) -> &'a [T] {
        &self.data[self.start..self.end]
    }

    fn block(&self, block: &Block) -> &'a [T] {
        &self.data[block.start..block.end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Block {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The tail block absorbs the remainder. When `workers > len` every spawned
/// block is empty and the tail holds the whole range.
#[derive(Debug, Clone, Copy)]
pub struct BlockPlan {
    start: usize,
    end: usize,
    workers: usize,
    block_size: usize,
}

impl BlockPlan {
    pub fn new(start: usize, end: usize, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(ReduceError::InvalidArgument(
                "worker count must be at least 1".to_string(),
            ));
        }
        if start > end {
            return Err(ReduceError::InvalidArgument(format!(
                "range start {} is past its end {}",
                start, end
            )));
        }

        Ok(Self {
            start,
            end,
            workers,
            block_size: (end - start) / workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn worker_blocks(&self) -> impl Iterator<Item = Block> {
        let plan = *self;
        (0..plan.workers - 1).map(move |index| Block {
            index,
            start: plan.start + index * plan.block_size,
            end: plan.start + (index + 1) * plan.block_size,
        })
    }

    pub fn tail(&self) -> Block {
        Block {
            index: self.workers - 1,
            start: self.start + (self.workers - 1) * self.block_size,
            end: self.end,
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = Block> {
        self.worker_blocks().chain(iter::once(self.tail()))
    }
}

pub fn accumulate_block<T>(block: &[T]) -> T
where
    T: Copy + Default + Add<Output = T>,
{
    block.iter().fold(T::default(), |acc, &x| acc + x)
}

pub fn parallel_accumulate<T: Element>(
    view: SequenceView<'_, T>,
    init: T,
    workers: usize,
) -> Result<T> {
    parallel_reduce_with(view, init, workers, |_, block| accumulate_block(block))
}

/// Every spawned worker is joined before this returns. When several blocks
/// fail, the first in worker order is returned and the rest are logged.
pub fn parallel_reduce_with<T, F>(
    view: SequenceView<'_, T>,
    init: T,
    workers: usize,
    reducer: F,
) -> Result<T>
where
    T: Element,
    F: Fn(&Block, &[T]) -> T + Sync,
{
    reduce_pass(view, init, workers, &reducer, |block| {
        Ok(thread::Builder::new().name(format!("blocksum-worker-{}", block.index)))
    })
}

fn reduce_pass<T, F, B>(
    view: SequenceView<'_, T>,
    init: T,
    workers: usize,
    reducer: &F,
    builder: B,
) -> Result<T>
where
    T: Element,
    F: Fn(&Block, &[T]) -> T + Sync,
    B: Fn(&Block) -> io::Result<thread::Builder>,
{
    let plan = BlockPlan::new(view.start(), view.end(), workers)?;
    if view.is_empty() {
        return Ok(init);
    }

    debug!(
        workers,
        len = view.len(),
        block_size = plan.block_size(),
        "starting reduction pass"
    );

    thread::scope(|scope| {
        let mut failures = Failures::default();
        let mut handles = Vec::with_capacity(workers - 1);

        for block in plan.worker_blocks() {
            let slice = view.block(&block);
            let spawned = match builder(&block) {
                Ok(thread_builder) => {
                    thread_builder.spawn_scoped(scope, move || reducer(&block, slice))
                }
                Err(err) => Err(err),
            };

            match spawned {
                Ok(handle) => handles.push((block, handle)),
                Err(source) => {
                    failures.record(ReduceError::ResourceExhaustion {
                        index: block.index,
                        source,
                    });
                    break;
                }
            }
        }

        // The tail is not reduced once a spawn has failed.
        let tail = plan.tail();
        let last = if failures.is_empty() {
            Some(
                panic::catch_unwind(AssertUnwindSafe(|| reducer(&tail, view.block(&tail))))
                    .map_err(|payload| worker_failure(&tail, payload)),
            )
        } else {
            None
        };

        let partials = join_all(handles, &mut failures);
        let last = match last {
            Some(Ok(last)) => Some(last),
            Some(Err(err)) => {
                failures.record(err);
                None
            }
            None => None,
        };

        if let Some(err) = failures.into_first() {
            return Err(err);
        }

        let blocks = partials.len() + usize::from(last.is_some());
        panic::catch_unwind(AssertUnwindSafe(move || {
            let mut total = init;
            for partial in partials {
                total = total + partial;
            }
            if let Some(last) = last {
                total = total + last;
            }
            total
        }))
        .map_err(|payload| ReduceError::CombineFailure {
            blocks,
            message: panic_message(payload.as_ref()),
        })
    })
}

fn join_all<'scope, T>(
    handles: Vec<(Block, ScopedJoinHandle<'scope, T>)>,
    failures: &mut Failures,
) -> Vec<T> {
    let mut partials = Vec::with_capacity(handles.len());
    for (block, handle) in handles {
        match handle.join() {
            Ok(partial) => partials.push(partial),
            Err(payload) => failures.record(worker_failure(&block, payload)),
        }
    }
    partials
}

#[derive(Default)]
struct Failures {
    first: Option<ReduceError>,
}

impl Failures {
    fn record(&mut self, err: ReduceError) {
        if self.first.is_none() {
            self.first = Some(err);
        } else {
            warn!(error = %err, "suppressed secondary failure while joining workers");
        }
    }

    fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    fn into_first(self) -> Option<ReduceError> {
        self.first
    }
}

fn worker_failure(block: &Block, payload: Box<dyn Any + Send>) -> ReduceError {
    ReduceError::WorkerFailure {
        index: block.index,
        start: block.start,
        end: block.end,
        message: panic_message(payload.as_ref()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
