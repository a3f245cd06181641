// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fan-out/fan-in over independent validation units.
//!
//! Signatures of one document, and timestamps of one signature, only read shared inputs and
//! write their own result branch, so they can be validated on scoped worker threads. Output
//! order always matches input order.

use std::num::NonZeroUsize;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// Validate independent units on at most `max_workers` scoped threads.
    Parallel { max_workers: NonZeroUsize },
}

impl ExecutionMode {
    pub fn parallel(max_workers: usize) -> Option<Self> {
        NonZeroUsize::new(max_workers).map(|max_workers| Self::Parallel { max_workers })
    }

    /// Parallel with one worker per available CPU.
    pub fn available_parallelism() -> Self {
        match thread::available_parallelism() {
            Ok(max_workers) => Self::Parallel { max_workers },
            Err(_) => Self::Sequential,
        }
    }
}

/// Apply `f` to every item, returning results in input order.
pub(crate) fn fan_out<'s, T, R, F>(mode: ExecutionMode, items: &'s [T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&'s T) -> R + Sync,
{
    let workers = match mode {
        ExecutionMode::Parallel { max_workers } if items.len() > 1 => {
            max_workers.get().min(items.len())
        }
        _ => return items.iter().map(&f).collect(),
    };

    let chunk_size = items.len().div_ceil(workers);
    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(f).collect::<Vec<R>>()))
            .collect();

        let mut results = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk) => results.extend(chunk),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        results
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_and_parallel_agree_on_order() {
        let items: Vec<u32> = (0..37).collect();
        let seq = fan_out(ExecutionMode::Sequential, &items, |i| i * 3);
        let par = fan_out(ExecutionMode::parallel(4).unwrap(), &items, |i| i * 3);
        assert_eq!(seq, par);
        assert_eq!(par[36], 108);
    }

    #[test]
    fn more_workers_than_items() {
        let items = ["a", "b"];
        let out = fan_out(ExecutionMode::parallel(16).unwrap(), &items, |s| s.to_uppercase());
        assert_eq!(out, ["A", "B"]);
    }

    #[test]
    fn zero_workers_is_not_a_mode() {
        assert_eq!(ExecutionMode::parallel(0), None);
        let empty = Vec::<u8>::new();
        assert!(fan_out(ExecutionMode::available_parallelism(), &empty, |b| *b).is_empty());
    }
}
