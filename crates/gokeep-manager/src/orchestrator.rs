use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;

/// Aggregate of a bulk operation: every successful result plus the
/// first error encountered. Bulk commands render the results before
/// surfacing the error, so no partial run is silently truncated.
#[derive(Debug)]
pub struct BatchOutcome<R> {
    pub results: Vec<R>,
    pub first_error: Option<anyhow::Error>,
}

impl<R> BatchOutcome<R> {
    pub fn into_result(self) -> Result<Vec<R>> {
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}

/// Bounded worker pool for per-binary operations. Workers pull from a
/// shared cursor; results accumulate under a single mutex. There is no
/// cancellation of siblings on failure — every launched task runs to
/// completion, then the first error (by input order) wins.
pub struct Orchestrator {
    parallelism: usize,
}

impl Orchestrator {
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    /// Pool size defaulted to the number of available CPUs.
    pub fn with_default_parallelism() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        Self::new(parallelism)
    }

    pub fn run<T, R, F>(&self, items: Vec<T>, operation: F) -> BatchOutcome<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync,
    {
        if items.is_empty() {
            return BatchOutcome {
                results: Vec::new(),
                first_error: None,
            };
        }

        let cursor = AtomicUsize::new(0);
        let collected: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::with_capacity(items.len()));
        let failures: Mutex<Vec<(usize, anyhow::Error)>> = Mutex::new(Vec::new());
        let workers = self.parallelism.min(items.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(index) else {
                        break;
                    };
                    match operation(item) {
                        Ok(result) => {
                            let mut collected = collected
                                .lock()
                                .unwrap_or_else(|poisoned| poisoned.into_inner());
                            collected.push((index, result));
                        }
                        Err(err) => {
                            let mut failures = failures
                                .lock()
                                .unwrap_or_else(|poisoned| poisoned.into_inner());
                            failures.push((index, err));
                        }
                    }
                });
            }
        });

        let mut results = collected
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.sort_by_key(|(index, _)| *index);
        let mut failures = failures
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        failures.sort_by_key(|(index, _)| *index);

        BatchOutcome {
            results: results.into_iter().map(|(_, result)| result).collect(),
            first_error: failures.into_iter().next().map(|(_, err)| err),
        }
    }
}
