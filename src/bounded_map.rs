//! Order-preserving concurrent map with a cap on in-flight work
//!
//! [`map_bounded`] runs one task per input item on the tokio runtime, never
//! more than `limit` at a time, and writes every result into the slot of the
//! item it was computed from. Completion order therefore has no influence on
//! the output order.

use std::future::Future;
use tokio::task::{JoinError, JoinSet};
use tracing::trace;

/// Map `items` through `f` with at most `limit` invocations running at once
///
/// # Arguments
/// * `items` - Work items; `result[i]` is computed from `items[i]`
/// * `limit` - Maximum number of concurrently running invocations (0 is treated as 1)
/// * `f` - Produces the future for one item
///
/// # Returns
/// * `Ok(Vec<R>)` with one result per item, in input order
/// * `Err(E)` with the first error observed. No new items are started after
///   it; invocations that are already running are left to finish on the
///   runtime and their results are dropped.
///
/// # Panics
/// Re-raises the panic of any invocation that panicked.
pub async fn map_bounded<T, R, E, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Result<Vec<R>, E>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let limit = limit.max(1);
    let mut slots: Vec<Option<R>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);

    let mut pending = items.into_iter().enumerate();
    let mut running = JoinSet::new();

    for (index, item) in pending.by_ref().take(limit) {
        let work = f(item);
        running.spawn(async move { (index, work.await) });
    }

    while let Some(joined) = running.join_next().await {
        let (index, outcome) = task_output(joined);

        match outcome {
            Ok(value) => {
                trace!("Item {} of {} completed", index, total);
                slots[index] = Some(value);

                if let Some((next_index, item)) = pending.next() {
                    let work = f(item);
                    running.spawn(async move { (next_index, work.await) });
                }
            }
            Err(err) => {
                trace!("Item {} of {} failed, abandoning remaining work", index, total);
                running.detach_all();
                return Err(err);
            }
        }
    }

    let results: Vec<R> = slots.into_iter().flatten().collect();
    debug_assert_eq!(results.len(), total);
    Ok(results)
}

/// Unwrap a joined task, re-raising its panic on the caller
///
/// A task cancelled by runtime shutdown is raised as a panic too.
fn task_output<T>(joined: Result<T, JoinError>) -> T {
    match joined {
        Ok(done) => done,
        Err(err) => match err.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            Err(err) => std::panic::resume_unwind(Box::new(format!(
                "bounded map task cancelled: {}",
                err
            ))),
        },
    }
}
