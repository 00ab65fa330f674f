//! Bounded-concurrency batch execution.
//!
//! Runs N independent unary operations (transcribe one file, synthesize
//! one utterance, issue one chat call) behind a counting admission gate,
//! returning results in original input order regardless of completion
//! order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::ClientError;

/// Run `op` over every item with at most `concurrency` operations in
/// flight.
///
/// The admission gate is a [`tokio::sync::Semaphore`], whose waiter queue
/// is FIFO: the oldest waiter acquires the next released slot. Results are
/// returned in input order. The first failing item fails the whole batch
/// and abandons in-flight siblings' results; callers who want per-item
/// errors wrap `op` to capture them as values.
///
/// `concurrency == 0` is treated as 1. An empty input returns an empty vec
/// without touching the gate.
pub async fn run_batch<T, R, Op, Fut>(
    items: Vec<T>,
    concurrency: usize,
    op: Op,
) -> Result<Vec<R>, ClientError>
where
    Op: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, ClientError>>,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let gate = Arc::new(Semaphore::new(concurrency.max(1)));
    let futures = items.into_iter().map(|item| {
        let gate = Arc::clone(&gate);
        let fut = &op;
        async move {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| ClientError::StreamError(format!("admission gate closed: {e}")))?;
            fut(item).await
        }
    });

    futures::future::try_join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_input_order_with_out_of_order_completion() {
        // Later items finish first; results still come back in input order.
        let results = run_batch(vec![30u64, 20, 10], 3, |delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(delay * 2)
        })
        .await
        .expect("batch");
        assert_eq!(results, vec![60, 40, 20]);
    }

    #[tokio::test]
    async fn serial_execution_with_concurrency_one() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = Arc::clone(&order);
        let results = run_batch(vec!["a", "b", "c"], 1, move |item| {
            let order = Arc::clone(&recorded);
            async move {
                order.lock().unwrap().push(item);
                Ok(item.to_uppercase())
            }
        })
        .await
        .expect("batch");
        assert_eq!(results, vec!["A", "B", "C"]);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn never_exceeds_the_concurrency_ceiling() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let in_flight_op = Arc::clone(&in_flight);
        let peak_op = Arc::clone(&peak);
        run_batch(vec![(); 5], 2, move |()| {
            let in_flight = Arc::clone(&in_flight_op);
            let peak = Arc::clone(&peak_op);
            async move {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .expect("batch");

        assert!(peak.load(Ordering::SeqCst) <= 2, "more than 2 ops in flight");
    }

    #[tokio::test]
    async fn first_error_fails_the_batch() {
        let err = run_batch(vec![1, 2, 3], 2, |n| async move {
            if n == 2 {
                Err(ClientError::InvalidInput("bad item".into()))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn degenerate_inputs_do_not_deadlock() {
        let empty: Vec<u32> = Vec::new();
        let results = run_batch(empty, 4, |n| async move { Ok(n) }).await.expect("empty");
        assert!(results.is_empty());

        // Zero concurrency clamps to one instead of deadlocking.
        let results = run_batch(vec![1, 2], 0, |n| async move { Ok(n + 1) })
            .await
            .expect("clamped");
        assert_eq!(results, vec![2, 3]);
    }
}
