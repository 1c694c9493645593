//! Bounded concurrent fan-out.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Drive `futures` with at most `limit` in flight and return their outputs
/// in input order. A `limit` of zero is treated as one.
pub async fn run_bounded<I, F, T>(limit: usize, futures: I) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T>,
{
    let futures: Vec<F> = futures.into_iter().collect();
    let mut indexed: Vec<(usize, T)> = stream::iter(
        futures
            .into_iter()
            .enumerate()
            .map(|(i, fut)| async move { (i, fut.await) }),
    )
    .buffer_unordered(limit.max(1))
    .collect()
    .await;
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, out)| out).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn keeps_input_order() {
        let out = run_bounded(
            3,
            (0..8u64).map(|i| async move {
                tokio::time::sleep(Duration::from_millis(8 - i)).await;
                i
            }),
        )
        .await;
        assert_eq!(out, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        run_bounded(
            2,
            (0..10).map(|_| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            }),
        )
        .await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn zero_limit_still_runs() {
        let futs: Vec<std::pin::Pin<Box<dyn Future<Output = i32>>>> =
            vec![Box::pin(async { 1 }), Box::pin(async { 2 })];
        let out = run_bounded(0, futs).await;
        assert_eq!(out, vec![1, 2]);
    }
}
