use std::future::Future;

use cross_region_refs_core::limiter::{ConcurrencyLimiter, LimiterError};
use futures::future::join_all;

/// Runs `operation` for every item through `limiter` and waits for all of
/// them. In-flight operations are never cancelled; when any fail, the first
/// failure in submission order is returned and the other outputs are dropped.
pub async fn run_bounded<I, T, O, E, F, Fut>(
    limiter: &ConcurrencyLimiter,
    items: I,
    operation: F,
) -> Result<Vec<O>, E>
where
    I: IntoIterator<Item = T>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<O, E>>,
    E: From<LimiterError>,
{
    let operation = &operation;
    let submitted: Vec<_> = items
        .into_iter()
        .map(|item| limiter.run(move || operation(item)))
        .collect();

    join_all(submitted)
        .await
        .into_iter()
        .map(|outcome| outcome?)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Failed(usize),
        Limiter(LimiterError),
    }

    impl From<LimiterError> for TestError {
        fn from(error: LimiterError) -> Self {
            Self::Limiter(error)
        }
    }

    #[tokio::test]
    async fn collects_outputs_in_submission_order() {
        let limiter = ConcurrencyLimiter::new(2).expect("limiter should build");

        let outputs = run_bounded(&limiter, 0..5usize, |index| async move {
            for _ in 0..(5 - index) {
                tokio::task::yield_now().await;
            }
            Ok::<_, TestError>(index * 10)
        })
        .await
        .expect("fan-out should succeed");

        assert_eq!(outputs, vec![0, 10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn reports_first_failure_after_everything_settles() {
        let limiter = ConcurrencyLimiter::new(2).expect("limiter should build");
        let finished = AtomicUsize::new(0);

        let error = run_bounded(&limiter, 0..6usize, |index| {
            let finished = &finished;
            async move {
                tokio::task::yield_now().await;
                finished.fetch_add(1, Ordering::SeqCst);
                if index == 2 || index == 4 {
                    Err(TestError::Failed(index))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .expect_err("fan-out should fail");

        assert_eq!(error, TestError::Failed(2));
        assert_eq!(finished.load(Ordering::SeqCst), 6);
        assert_eq!(limiter.active_count(), 0);
    }
}
