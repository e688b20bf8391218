use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// リトライ戦略（固定間隔）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategy {
    /// 最大試行回数（初回を含む）
    pub max_attempts: u32,
    /// 試行間の待機時間
    pub interval: Duration,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(5),
        }
    }
}

/// リトライ実行結果
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// 成功
    Success(T),
    /// 最大試行回数に達して失敗。最後のエラーを保持する
    MaxAttemptsReached { attempts: u32, error: E },
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::MaxAttemptsReached { error, .. } => Err(error),
        }
    }
}

/// リトライ実行器
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    strategy: RetryStrategy,
}

impl RetryExecutor {
    pub fn new(strategy: RetryStrategy) -> Self {
        Self { strategy }
    }

    /// 固定間隔設定でリトライ実行器を作成
    pub fn fixed_interval(max_attempts: u32, interval: Duration) -> Self {
        Self::new(RetryStrategy {
            max_attempts,
            interval,
        })
    }

    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// 操作をリトライ付きで実行
    ///
    /// `operation` には 1 始まりの試行番号が渡される。`max_attempts` が 0 の場合も 1 回は実行する。
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.strategy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            info!(attempt, max_attempts, "Executing operation");

            match operation(attempt).await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retries");
                    }
                    return RetryResult::Success(result);
                }
                Err(err) => {
                    if attempt >= max_attempts {
                        error!(attempts = attempt, error = %err, "Max attempts reached, giving up");
                        return RetryResult::MaxAttemptsReached {
                            attempts: attempt,
                            error: err,
                        };
                    }

                    warn!(
                        attempt,
                        max_attempts,
                        delay_secs = self.strategy.interval.as_secs_f64(),
                        error = %err,
                        "Operation failed, retrying"
                    );

                    sleep(self.strategy.interval).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let executor = RetryExecutor::fixed_interval(3, Duration::from_millis(1));
        let result = executor.execute(|_| async { Ok::<i32, String>(42) }).await;

        match result {
            RetryResult::Success(value) => assert_eq!(value, 42),
            _ => panic!("Expected success"),
        }
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = attempt_count.clone();

        let executor = RetryExecutor::fixed_interval(5, Duration::from_millis(1));
        let result = executor
            .execute(|attempt| {
                let count = attempt_count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err("store not ready".to_string())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        match result {
            RetryResult::Success(value) => {
                assert_eq!(value, 3);
                assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
            }
            _ => panic!("Expected success after retries"),
        }
    }

    #[tokio::test]
    async fn test_max_attempts_reached_keeps_last_error() {
        let executor = RetryExecutor::fixed_interval(2, Duration::from_millis(1));

        let result = executor
            .execute(|attempt| async move { Err::<(), String>(format!("failure #{attempt}")) })
            .await;

        match result {
            RetryResult::MaxAttemptsReached { attempts, error } => {
                assert_eq!(attempts, 2);
                assert_eq!(error, "failure #2");
            }
            _ => panic!("Expected max attempts reached"),
        }
    }

    #[tokio::test]
    async fn test_zero_max_attempts_still_runs_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let executor = RetryExecutor::fixed_interval(0, Duration::from_millis(1));

        let result = executor
            .execute(|_| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), &str>("down")
                }
            })
            .await;

        assert!(matches!(result, RetryResult::MaxAttemptsReached { attempts: 1, .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_between_attempts() {
        let executor = RetryExecutor::fixed_interval(3, Duration::from_secs(5));
        let started = Instant::now();

        let result = executor
            .execute(|_| async { Err::<(), &str>("connection refused") })
            .await;

        assert!(matches!(result, RetryResult::MaxAttemptsReached { attempts: 3, .. }));
        // 3 回の試行の間に 2 回だけ待機する
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(15));
    }

    #[test]
    fn test_into_result() {
        let ok: RetryResult<i32, &str> = RetryResult::Success(1);
        assert_eq!(ok.into_result(), Ok(1));

        let failed: RetryResult<i32, &str> = RetryResult::MaxAttemptsReached {
            attempts: 5,
            error: "down",
        };
        assert_eq!(failed.into_result(), Err("down"));
    }
}
