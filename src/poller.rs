//! Fixed-interval polling of a remote entity until it reaches a terminal
//! state. Sleeping goes through a trait so tests can observe or skip the
//! waits entirely.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FleetError;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct Poller<'a> {
    sleeper: &'a dyn Sleeper,
    interval: Duration,
    timeout: Option<Duration>,
}

impl<'a> Poller<'a> {
    pub fn new(sleeper: &'a dyn Sleeper, interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            sleeper,
            interval,
            timeout,
        }
    }

    /// Fetch the entity's current state; while it is not terminal, sleep one
    /// interval and refetch. Returns the first terminal state observed.
    ///
    /// Without a timeout this waits forever, remote jobs may legitimately run
    /// for hours. A fetch error aborts immediately: retry of transient
    /// conditions belongs to the transport underneath, not to this loop.
    pub async fn wait_until<T, F, Fut, P>(
        &self,
        label: &str,
        mut fetch: F,
        is_terminal: P,
    ) -> Result<T, FleetError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FleetError>>,
        P: Fn(&T) -> bool,
    {
        let mut waited = Duration::ZERO;
        loop {
            let state = fetch().await?;
            if is_terminal(&state) {
                return Ok(state);
            }
            if let Some(limit) = self.timeout {
                if waited >= limit {
                    return Err(FleetError::PollTimeout {
                        operation: label.to_string(),
                        waited_secs: waited.as_secs(),
                    });
                }
            }
            debug!(
                operation = label,
                interval_secs = self.interval.as_secs(),
                "not terminal yet, polling again"
            );
            self.sleeper.sleep(self.interval).await;
            waited += self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::GitHubError;
    use std::sync::Mutex;

    /// Records requested sleeps instead of waiting.
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn new() -> Self {
            Self {
                slept: Mutex::new(Vec::new()),
            }
        }

        fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn scripted(states: Vec<Result<u32, FleetError>>) -> Mutex<Vec<Result<u32, FleetError>>> {
        Mutex::new(states)
    }

    #[tokio::test]
    async fn returns_first_terminal_state() {
        let sleeper = RecordingSleeper::new();
        let poller = Poller::new(&sleeper, Duration::from_secs(10), None);
        let states = scripted(vec![Ok(1), Ok(2), Ok(3)]);

        let result = poller
            .wait_until(
                "test entity",
                || async { states.lock().unwrap().remove(0) },
                |state| *state == 3,
            )
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(
            sleeper.sleeps(),
            vec![Duration::from_secs(10), Duration::from_secs(10)]
        );
    }

    #[tokio::test]
    async fn terminal_on_first_fetch_never_sleeps() {
        let sleeper = RecordingSleeper::new();
        let poller = Poller::new(&sleeper, Duration::from_secs(60), None);
        let states = scripted(vec![Ok(3)]);

        poller
            .wait_until(
                "test entity",
                || async { states.lock().unwrap().remove(0) },
                |state| *state == 3,
            )
            .await
            .unwrap();

        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn fetch_error_aborts_immediately() {
        let sleeper = RecordingSleeper::new();
        let poller = Poller::new(&sleeper, Duration::from_secs(10), None);
        let states = scripted(vec![
            Ok(1),
            Err(FleetError::RunFetchFailed {
                org: "org-a".to_string(),
                run_id: 1,
                source: GitHubError::UnexpectedStatus {
                    status: 500,
                    context: "run fetch".to_string(),
                },
            }),
            Ok(3),
        ]);

        let err = poller
            .wait_until(
                "test entity",
                || async { states.lock().unwrap().remove(0) },
                |state| *state == 3,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FleetError::RunFetchFailed { .. }));
        assert_eq!(sleeper.sleeps().len(), 1);
        assert_eq!(states.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn optional_timeout_gives_up() {
        let sleeper = RecordingSleeper::new();
        let poller = Poller::new(
            &sleeper,
            Duration::from_secs(10),
            Some(Duration::from_secs(25)),
        );

        let err = poller
            .wait_until("stuck entity", || async { Ok(0u32) }, |state| *state == 3)
            .await
            .unwrap_err();

        match err {
            FleetError::PollTimeout {
                operation,
                waited_secs,
            } => {
                assert_eq!(operation, "stuck entity");
                assert_eq!(waited_secs, 30);
            }
            other => panic!("expected PollTimeout, got {other:?}"),
        }
        // 30s of accumulated waiting crosses the 25s limit on the fourth fetch.
        assert_eq!(sleeper.sleeps().len(), 3);
    }
}
