//! Caller-supplied deadlines for core operations.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};

/// Point in time after which an operation fails with [`Error::Timeout`].
///
/// Reads run under the deadline; writes check it once before the commit
/// point and then run to completion, so an expired deadline never leaves a
/// partial change behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline.
    pub const fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    pub const fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub const fn instant(&self) -> Option<Instant> {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Fail with `Timeout` if the deadline has passed.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_expired() {
            return Err(Error::Timeout(operation.to_string()));
        }
        Ok(())
    }

    /// Run `future`, failing with `Timeout` if it does not finish in time.
    pub async fn run<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(operation)?;
        match self.0 {
            None => future.await,
            Some(at) => tokio::time::timeout_at(at, future)
                .await
                .map_err(|_| Error::Timeout(operation.to_string()))?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_never_expires() {
        assert!(!Deadline::none().is_expired());
        assert!(Deadline::none().check("noop").is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn expired_deadline_skips_the_future() {
        let deadline = Deadline::after(Duration::ZERO);
        let result = deadline.run("load", async { Ok(1) }).await;
        assert!(matches!(result, Err(Error::Timeout(op)) if op == "load"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_future_times_out() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let result = deadline
            .run("fetch", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fast_future_completes() {
        let deadline = Deadline::after(Duration::from_secs(5));
        assert_eq!(deadline.run("read", async { Ok(7) }).await.unwrap(), 7);
    }
}
