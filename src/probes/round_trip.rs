//! Message round-trips: publish, then wait for the consumer to deliver.
//!
//! A [`Listener`] runs a consumer on its own task and signals the first
//! delivery over a oneshot channel; the probe waits on that signal with a
//! fixed timeout. [`poll_until`] covers brokers read by repeated receive
//! attempts instead of a push consumer.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::ProbeReport;

/// How a round-trip ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTrip<T> {
    Received(T),
    /// Nothing arrived before the deadline.
    TimedOut(Duration),
    /// The consumer finished without delivering anything.
    Abandoned,
}

/// A consumer running on a spawned task.
#[derive(Debug)]
pub struct Listener<T> {
    receiver: oneshot::Receiver<T>,
    handle: JoinHandle<()>,
}

impl<T: Send + 'static> Listener<T> {
    /// Spawns `consume`; its `Some` result is delivered to [`Listener::wait`].
    pub fn spawn<F>(consume: F) -> Self
    where
        F: Future<Output = Option<T>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let handle = tokio::spawn(async move {
            if let Some(message) = consume.await {
                // The waiter may already have given up.
                let _ = sender.send(message);
            }
        });
        Self { receiver, handle }
    }

    /// Waits for the first delivery. The consumer task is aborted on return.
    pub async fn wait(self, timeout: Duration) -> RoundTrip<T> {
        let Self { receiver, handle } = self;
        let outcome = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(message)) => RoundTrip::Received(message),
            Ok(Err(_)) => RoundTrip::Abandoned,
            Err(_) => RoundTrip::TimedOut(timeout),
        };
        handle.abort();
        outcome
    }
}

/// Calls `attempt` every `interval` until it yields a value or `timeout`
/// has elapsed.
///
/// # Errors
///
/// Returns the first error produced by `attempt`.
pub async fn poll_until<T, E, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut attempt: F,
) -> Result<RoundTrip<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    // A deadline past the clock's range never arrives.
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(message) = attempt().await? {
            return Ok(RoundTrip::Received(message));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(RoundTrip::TimedOut(timeout));
        }
        tokio::time::sleep(interval).await;
    }
}

/// Appends the round-trip result for `expected` to the report.
pub fn record(report: &mut ProbeReport, label: &str, expected: &str, outcome: RoundTrip<String>) {
    match outcome {
        RoundTrip::Received(message) => {
            report.line(format!("Received: {message}"));
            report.check(label, message == expected);
        }
        RoundTrip::TimedOut(after) => {
            report.line(format!("Receive timed out ({} s)", after.as_secs()));
            report.check(label, false);
        }
        RoundTrip::Abandoned => {
            report.line("Listener ended without a message");
            report.check(label, false);
        }
    }
}
