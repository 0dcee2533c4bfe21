//! ActiveMQ probe over AMQP 1.0 (fe2o3-amqp).
//!
//! Two round-trips on `test_queue`: first with a receiver running on its own
//! task that signals the first message, then with the probe itself polling
//! the receiver until the deadline.

use std::sync::Arc;
use std::time::Duration;

use fe2o3_amqp::session::SessionHandle;
use fe2o3_amqp::types::messaging::{AmqpValue, Body};
use fe2o3_amqp::types::primitives::Value;
use fe2o3_amqp::{Connection, Receiver, Sender, Session};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::round_trip::{self, Listener, poll_until};
use super::{ProbeKind, ProbeReport, record_close, record_failure, within};
use crate::infrastructure::{ProbeError, ProbeTarget, ProbeTimeouts, normalize_activemq_url};

const TARGET: ProbeTarget = ProbeTarget::ActiveMq;
const QUEUE: &str = "test_queue";
const CONTAINER_ID: &str = "conncheck";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(super) async fn run(url: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let mut report = ProbeReport::begin(ProbeKind::ActiveMq);
    if let Err(error) = exercise(url, timeouts, &mut report).await {
        record_failure(&mut report, &error);
    }
    report.line("ActiveMQ test finished");
    report
}

async fn exercise(
    url: &str,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let url = normalize_activemq_url(url)?;
    let mut connection = within(TARGET, timeouts.connect, async {
        Connection::open(CONTAINER_ID, url.as_str())
            .await
            .map_err(|error| ProbeError::connection(TARGET, error.to_string()))
    })
    .await?;
    report.section("ActiveMQ");
    report.line(format!("Connected to {}", redact(&url)));

    let result = match Session::begin(&mut connection).await {
        Ok(mut session) => {
            let result = round_trips(&mut session, timeouts, report).await;
            let _ = session.end().await;
            result
        }
        Err(error) => Err(operation(error)),
    };
    record_close(report, connection.close().await);
    result
}

async fn round_trips(
    session: &mut SessionHandle<()>,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let mut sender = Sender::attach(session, "conncheck-sender", QUEUE)
        .await
        .map_err(operation)?;
    report.line(format!("Sender attached to {QUEUE}"));

    let result = match listener_round_trip(session, &mut sender, timeouts, report).await {
        Ok(()) => polling_round_trip(session, &mut sender, timeouts, report).await,
        Err(error) => Err(error),
    };
    let _ = sender.close().await;
    result
}

/// A spawned receiver task signals the first message it gets.
async fn listener_round_trip(
    session: &mut SessionHandle<()>,
    sender: &mut Sender,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    report.section("Listener round-trip");
    let mut receiver = Receiver::attach(session, "conncheck-listener", QUEUE)
        .await
        .map_err(operation)?;

    let listener = Listener::spawn(async move {
        let delivery = receiver.recv::<Body<Value>>().await.ok()?;
        let _ = receiver.accept(&delivery).await;
        let _ = receiver.close().await;
        Some(body_text(delivery.body()))
    });

    let message = publish(sender, report).await?;
    let outcome = listener.wait(timeouts.message_wait).await;
    round_trip::record(report, "Listener round-trip", &message, outcome);
    Ok(())
}

/// Receive attempts every 100 ms until the message arrives or the wait ends.
async fn polling_round_trip(
    session: &mut SessionHandle<()>,
    sender: &mut Sender,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    report.section("Polling round-trip");
    let receiver = Receiver::attach(session, "conncheck-poller", QUEUE)
        .await
        .map_err(operation)?;
    let receiver = Arc::new(Mutex::new(receiver));

    let message = publish(sender, report).await?;
    let outcome = poll_until(timeouts.message_wait, POLL_INTERVAL, || {
        let receiver = Arc::clone(&receiver);
        async move { receive_once(&mut *receiver.lock().await).await }
    })
    .await;
    if let Ok(receiver) = Arc::try_unwrap(receiver) {
        let _ = receiver.into_inner().close().await;
    }

    round_trip::record(report, "Polling round-trip", &message, outcome?);
    Ok(())
}

async fn receive_once(receiver: &mut Receiver) -> Result<Option<String>, ProbeError> {
    match tokio::time::timeout(POLL_INTERVAL, receiver.recv::<Body<Value>>()).await {
        Ok(Ok(delivery)) => {
            receiver.accept(&delivery).await.map_err(operation)?;
            Ok(Some(body_text(delivery.body())))
        }
        Ok(Err(error)) => Err(operation(error)),
        Err(_) => Ok(None),
    }
}

async fn publish(sender: &mut Sender, report: &mut ProbeReport) -> Result<String, ProbeError> {
    let message = format!("Test message {}", Uuid::new_v4());
    sender
        .send(message.as_str())
        .await
        .map_err(operation)?
        .accepted_or_else(|outcome| {
            ProbeError::operation(TARGET, format!("message not accepted: {outcome:?}"))
        })?;
    report.line(format!("Sent: {message}"));
    Ok(message)
}

fn body_text(body: &Body<Value>) -> String {
    match body {
        Body::Value(AmqpValue(Value::String(text))) => text.clone(),
        other => format!("{other:?}"),
    }
}

/// Hides credentials in the logged broker URL.
fn redact(url: &url::Url) -> String {
    let mut shown = url.clone();
    if shown.password().is_some() {
        let _ = shown.set_password(Some("***"));
    }
    shown.to_string()
}

fn operation(error: impl std::fmt::Display) -> ProbeError {
    ProbeError::operation(TARGET, error.to_string())
}
