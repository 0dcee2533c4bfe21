//! Memcached probe. The `memcache` client is synchronous, so the whole probe
//! runs on a blocking thread.

use memcache::MemcacheError;
use uuid::Uuid;

use super::{ProbeKind, ProbeReport, record_failure};
use crate::infrastructure::{ProbeError, ProbeTarget, ProbeTimeouts, parse_memcached_endpoint};

const TARGET: ProbeTarget = ProbeTarget::Memcached;
const EXPIRATION_SECS: u32 = 60;
const COUNTER_START: u64 = 10;
const COUNTER_STEP: u64 = 5;

pub(super) async fn run(endpoint: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let endpoint = endpoint.to_string();
    let task = tokio::task::spawn_blocking(move || {
        let mut report = ProbeReport::begin(ProbeKind::Memcached);
        if let Err(error) = exercise(&endpoint, timeouts, &mut report) {
            record_failure(&mut report, &error);
        }
        report
    });

    match task.await {
        Ok(report) => report,
        Err(error) => {
            let mut report = ProbeReport::begin(ProbeKind::Memcached);
            record_failure(&mut report, &ProbeError::from(error));
            report
        }
    }
}

fn exercise(
    endpoint: &str,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let url = parse_memcached_endpoint(endpoint)?;
    let client = memcache::Client::connect(url.as_str())
        .map_err(|error| ProbeError::connection(TARGET, error.to_string()))?;
    client
        .set_read_timeout(Some(timeouts.connect))
        .map_err(operation)?;
    client
        .set_write_timeout(Some(timeouts.connect))
        .map_err(operation)?;

    report.section("Memcached");
    let versions = client.version().map_err(operation)?;
    for (server, version) in &versions {
        report.line(format!("Server {server}: version {version}"));
    }

    let key = format!("test:{}", Uuid::new_v4().simple());
    let value = format!("Test value {}", Uuid::new_v4());
    client
        .set(&key, value.as_str(), EXPIRATION_SECS)
        .map_err(operation)?;
    report.line(format!("Set {key} (expires in {EXPIRATION_SECS} s)"));

    let stored: Option<String> = client.get(&key).map_err(operation)?;
    report.line(format!("Get {key}: {}", stored.as_deref().unwrap_or("(miss)")));
    report.check("Get matches set", stored.as_deref() == Some(value.as_str()));

    let counter_key = format!("{key}:counter");
    client
        .set(&counter_key, COUNTER_START, EXPIRATION_SECS)
        .map_err(operation)?;
    let counter = client
        .increment(&counter_key, COUNTER_STEP)
        .map_err(operation)?;
    report.line(format!("Incremented {counter_key} to {counter}"));
    report.check("Increment", counter == COUNTER_START + COUNTER_STEP);

    let deleted = client.delete(&key).map_err(operation)?;
    client.delete(&counter_key).map_err(operation)?;
    report.line(format!("Deleted {key}: {deleted}"));

    let after_delete: Option<String> = client.get(&key).map_err(operation)?;
    report.check("Deleted key is gone", after_delete.is_none());

    Ok(())
}

fn operation(error: MemcacheError) -> ProbeError {
    ProbeError::operation(TARGET, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn empty_endpoint_is_invalid() {
        let report = run(" ", ProbeTimeouts::default()).await;

        assert_eq!(
            report.lines(),
            ["Memcached test failed: invalid Memcached connection string: endpoint is empty"]
        );
    }
}
