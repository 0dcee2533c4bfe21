//! Redis probes: the same data-structure walk over a multiplexed async
//! connection and over a blocking connection on a blocking thread.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{
    AsyncCommands, AsyncConnectionConfig, Client, Commands, Connection, RedisError, RedisResult,
};

use super::{ProbeKind, ProbeReport, record_failure, within};
use crate::infrastructure::{
    ProbeError, ProbeTarget, ProbeTimeouts, parse_redis_connection_string,
};

const TARGET: ProbeTarget = ProbeTarget::Redis;

const STRING_KEY: &str = "test:string";
const STRING_VALUE: &str = "Hello Redis";
const STRING_TTL_SECS: u64 = 60;
const HASH_KEY: &str = "test:hash";
const HASH_FIELDS: [(&str, &str); 2] = [("field1", "value1"), ("field2", "value2")];
const LIST_KEY: &str = "test:list";
const LIST_ITEMS: [&str; 3] = ["item1", "item2", "item3"];
const SET_KEY: &str = "test:set";
const SET_MEMBERS: [&str; 3] = ["member1", "member2", "member3"];
const SORTED_SET_KEY: &str = "test:sortedset";
const SORTED_SET_MEMBERS: [(f64, &str); 3] = [(1.0, "one"), (2.0, "two"), (3.0, "three")];
const EXPIRE_KEY: &str = "test:expire";

// =============================================================================
// Async connection
// =============================================================================

pub(super) async fn run_async(connection_string: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let mut report = ProbeReport::begin(ProbeKind::RedisAsync);
    if let Err(error) = exercise_async(connection_string, timeouts, &mut report).await {
        record_failure(&mut report, &error);
    }
    report
}

async fn exercise_async(
    connection_string: &str,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let limit = timeouts.connect;
    let client = open_client(connection_string)?;
    let config = AsyncConnectionConfig::new()
        .set_connection_timeout(limit)
        .set_response_timeout(limit);
    let mut connection = within(TARGET, limit, async {
        client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(|error| ProbeError::from_redis(&error, limit))
    })
    .await?;

    report.section("Redis (async)");
    walk_async(&mut connection, &client, timeouts.key_expiry, report)
        .await
        .map_err(|error| ProbeError::from_redis(&error, limit))
}

async fn walk_async(
    connection: &mut MultiplexedConnection,
    client: &Client,
    ttl: Duration,
    report: &mut ProbeReport,
) -> RedisResult<()> {
    let info: String = redis::cmd("INFO")
        .arg("server")
        .query_async(connection)
        .await?;
    record_server(report, client, &info);

    report.section("String");
    connection
        .set_ex::<_, _, ()>(STRING_KEY, STRING_VALUE, STRING_TTL_SECS)
        .await?;
    let value: Option<String> = connection.get(STRING_KEY).await?;
    record_string(report, value.as_deref());
    connection.del::<_, ()>(STRING_KEY).await?;

    report.section("Hash");
    connection
        .hset_multiple::<_, _, _, ()>(HASH_KEY, &HASH_FIELDS)
        .await?;
    let hash: HashMap<String, String> = connection.hgetall(HASH_KEY).await?;
    record_hash(report, &hash);
    connection.del::<_, ()>(HASH_KEY).await?;

    report.section("List");
    connection.rpush::<_, _, ()>(LIST_KEY, &LIST_ITEMS[..]).await?;
    let list: Vec<String> = connection.lrange(LIST_KEY, 0, -1).await?;
    record_list(report, &list);
    connection.del::<_, ()>(LIST_KEY).await?;

    report.section("Set");
    connection.sadd::<_, _, ()>(SET_KEY, &SET_MEMBERS[..]).await?;
    let members: HashSet<String> = connection.smembers(SET_KEY).await?;
    record_set(report, &members);
    connection.del::<_, ()>(SET_KEY).await?;

    report.section("Sorted set");
    connection
        .zadd_multiple::<_, _, _, ()>(SORTED_SET_KEY, &SORTED_SET_MEMBERS)
        .await?;
    let ranked: Vec<(String, f64)> = connection.zrange_withscores(SORTED_SET_KEY, 0, -1).await?;
    record_sorted_set(report, &ranked);
    connection.del::<_, ()>(SORTED_SET_KEY).await?;

    report.section("Key expiry");
    connection
        .set_ex::<_, _, ()>(EXPIRE_KEY, "temporary", ttl.as_secs())
        .await?;
    let exists: bool = connection.exists(EXPIRE_KEY).await?;
    report.check("Key exists before expiry", exists);
    tokio::time::sleep(expiry_wait(ttl)).await;
    let exists: bool = connection.exists(EXPIRE_KEY).await?;
    report.check(format!("Key expired after {} s", ttl.as_secs()), !exists);

    Ok(())
}

// =============================================================================
// Blocking connection
// =============================================================================

pub(super) async fn run_blocking(connection_string: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let connection_string = connection_string.to_string();
    let task = tokio::task::spawn_blocking(move || {
        let mut report = ProbeReport::begin(ProbeKind::RedisBlocking);
        if let Err(error) = exercise_blocking(&connection_string, timeouts, &mut report) {
            record_failure(&mut report, &error);
        }
        report
    });

    match task.await {
        Ok(report) => report,
        Err(error) => {
            let mut report = ProbeReport::begin(ProbeKind::RedisBlocking);
            record_failure(&mut report, &ProbeError::from(error));
            report
        }
    }
}

fn exercise_blocking(
    connection_string: &str,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let limit = timeouts.connect;
    let client = open_client(connection_string)?;
    let redis_error = |error: RedisError| ProbeError::from_redis(&error, limit);
    let mut connection = client
        .get_connection_with_timeout(limit)
        .map_err(redis_error)?;
    connection
        .set_read_timeout(Some(limit))
        .map_err(redis_error)?;
    connection
        .set_write_timeout(Some(limit))
        .map_err(redis_error)?;

    report.section("Redis (blocking)");
    walk_blocking(&mut connection, &client, timeouts.key_expiry, report).map_err(redis_error)
}

fn walk_blocking(
    connection: &mut Connection,
    client: &Client,
    ttl: Duration,
    report: &mut ProbeReport,
) -> RedisResult<()> {
    let info: String = redis::cmd("INFO").arg("server").query(connection)?;
    record_server(report, client, &info);

    report.section("String");
    connection.set_ex::<_, _, ()>(STRING_KEY, STRING_VALUE, STRING_TTL_SECS)?;
    let value: Option<String> = connection.get(STRING_KEY)?;
    record_string(report, value.as_deref());
    connection.del::<_, ()>(STRING_KEY)?;

    report.section("Hash");
    connection.hset_multiple::<_, _, _, ()>(HASH_KEY, &HASH_FIELDS)?;
    let hash: HashMap<String, String> = connection.hgetall(HASH_KEY)?;
    record_hash(report, &hash);
    connection.del::<_, ()>(HASH_KEY)?;

    report.section("List");
    connection.rpush::<_, _, ()>(LIST_KEY, &LIST_ITEMS[..])?;
    let list: Vec<String> = connection.lrange(LIST_KEY, 0, -1)?;
    record_list(report, &list);
    connection.del::<_, ()>(LIST_KEY)?;

    report.section("Set");
    connection.sadd::<_, _, ()>(SET_KEY, &SET_MEMBERS[..])?;
    let members: HashSet<String> = connection.smembers(SET_KEY)?;
    record_set(report, &members);
    connection.del::<_, ()>(SET_KEY)?;

    report.section("Sorted set");
    connection.zadd_multiple::<_, _, _, ()>(SORTED_SET_KEY, &SORTED_SET_MEMBERS)?;
    let ranked: Vec<(String, f64)> = connection.zrange_withscores(SORTED_SET_KEY, 0, -1)?;
    record_sorted_set(report, &ranked);
    connection.del::<_, ()>(SORTED_SET_KEY)?;

    report.section("Key expiry");
    connection.set_ex::<_, _, ()>(EXPIRE_KEY, "temporary", ttl.as_secs())?;
    let exists: bool = connection.exists(EXPIRE_KEY)?;
    report.check("Key exists before expiry", exists);
    std::thread::sleep(expiry_wait(ttl));
    let exists: bool = connection.exists(EXPIRE_KEY)?;
    report.check(format!("Key expired after {} s", ttl.as_secs()), !exists);

    Ok(())
}

// =============================================================================
// Shared steps
// =============================================================================

fn open_client(connection_string: &str) -> Result<Client, ProbeError> {
    let url = parse_redis_connection_string(connection_string)?;
    Client::open(url.as_str())
        .map_err(|error| ProbeError::invalid_connection_string(TARGET, error.to_string()))
}

/// One second of slack past the TTL.
fn expiry_wait(ttl: Duration) -> Duration {
    ttl.saturating_add(Duration::from_secs(1))
}

/// Extracts `field` from the `key:value` lines of an `INFO` reply.
fn parse_info_field<'a>(info: &'a str, field: &str) -> Option<&'a str> {
    info.lines()
        .filter_map(|line| line.trim_end().split_once(':'))
        .find(|(key, _)| *key == field)
        .map(|(_, value)| value)
}

fn record_server(report: &mut ProbeReport, client: &Client, info: &str) {
    let version = parse_info_field(info, "redis_version").unwrap_or("unknown");
    report.line(format!("Server version: {version}"));
    report.line(format!(
        "Connection state: connected to {}",
        client.get_connection_info().addr
    ));
}

fn record_string(report: &mut ProbeReport, value: Option<&str>) {
    report.line(format!("GET {STRING_KEY}: {}", value.unwrap_or("(nil)")));
    report.check("String round-trip", value == Some(STRING_VALUE));
}

fn record_hash(report: &mut ProbeReport, hash: &HashMap<String, String>) {
    let mut fields: Vec<String> = hash.iter().map(|(key, value)| format!("{key}={value}")).collect();
    fields.sort();
    report.line(format!("HGETALL {HASH_KEY}: {}", fields.join(", ")));
    let complete = hash.len() == HASH_FIELDS.len()
        && HASH_FIELDS
            .iter()
            .all(|(key, value)| hash.get(*key).map(String::as_str) == Some(*value));
    report.check("Hash round-trip", complete);
}

fn record_list(report: &mut ProbeReport, list: &[String]) {
    report.line(format!("LRANGE {LIST_KEY}: {}", list.join(", ")));
    report.check("List round-trip", list == LIST_ITEMS);
}

fn record_set(report: &mut ProbeReport, members: &HashSet<String>) {
    let mut sorted: Vec<&str> = members.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    report.line(format!("SMEMBERS {SET_KEY}: {}", sorted.join(", ")));
    report.check("Set round-trip", sorted == SET_MEMBERS);
}

#[allow(clippy::float_cmp)]
fn record_sorted_set(report: &mut ProbeReport, ranked: &[(String, f64)]) {
    let rendered: Vec<String> = ranked
        .iter()
        .map(|(member, score)| format!("{member}({score})"))
        .collect();
    report.line(format!("ZRANGE {SORTED_SET_KEY}: {}", rendered.join(", ")));
    let ordered = ranked.len() == SORTED_SET_MEMBERS.len()
        && ranked
            .iter()
            .zip(SORTED_SET_MEMBERS)
            .all(|((member, score), (expected_score, expected_member))| {
                member == expected_member && *score == expected_score
            });
    report.check("Sorted set round-trip", ordered);
}
