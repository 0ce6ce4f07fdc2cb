/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Concrete enrichers (spec.md C10): nullary `Producer` factories for the
//! handful of values every application ends up wanting on every record.
//! Anything that needs live request state (client IP, HTTP request shape)
//! is a factory taking a caller-captured snapshot rather than reaching into
//! a web framework itself; wiring loggers into host applications is out of
//! scope (spec.md §1 "Boot and dependency-injection wiring ... out of
//! scope").

use crate::record::Producer;
use serde_json::Value;
use std::sync::Arc;

/// Current time, RFC 3339, re-evaluated on every record (spec.md §9
/// "Callable extras ... evaluated per record").
pub fn timestamp_producer() -> Producer {
    Arc::new(|| Value::String(chrono::Utc::now().to_rfc3339()))
}

/// A fresh random v4 UUID per record.
pub fn uuid_producer() -> Producer {
    Arc::new(|| Value::String(uuid::Uuid::new_v4().to_string()))
}

/// The machine's hostname, resolved once per record (cheap enough not to
/// bother caching across records, and caching beyond one record is
/// disallowed per spec.md §9).
pub fn hostname_producer() -> Producer {
    Arc::new(|| Value::String(gethostname::gethostname().to_string_lossy().into_owned()))
}

/// Resident set size in bytes, best-effort. Reads `/proc/self/status`
/// directly rather than pulling in a system-info crate for one field;
/// returns `null` on platforms without a `/proc` (e.g. macOS, Windows) or if
/// the read fails.
pub fn memory_producer() -> Producer {
    Arc::new(|| match current_rss_bytes() {
        Some(bytes) => Value::Number(bytes.into()),
        None => Value::Null,
    })
}

#[cfg(target_os = "linux")]
fn current_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_bytes() -> Option<u64> {
    None
}

/// Wraps a caller-captured client IP as a constant per-producer value (the
/// caller re-registers this producer, or a fresh enricher, per request scope
/// (the core never inspects a live connection itself).
pub fn client_ip_producer(ip: impl Into<String>) -> Producer {
    let ip = ip.into();
    Arc::new(move || Value::String(ip.clone()))
}

/// Wraps a caller-captured HTTP request snapshot (method, path, headers,
/// whatever the host deems relevant) verbatim.
pub fn http_request_producer(snapshot: Value) -> Producer {
    Arc::new(move || snapshot.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_producer_yields_distinct_values() {
        let p = uuid_producer();
        assert_ne!(p(), p());
    }

    #[test]
    fn client_ip_producer_returns_the_wrapped_value() {
        let p = client_ip_producer("10.0.0.1");
        assert_eq!(p(), Value::String("10.0.0.1".to_owned()));
    }

    #[test]
    fn http_request_producer_returns_the_snapshot_verbatim() {
        let snapshot = serde_json::json!({"method": "GET", "path": "/health"});
        let p = http_request_producer(snapshot.clone());
        assert_eq!(p(), snapshot);
    }
}
