/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Redis key/value sink (spec.md §4.7 "Redis KV"). The core consumes an
//! already-constructed connection (spec.md §1 "Out of scope: concrete
//! broker client libraries ... the core consumes an already-constructed
//! producer/connection"), modeled here as a narrow trait the host
//! implements over whichever Redis client crate it already uses.

use super::{impl_handler_core, HandlerCore, HandlerKind};
use crate::level::Level;
use crate::record::Record;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The subset of a Redis connection this handler needs: `SETEX key ttl
/// value` (spec.md §4.7 "Redis KV").
pub trait RedisKvConnection: Send + Sync {
    fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> std::result::Result<(), String>;
}

pub struct RedisKvHandler {
    core: HandlerCore,
    conn: Arc<dyn RedisKvConnection>,
    ttl_secs: u64,
    /// Once a log attempt fails, subsequent attempts drop silently without
    /// retrying the connection (spec.md §4.7 "silently failed" state).
    failed: AtomicBool,
}

impl RedisKvHandler {
    pub fn new(conn: Arc<dyn RedisKvConnection>, ttl_secs: u64, min_level: Level) -> Self {
        Self { core: HandlerCore::new(min_level), conn, ttl_secs, failed: AtomicBool::new(false) }
    }

    fn encode(record: &Record) -> String {
        serde_json::to_string(&record.to_json()).unwrap_or_else(|_| format!("{:?}", record))
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.core.responsible(record.level) {
            return None;
        }
        if self.failed.load(Ordering::Relaxed) {
            return None;
        }

        let payload = self.core.format(record);
        let encoded = Self::encode(record);
        let key = format!("Redis{}", rand::thread_rng().gen::<u64>());

        match self.conn.setex(&key, self.ttl_secs, &encoded) {
            Ok(()) => Some(payload),
            Err(e) => {
                eprintln!("(RedisKv) Failed to SETEX log entry: {}; disabling sink", e);
                self.failed.store(true, Ordering::Relaxed);
                None
            }
        }
    }
}

impl_handler_core!(RedisKvHandler, HandlerKind::RedisKv);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::sync::Mutex;

    struct FakeConn {
        calls: Mutex<Vec<(String, u64, String)>>,
        fail: bool,
    }

    impl RedisKvConnection for FakeConn {
        fn setex(&self, key: &str, ttl: u64, value: &str) -> std::result::Result<(), String> {
            if self.fail {
                return Err("down".to_owned());
            }
            self.calls.lock().unwrap().push((key.to_owned(), ttl, value.to_owned()));
            Ok(())
        }
    }

    #[test]
    fn disables_itself_after_first_failure() {
        let conn = Arc::new(FakeConn { calls: Mutex::new(Vec::new()), fail: true });
        let handler = RedisKvHandler::new(conn.clone(), 60, Level::Debug);
        let rec = Record {
            context: String::new(),
            level: Level::Info,
            message: "hi".into(),
            root: Map::new(),
            data: Map::new(),
        };
        assert!(handler.invoke_impl(&rec).is_none());
        assert!(handler.failed.load(Ordering::Relaxed));
        assert!(handler.invoke_impl(&rec).is_none());
    }
}
