/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Redis pub/sub sink (spec.md §4.7 "Redis Pub/Sub"): `PUBLISH channel
//! payload`, swallowing delivery failures the same way the other broker
//! sinks do (spec.md §4.7 "best-effort fire-and-forget; failures are
//! swallowed and logged to the diagnostic stream, never raised").

use super::{impl_handler_core, HandlerCore, HandlerKind};
use crate::level::Level;
use crate::record::Record;
use std::sync::Arc;

/// The subset of a Redis connection this handler needs: `PUBLISH channel
/// message`.
pub trait RedisPubSubConnection: Send + Sync {
    fn publish(&self, channel: &str, message: &str) -> std::result::Result<(), String>;
}

pub struct RedisPubSubHandler {
    core: HandlerCore,
    conn: Arc<dyn RedisPubSubConnection>,
    channel: String,
}

impl RedisPubSubHandler {
    pub fn new(conn: Arc<dyn RedisPubSubConnection>, channel: impl Into<String>, min_level: Level) -> Self {
        Self { core: HandlerCore::new(min_level), conn, channel: channel.into() }
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.core.responsible(record.level) {
            return None;
        }
        let payload = self.core.format(record);

        match self.conn.publish(&self.channel, &payload) {
            Ok(()) => Some(payload),
            Err(e) => {
                eprintln!("(RedisPubSub) Failed to PUBLISH to {:?}: {}", self.channel, e);
                None
            }
        }
    }
}

impl_handler_core!(RedisPubSubHandler, HandlerKind::RedisPubSub);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::sync::Mutex;

    struct FakeConn {
        published: Mutex<Vec<(String, String)>>,
    }

    impl RedisPubSubConnection for FakeConn {
        fn publish(&self, channel: &str, message: &str) -> std::result::Result<(), String> {
            self.published.lock().unwrap().push((channel.to_owned(), message.to_owned()));
            Ok(())
        }
    }

    #[test]
    fn publishes_to_configured_channel() {
        let conn = Arc::new(FakeConn { published: Mutex::new(Vec::new()) });
        let handler = RedisPubSubHandler::new(conn.clone(), "logs", Level::Debug);
        let rec = Record {
            context: "app".into(),
            level: Level::Warning,
            message: "careful".into(),
            root: Map::new(),
            data: Map::new(),
        };
        assert!(handler.invoke_impl(&rec).is_some());
        let published = conn.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "logs");
    }
}
