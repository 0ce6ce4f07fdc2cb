/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! The handler contract (spec.md §4.2) and its terminal implementations
//! (spec.md §4.7).

mod amqp;
mod chrome_console;
mod console;
#[cfg(feature = "database")]
mod database;
mod email;
#[cfg(feature = "kafka")]
mod kafka;
mod loki;
mod null;
mod redis_kv;
mod redis_pubsub;
mod slack;
mod syslog;
mod teams;
mod webhook;

pub mod file;

pub use amqp::{AmqpChannel, AmqpHandler};
pub use chrome_console::{ChromeConsoleHandler, ShutdownHook};
pub use console::ConsoleHandler;
#[cfg(feature = "database")]
pub use database::{DatabaseConnection, DatabaseHandler, SqlDialect};
pub use email::{EmailHandler, EmailHandlerBuilder};
#[cfg(feature = "kafka")]
pub use kafka::KafkaHandler;
pub use loki::LokiHandler;
pub use null::NullHandler;
pub use redis_kv::{RedisKvConnection, RedisKvHandler};
pub use redis_pubsub::{RedisPubSubConnection, RedisPubSubHandler};
pub use slack::SlackHandler;
pub use syslog::SyslogHandler;
pub use teams::TeamsHandler;
pub use webhook::{BodyFormatter, WebhookHandler};

use crate::formatter::{default_formatter, Formatter};
use crate::level::Level;
use crate::record::Record;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Opaque, process-unique handler identity (spec.md §3 "Handler instance",
/// §4.2 "Identity").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(String);

impl HandlerId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", uuid::Uuid::new_v4(), n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HandlerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runtime kind tag for a handler instance, enabling
/// `Logger::handlers_of_kind` (spec.md §4.3 "getHandlersByKind", §9 "target
/// should use a tagged sum").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    File,
    Console,
    ErrorStream,
    Syslog,
    Webhook,
    Loki,
    Slack,
    Teams,
    BrowserConsole,
    Email,
    Database,
    Null,
    RedisKv,
    RedisPubSub,
    Amqp,
    Kafka,
    FingersCrossed,
    Sampling,
    Conditional,
}

/// Every handler's contract (spec.md §4.2).
pub trait Handler: Send + Sync {
    /// Formats and delivers `record` iff this handler is responsible for its
    /// level. Returns the formatted payload on success, `None` on a level
    /// drop or delivery failure.
    fn invoke(&self, record: &Record) -> Option<String>;

    fn set_context(&self, context: &str);
    fn set_format(&self, formatter: Arc<dyn Formatter>);
    fn set_handler_name(&self, name: Option<String>);
    fn handler_name(&self) -> Option<String>;
    fn handler_id(&self) -> &HandlerId;
    fn min_level(&self) -> Level;
    fn kind(&self) -> HandlerKind;
}

/// A handler that can have its output redirected to a caller-supplied sink
/// (spec.md §4.2, §9 "Decorator vs. terminal", the capability interface a
/// decorator's wrapped child must implement).
pub trait Streamable: Handler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>);
}

/// Shared mutable state common to every terminal handler: identity, optional
/// name, logger context, minimum level and formatter. Terminal handlers
/// compose this rather than inheriting from it (spec.md §9 "Model this with
/// a capability interface, not a class hierarchy").
pub struct HandlerCore {
    id: HandlerId,
    name: Mutex<Option<String>>,
    context: Mutex<String>,
    min_level: Level,
    formatter: Mutex<Arc<dyn Formatter>>,
}

impl HandlerCore {
    pub fn new(min_level: Level) -> Self {
        Self {
            id: HandlerId::new(),
            name: Mutex::new(None),
            context: Mutex::new(String::new()),
            min_level,
            formatter: Mutex::new(default_formatter()),
        }
    }

    /// The level gate (spec.md §4.2 "Level gate"): true iff this handler is
    /// responsible for `level`.
    pub fn responsible(&self, level: Level) -> bool {
        level.rank() >= self.min_level.rank()
    }

    pub fn format(&self, record: &Record) -> String {
        self.formatter.lock().expect("formatter lock poisoned").format(record)
    }

    pub fn context(&self) -> String {
        self.context.lock().expect("context lock poisoned").clone()
    }

    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    pub fn name(&self) -> Option<String> {
        self.name.lock().expect("name lock poisoned").clone()
    }

    pub fn set_name(&self, name: Option<String>) {
        *self.name.lock().expect("name lock poisoned") = name;
    }

    pub fn set_context_inner(&self, context: &str) {
        *self.context.lock().expect("context lock poisoned") = context.to_owned();
    }

    pub fn set_format_inner(&self, formatter: Arc<dyn Formatter>) {
        *self.formatter.lock().expect("formatter lock poisoned") = formatter;
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }
}

/// Implements the shared `Handler` methods (identity/name/context/formatter)
/// by delegating to a struct's `core: HandlerCore` field, so each terminal
/// handler only has to write `invoke` and `kind`.
macro_rules! impl_handler_core {
    ($ty:ty, $kind:expr) => {
        impl $crate::handler::Handler for $ty {
            fn invoke(&self, record: &$crate::record::Record) -> Option<String> {
                self.invoke_impl(record)
            }

            fn set_context(&self, context: &str) {
                self.core.set_context_inner(context);
            }

            fn set_format(&self, formatter: std::sync::Arc<dyn $crate::formatter::Formatter>) {
                self.core.set_format_inner(formatter);
            }

            fn set_handler_name(&self, name: Option<String>) {
                self.core.set_name(name);
            }

            fn handler_name(&self) -> Option<String> {
                self.core.name()
            }

            fn handler_id(&self) -> &$crate::handler::HandlerId {
                self.core.id()
            }

            fn min_level(&self) -> $crate::level::Level {
                self.core.min_level()
            }

            fn kind(&self) -> $crate::handler::HandlerKind {
                $kind
            }
        }
    };
}

pub(crate) use impl_handler_core;

/// Writes `payload` followed by a newline to `stream` and reports success:
/// the shared "when a stream override is set" behaviour of every streamable
/// handler (spec.md §4.7).
pub(crate) fn write_to_stream(stream: &mut dyn Write, payload: &str) -> Option<String> {
    if writeln!(stream, "{}", payload).is_ok() {
        Some(payload.to_owned())
    } else {
        None
    }
}
