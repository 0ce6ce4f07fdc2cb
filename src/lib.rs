/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Structured, multi-sink application logging.
//!
//! A [`Logger`] holds a context string and an ordered registry of
//! [`Handler`]s. Each log call builds one [`Record`], interpolating
//! `{name}` placeholders against root fields, extras and call-site data,
//! and fans it out to every handler in registration order. Handlers gate by
//! severity, format the record through a pluggable [`Formatter`], and
//! deliver it to a destination: a file, the console, syslog, SMTP, an HTTP
//! webhook, Grafana Loki, Slack, Teams, a browser console, a database, or a
//! message broker. [`FingersCrossedHandler`], [`SamplingHandler`] and
//! [`ConditionalHandler`] wrap a destination handler to decide which records
//! actually reach it.
//!
//! Construct handlers and wire them onto a logger through [`Builder`]:
//!
//! ```no_run
//! use logmux::{Builder, Level, Logger};
//!
//! let logger = Logger::new("OrderSvc");
//! let builder = Builder::new(&logger);
//! builder.add_console(Level::Info).register();
//! builder.add_file("/var/log/ordersvc.log", Level::Debug).unwrap().name("app").register();
//!
//! logger.log(Level::Info, "order {id} placed", {
//!     let mut ctx = serde_json::Map::new();
//!     ctx.insert("id".into(), 42.into());
//!     ctx
//! });
//! ```

pub mod builder;
pub mod decorator;
pub mod enrich;
pub mod error;
#[cfg(feature = "log-facade")]
pub mod facade;
pub mod formatter;
pub mod handler;
pub mod level;
pub mod logger;
pub mod record;
pub mod transport;

pub use builder::{Builder, Registration};
pub use decorator::{ConditionalHandler, FingersCrossedHandler, Predicate, SamplingHandler, SamplingStrategy};
pub use error::{Error, Result};
pub use formatter::Formatter;
pub use handler::{Handler, HandlerId, HandlerKind, Streamable};
pub use level::Level;
pub use logger::{ErrorHook, Logger};
pub use record::{CallContext, Producer, Record};
