/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Formatters map a finished `Record` to a destination-specific payload
//! (spec.md §4.8). Plain formatters are pure functions of their input; the
//! browser-console and Loki formatters carry constructor-supplied or
//! accumulated state, locked independently of the owning handler (spec.md §9
//! "Stateful formatters").

mod chrome;
mod human;
mod json;
mod line;
mod loki;
mod slack;
mod teams;

pub use chrome::{ChromeLoggerFormatter, ChromeRow};
pub use human::HumanFormatter;
pub use json::JsonFormatter;
pub use line::LineFormatter;
pub use loki::LokiFormatter;
pub use slack::SlackFormatter;
pub use teams::TeamsFormatter;

use crate::record::Record;

/// `Formatter` renders a `Record` as a destination payload. This trait is the
/// generalization of the teacher's `LokiFormatter::write_record`
/// (`aurowora-log_loki::fmt`) to every sink kind in this crate.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &Record) -> String;
}

/// The default formatter used by a handler that hasn't had `set_format`
/// called on it yet (spec.md §3 "Formatters are created on first use; the
/// default is the line formatter").
pub fn default_formatter() -> std::sync::Arc<dyn Formatter> {
    std::sync::Arc::new(LineFormatter)
}
