/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Fluent builder façade (spec.md C9): one `add_*` method per terminal
//! handler plus a `wrap_*` method per decorator, each constructing the
//! handler, letting the caller chain an optional name/formatter, then
//! registering it on the logger.

use crate::error::Result;
use crate::formatter::Formatter;
use crate::handler::*;
use crate::level::Level;
use crate::logger::Logger;
use crate::transport::HttpTransport;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "database")]
use crate::handler::{DatabaseConnection, DatabaseHandler};
#[cfg(feature = "kafka")]
use crate::handler::KafkaHandler;

use crate::decorator::{ConditionalHandler, FingersCrossedHandler, Predicate, SamplingHandler, SamplingStrategy};

/// Borrows a `Logger` to build and register handlers fluently.
pub struct Builder<'a> {
    logger: &'a Logger,
}

/// A freshly constructed, not-yet-registered handler. Chain `.name()`
/// and/or `.formatter()`, then `.register()` to add it to the logger, or
/// `.handler()` to pull out the `Arc` for wrapping in a decorator instead.
pub struct Registration<'a, H: Handler + 'static> {
    logger: &'a Logger,
    handler: Arc<H>,
}

impl<'a, H: Handler + 'static> Registration<'a, H> {
    fn new(logger: &'a Logger, handler: Arc<H>) -> Self {
        Self { logger, handler }
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.handler.set_handler_name(Some(name.into()));
        self
    }

    pub fn formatter(self, formatter: Arc<dyn Formatter>) -> Self {
        self.handler.set_format(formatter);
        self
    }

    /// The underlying handler, e.g. to wrap it in a decorator or to keep a
    /// typed handle for `flush()`/`statistics()` calls later.
    pub fn handler(&self) -> Arc<H> {
        self.handler.clone()
    }

    pub fn register(self) -> HandlerId {
        self.logger.add_handler(self.handler)
    }
}

impl<'a> Builder<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        Self { logger }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, min_level: Level) -> Result<Registration<'a, file::FileHandler>> {
        Ok(Registration::new(self.logger, Arc::new(file::FileHandler::new(path, min_level)?)))
    }

    pub fn add_console(&self, min_level: Level) -> Registration<'a, ConsoleHandler> {
        Registration::new(self.logger, Arc::new(ConsoleHandler::new(min_level)))
    }

    pub fn add_error_stream(&self, min_level: Level) -> Registration<'a, ConsoleHandler> {
        Registration::new(self.logger, Arc::new(ConsoleHandler::error_stream(min_level)))
    }

    pub fn add_syslog(&self, ident: impl Into<String>, min_level: Level) -> Result<Registration<'a, SyslogHandler>> {
        Ok(Registration::new(self.logger, Arc::new(SyslogHandler::new(ident, min_level)?)))
    }

    pub fn add_null(&self, min_level: Level) -> Registration<'a, NullHandler> {
        Registration::new(self.logger, Arc::new(NullHandler::new(min_level)))
    }

    pub fn add_webhook(
        &self,
        url: impl Into<String>,
        transport: HttpTransport,
        min_level: Level,
    ) -> Result<Registration<'a, WebhookHandler>> {
        Ok(Registration::new(self.logger, Arc::new(WebhookHandler::new(url, transport, min_level)?)))
    }

    pub fn add_loki(
        &self,
        base_url: &str,
        labels: HashMap<String, String>,
        min_level: Level,
    ) -> Result<Registration<'a, LokiHandler>> {
        Ok(Registration::new(self.logger, Arc::new(LokiHandler::new(base_url, labels, min_level)?)))
    }

    pub fn add_slack(&self, url: impl Into<String>, min_level: Level) -> Result<Registration<'a, SlackHandler>> {
        Ok(Registration::new(self.logger, Arc::new(SlackHandler::new(url, min_level)?)))
    }

    pub fn add_teams(&self, url: impl Into<String>, min_level: Level) -> Result<Registration<'a, TeamsHandler>> {
        Ok(Registration::new(self.logger, Arc::new(TeamsHandler::new(url, min_level)?)))
    }

    pub fn add_browser_console(&self, min_level: Level) -> Registration<'a, ChromeConsoleHandler> {
        Registration::new(self.logger, Arc::new(ChromeConsoleHandler::new(min_level)))
    }

    pub fn add_email(
        &self,
        host: impl Into<String>,
        port: u16,
        from: impl Into<String>,
        configure: impl FnOnce(EmailHandlerBuilder) -> EmailHandlerBuilder,
    ) -> Result<Registration<'a, EmailHandler>> {
        let handler = configure(EmailHandler::builder(host, port, from)).build()?;
        Ok(Registration::new(self.logger, Arc::new(handler)))
    }

    #[cfg(feature = "database")]
    pub fn add_database(
        &self,
        connection: DatabaseConnection,
        table: impl Into<String>,
        min_level: Level,
    ) -> Registration<'a, DatabaseHandler> {
        Registration::new(self.logger, Arc::new(DatabaseHandler::new(connection, table, min_level)))
    }

    pub fn add_redis_kv(
        &self,
        connection: Arc<dyn RedisKvConnection>,
        ttl_secs: u64,
        min_level: Level,
    ) -> Registration<'a, RedisKvHandler> {
        Registration::new(self.logger, Arc::new(RedisKvHandler::new(connection, ttl_secs, min_level)))
    }

    pub fn add_redis_pubsub(
        &self,
        connection: Arc<dyn RedisPubSubConnection>,
        channel: impl Into<String>,
        min_level: Level,
    ) -> Registration<'a, RedisPubSubHandler> {
        Registration::new(self.logger, Arc::new(RedisPubSubHandler::new(connection, channel, min_level)))
    }

    pub fn add_amqp(
        &self,
        channel: Arc<dyn AmqpChannel>,
        exchange: impl Into<String>,
        min_level: Level,
    ) -> Result<Registration<'a, AmqpHandler>> {
        Ok(Registration::new(self.logger, Arc::new(AmqpHandler::new(channel, exchange, min_level)?)))
    }

    #[cfg(feature = "kafka")]
    pub fn add_kafka(
        &self,
        brokers: &str,
        topic: impl Into<String>,
        min_level: Level,
    ) -> Result<Registration<'a, KafkaHandler>> {
        Ok(Registration::new(self.logger, Arc::new(KafkaHandler::new(brokers, topic, min_level)?)))
    }

    pub fn wrap_fingers_crossed(
        &self,
        child: Arc<dyn Streamable>,
        activation_level: Level,
        capacity: usize,
        latching: bool,
    ) -> Result<Registration<'a, FingersCrossedHandler>> {
        Ok(Registration::new(
            self.logger,
            Arc::new(FingersCrossedHandler::new(child, activation_level, capacity, latching)?),
        ))
    }

    pub fn wrap_sampling(&self, child: Arc<dyn Streamable>, strategy: SamplingStrategy) -> Registration<'a, SamplingHandler> {
        Registration::new(self.logger, Arc::new(SamplingHandler::new(child, strategy)))
    }

    pub fn wrap_conditional(
        &self,
        rules: Vec<(Predicate, Arc<dyn Streamable>)>,
        fallback: Option<Arc<dyn Streamable>>,
    ) -> Registration<'a, ConditionalHandler> {
        Registration::new(self.logger, Arc::new(ConditionalHandler::new(rules, fallback)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_applies_name_and_registers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = Logger::new("svc");
        let builder = Builder::new(&logger);

        let id = builder.add_file(&path, Level::Debug).unwrap().name("app").register();
        assert!(logger.get_handler_by_name("app").is_some());
        assert!(logger.get_handler(&id).is_some());
    }

    #[test]
    fn decorator_wraps_a_terminal_handler_without_double_registering_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = Logger::new("svc");
        let builder = Builder::new(&logger);

        let file_reg = builder.add_file(&path, Level::Debug).unwrap();
        let file_handler = file_reg.handler();
        builder
            .wrap_fingers_crossed(file_handler, Level::Error, 10, true)
            .unwrap()
            .name("buffered")
            .register();

        assert_eq!(logger.get_handlers_by_kind(HandlerKind::File).len(), 0);
        assert_eq!(logger.get_handlers_by_kind(HandlerKind::FingersCrossed).len(), 1);
    }
}
