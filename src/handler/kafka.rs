/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Kafka sink (spec.md §4.7 "Kafka"), backed by the real `rdkafka` client
//! (grounded on `estuary-flow`'s use of `rdkafka` for its own pipeline
//! sinks). Producer construction happens lazily on first publish, not at
//! `KafkaHandler::new`; after each publish a bounded, non-blocking `poll`
//! drains delivery callbacks so the producer's internal queue doesn't grow
//! unbounded under load.

use super::{impl_handler_core, HandlerCore, HandlerKind};
use crate::level::Level;
use crate::record::Record;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use std::sync::Mutex;
use std::time::Duration;

pub struct KafkaHandler {
    core: HandlerCore,
    brokers: String,
    topic: String,
    /// Lazily created on the first accepted record (spec.md §4.7 "lazily
    /// create a topic producer"), then reused for the handler's lifetime.
    /// The same lock also serializes `flush` against a log call in flight.
    producer: Mutex<Option<BaseProducer>>,
}

impl KafkaHandler {
    pub fn new(brokers: &str, topic: impl Into<String>, min_level: Level) -> crate::error::Result<Self> {
        Ok(Self {
            core: HandlerCore::new(min_level),
            brokers: brokers.to_owned(),
            topic: topic.into(),
            producer: Mutex::new(None),
        })
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.core.responsible(record.level) {
            return None;
        }
        let payload = self.core.format(record);

        let mut guard = self.producer.lock().expect("producer lock poisoned");
        let producer = match self.connect(&mut guard) {
            Some(producer) => producer,
            None => return None,
        };

        let send_result =
            producer.send(BaseRecord::to(&self.topic).payload(payload.as_bytes()).key(&record.context));

        match send_result {
            Ok(()) => {
                producer.poll(Duration::from_millis(0));
                Some(payload)
            }
            Err((e, _)) => {
                eprintln!("(Kafka) Failed to enqueue log entry for topic {:?}: {}", self.topic, e);
                None
            }
        }
    }

    /// Creates the producer on first use and caches it; on every subsequent
    /// call just hands back the cached handle.
    fn connect<'a>(&self, guard: &'a mut Option<BaseProducer>) -> Option<&'a BaseProducer> {
        if guard.is_none() {
            let producer: Result<BaseProducer, _> =
                ClientConfig::new().set("bootstrap.servers", &self.brokers).create();
            match producer {
                Ok(p) => *guard = Some(p),
                Err(e) => {
                    eprintln!("(Kafka) Failed to create producer for {:?}: {}", self.brokers, e);
                    return None;
                }
            }
        }
        guard.as_ref()
    }

    /// Blocks up to `timeout` waiting for queued deliveries to complete
    /// (spec.md §4.7 "a `flush(timeoutMs)` operation for graceful shutdown").
    pub fn flush(&self, timeout: Duration) {
        let guard = self.producer.lock().expect("producer lock poisoned");
        if let Some(producer) = guard.as_ref() {
            let _ = producer.flush(timeout);
        }
    }
}

impl_handler_core!(KafkaHandler, HandlerKind::Kafka);
