/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Sampling decorator (spec.md §4.5): four pluggable strategies deciding
//! whether a record is passed through to the wrapped handler.

use crate::formatter::Formatter;
use crate::handler::{Handler, HandlerId, HandlerKind, Streamable};
use crate::level::{min_rank, Level};
use crate::record::Record;
use rand::Rng;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// The configured sampling strategy (spec.md §4.5).
pub enum SamplingStrategy {
    /// First `rate` records within each wall-clock second are forwarded.
    Rate { rate: u64 },
    /// Accept with probability `percentage / 100`.
    Percentage { percentage: u8 },
    /// Unconditional passthrough for `always_log_levels` (compared by rank,
    /// §4.5 "comparison is done by rank"); percentage gate otherwise.
    Smart { always_log_levels: Vec<Level>, sample_percentage: u8 },
    /// Deduplicates identical `(level, message[:200])` within `window`.
    Fingerprint { window: Duration },
}

#[derive(Debug, Clone)]
pub struct SamplingStats {
    pub strategy: &'static str,
    pub tracked_fingerprints: usize,
    pub current_second_count: u64,
}

struct FingerprintEntry {
    count: u64,
    first_seen: Instant,
    last_seen: Instant,
}

struct RateState {
    current_second: u64,
    count_this_second: u64,
}

pub struct SamplingHandler {
    id: HandlerId,
    name: Mutex<Option<String>>,
    child: Arc<dyn Streamable>,
    strategy: SamplingStrategy,
    rate_state: Mutex<RateState>,
    fingerprints: Mutex<HashMap<u128, FingerprintEntry>>,
    clock: Arc<dyn Fn() -> Instant + Send + Sync>,
    epoch: Instant,
}

impl SamplingHandler {
    pub fn new(child: Arc<dyn Streamable>, strategy: SamplingStrategy) -> Self {
        Self::with_clock(child, strategy, Arc::new(Instant::now))
    }

    /// Test seam: inject a deterministic clock instead of `Instant::now`.
    fn with_clock(
        child: Arc<dyn Streamable>,
        strategy: SamplingStrategy,
        clock: Arc<dyn Fn() -> Instant + Send + Sync>,
    ) -> Self {
        let epoch = clock();
        Self {
            id: HandlerId::new(),
            name: Mutex::new(None),
            child,
            strategy,
            rate_state: Mutex::new(RateState { current_second: 0, count_this_second: 0 }),
            fingerprints: Mutex::new(HashMap::new()),
            clock,
            epoch,
        }
    }

    fn now(&self) -> Instant {
        (self.clock)()
    }

    fn wall_clock_second(&self) -> u64 {
        // Bucketed from a fixed construction-time epoch rather than an
        // absolute wall-clock time, since `Instant` carries no epoch of its
        // own; adequate for "distinct wall-clock second" gating within a
        // single handler's lifetime (spec.md §4.5 "Rate").
        self.now().duration_since(self.epoch).as_secs()
    }

    fn accept_rate(&self, rate: u64) -> bool {
        let mut state = self.rate_state.lock().expect("rate lock poisoned");
        let second = self.wall_clock_second();
        if second != state.current_second {
            state.current_second = second;
            state.count_this_second = 0;
        }
        state.count_this_second += 1;
        state.count_this_second <= rate
    }

    fn accept_percentage(percentage: u8) -> bool {
        let draw: u8 = rand::thread_rng().gen_range(1..=100);
        draw <= percentage
    }

    fn fingerprint_of(level: Level, message: &str) -> u128 {
        let truncated = &message[..message.char_indices().nth(200).map(|(i, _)| i).unwrap_or(message.len())];
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        use std::hash::{Hash, Hasher};
        (level.rank(), truncated).hash(&mut hasher);
        // Widen the 64-bit hash into a 128-bit fingerprint by hashing twice
        // with a salted second pass, keeping distinct levels/messages apart
        // (spec.md §4.5 "128-bit hash").
        let lo = hasher.finish();
        let mut hasher2 = std::collections::hash_map::DefaultHasher::new();
        (lo, level.rank(), truncated).hash(&mut hasher2);
        let hi = hasher2.finish();
        ((hi as u128) << 64) | (lo as u128)
    }

    fn accept_fingerprint(&self, window: Duration, record: &Record) -> bool {
        let now = self.now();
        let mut map = self.fingerprints.lock().expect("fingerprint lock poisoned");
        map.retain(|_, entry| now.duration_since(entry.last_seen) <= window);

        let fp = Self::fingerprint_of(record.level, &record.message);
        match map.get_mut(&fp) {
            Some(entry) => {
                entry.count += 1;
                entry.last_seen = now;
                false
            }
            None => {
                map.insert(fp, FingerprintEntry { count: 1, first_seen: now, last_seen: now });
                true
            }
        }
    }

    fn accept(&self, record: &Record) -> bool {
        match &self.strategy {
            SamplingStrategy::Rate { rate } => self.accept_rate(*rate),
            SamplingStrategy::Percentage { percentage } => Self::accept_percentage(*percentage),
            SamplingStrategy::Smart { always_log_levels, sample_percentage } => {
                match min_rank(always_log_levels) {
                    Some(min) if record.level.rank() >= min => true,
                    _ => Self::accept_percentage(*sample_percentage),
                }
            }
            SamplingStrategy::Fingerprint { window } => self.accept_fingerprint(*window, record),
        }
    }

    pub fn statistics(&self) -> SamplingStats {
        SamplingStats {
            strategy: match self.strategy {
                SamplingStrategy::Rate { .. } => "rate",
                SamplingStrategy::Percentage { .. } => "percentage",
                SamplingStrategy::Smart { .. } => "smart",
                SamplingStrategy::Fingerprint { .. } => "fingerprint",
            },
            tracked_fingerprints: self.fingerprints.lock().expect("fingerprint lock poisoned").len(),
            current_second_count: self.rate_state.lock().expect("rate lock poisoned").count_this_second,
        }
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.accept(record) {
            return None;
        }
        self.child.invoke(record)
    }
}

impl Handler for SamplingHandler {
    fn invoke(&self, record: &Record) -> Option<String> {
        self.invoke_impl(record)
    }

    fn set_context(&self, context: &str) {
        self.child.set_context(context);
    }

    fn set_format(&self, formatter: Arc<dyn Formatter>) {
        self.child.set_format(formatter);
    }

    fn set_handler_name(&self, name: Option<String>) {
        *self.name.lock().expect("name lock poisoned") = name;
    }

    fn handler_name(&self) -> Option<String> {
        self.name.lock().expect("name lock poisoned").clone()
    }

    fn handler_id(&self) -> &HandlerId {
        &self.id
    }

    fn min_level(&self) -> Level {
        Level::Debug
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Sampling
    }
}

impl Streamable for SamplingHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        self.child.set_stream(stream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ConsoleHandler;
    use serde_json::Map;
    use std::sync::Mutex as StdMutex;

    fn rec(level: Level, msg: &str) -> Record {
        Record { context: "ctx".into(), level, message: msg.into(), root: Map::new(), data: Map::new() }
    }

    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);
    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn spy() -> (Arc<ConsoleHandler>, Arc<StdMutex<Vec<u8>>>) {
        let handler = Arc::new(ConsoleHandler::new(Level::Debug));
        let buf = Arc::new(StdMutex::new(Vec::new()));
        handler.set_stream(Some(Box::new(SharedBuf(buf.clone()))));
        (handler, buf)
    }

    fn line_count(buf: &Arc<StdMutex<Vec<u8>>>) -> usize {
        String::from_utf8(buf.lock().unwrap().clone()).unwrap().lines().count()
    }

    #[test]
    fn rate_admits_first_n_per_second() {
        let (child, buf) = spy();
        let sampler = SamplingHandler::new(child, SamplingStrategy::Rate { rate: 2 });
        for _ in 0..5 {
            sampler.invoke(&rec(Level::Info, "x"));
        }
        assert_eq!(line_count(&buf), 2);
    }

    #[test]
    fn smart_always_admits_configured_levels_by_rank() {
        let (child, buf) = spy();
        let sampler = SamplingHandler::new(
            child,
            SamplingStrategy::Smart { always_log_levels: vec![Level::Error], sample_percentage: 0 },
        );
        sampler.invoke(&rec(Level::Critical, "boom"));
        sampler.invoke(&rec(Level::Error, "err"));
        sampler.invoke(&rec(Level::Info, "quiet"));
        assert_eq!(line_count(&buf), 2);
    }

    #[test]
    fn fingerprint_dedupes_within_window_and_reopens_after() {
        let (child, buf) = spy();
        let shared_now = Arc::new(StdMutex::new(Instant::now()));
        let now_for_clock = shared_now.clone();
        let sampler = SamplingHandler::with_clock(
            child,
            SamplingStrategy::Fingerprint { window: Duration::from_secs(1) },
            Arc::new(move || *now_for_clock.lock().unwrap()),
        );

        for _ in 0..5 {
            sampler.invoke(&rec(Level::Info, "X"));
        }
        *shared_now.lock().unwrap() += Duration::from_secs(2);
        sampler.invoke(&rec(Level::Info, "X"));
        sampler.invoke(&rec(Level::Info, "Y"));

        assert_eq!(line_count(&buf), 3);
    }

    #[test]
    fn distinct_levels_with_identical_messages_have_distinct_fingerprints() {
        let fp_info = SamplingHandler::fingerprint_of(Level::Info, "same");
        let fp_error = SamplingHandler::fingerprint_of(Level::Error, "same");
        assert_ne!(fp_info, fp_error);
    }
}
