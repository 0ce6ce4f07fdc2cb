/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! The logger: a context holder, ordered handler registry, and dispatch
//! loop with per-handler fault isolation (spec.md §4, C8).

use crate::handler::{Handler, HandlerId, HandlerKind};
use crate::level::Level;
use crate::record::{CallContext, Producer, Record, RecordBuilder};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// `(error, handlerId, level, message, callContext)` (spec.md §7 "The
/// logger's own error hook signature"). Only fires for a handler that
/// panics; every other failure mode a handler might hit (HTTP non-2xx,
/// broker disconnects, disk errors) is swallowed to an absent
/// `Handler::invoke` return per spec, with no error to report here.
pub type ErrorHook = Arc<dyn Fn(&str, &HandlerId, Level, &str, &CallContext) + Send + Sync>;

struct Entry {
    id: HandlerId,
    handler: Arc<dyn Handler>,
}

/// Holds a context string, an ordered registry of handlers keyed by
/// identity with a secondary name index, and an optional error hook
/// (spec.md §3 "Logger").
pub struct Logger {
    context: Mutex<String>,
    handlers: Mutex<Vec<Entry>>,
    names: Mutex<std::collections::HashMap<String, HandlerId>>,
    error_hook: Mutex<Option<ErrorHook>>,
    builder: Mutex<RecordBuilder>,
}

impl Logger {
    pub fn new(context: impl Into<String>) -> Self {
        Self::with_context(context)
    }

    /// Alias for `new` (spec.md §3 "a context string, set at construction").
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: Mutex::new(context.into()),
            handlers: Mutex::new(Vec::new()),
            names: Mutex::new(std::collections::HashMap::new()),
            error_hook: Mutex::new(None),
            builder: Mutex::new(RecordBuilder::new()),
        }
    }

    pub fn context(&self) -> String {
        self.context.lock().expect("context lock poisoned").clone()
    }

    pub fn set_error_hook(&self, hook: ErrorHook) {
        *self.error_hook.lock().expect("error hook lock poisoned") = Some(hook);
    }

    pub fn add_field(&self, name: impl Into<String>, producer: Producer) {
        self.builder.lock().expect("builder lock poisoned").add_field(name, producer);
    }

    pub fn add_extra(&self, name: impl Into<String>, producer: Producer) {
        self.builder.lock().expect("builder lock poisoned").add_extra(name, producer);
    }

    /// Registers `handler`, propagating the logger's context to it. A
    /// handler already registered under the same identity is a no-op,
    /// the chosen duplicate-registration policy (SPEC_FULL.md §F); the
    /// spec leaves this an open implementation decision (spec.md §9
    /// "duplicate registration of the same instance must be rejected or is
    /// a no-op, define and test the chosen policy").
    pub fn add_handler(&self, handler: Arc<dyn Handler>) -> HandlerId {
        let id = handler.handler_id().clone();
        handler.set_context(&self.context());

        let mut handlers = self.handlers.lock().expect("handlers lock poisoned");
        if handlers.iter().any(|e| e.id == id) {
            return id;
        }
        if let Some(name) = handler.handler_name() {
            self.names.lock().expect("names lock poisoned").insert(name, id.clone());
        }
        handlers.push(Entry { id: id.clone(), handler });
        id
    }

    pub fn get_handler(&self, id: &HandlerId) -> Option<Arc<dyn Handler>> {
        self.handlers
            .lock()
            .expect("handlers lock poisoned")
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.handler.clone())
    }

    pub fn get_handler_by_name(&self, name: &str) -> Option<Arc<dyn Handler>> {
        let id = self.names.lock().expect("names lock poisoned").get(name).cloned()?;
        self.get_handler(&id)
    }

    pub fn get_handlers_by_kind(&self, kind: HandlerKind) -> Vec<Arc<dyn Handler>> {
        self.handlers
            .lock()
            .expect("handlers lock poisoned")
            .iter()
            .filter(|e| e.handler.kind() == kind)
            .map(|e| e.handler.clone())
            .collect()
    }

    /// Removes a handler by identity, also deleting its name-index entry if
    /// one exists (spec.md §8 "removing by identity also deletes its name
    /// index entry").
    pub fn remove_handler(&self, id: &HandlerId) -> bool {
        let mut handlers = self.handlers.lock().expect("handlers lock poisoned");
        let before = handlers.len();
        handlers.retain(|e| &e.id != id);
        let removed = handlers.len() != before;
        if removed {
            self.names.lock().expect("names lock poisoned").retain(|_, v| v != id);
        }
        removed
    }

    /// Removes a handler by name, which removes it by identity too
    /// (spec.md §8 "Removing a handler by name removes it by identity").
    pub fn remove_handler_by_name(&self, name: &str) -> bool {
        let id = self.names.lock().expect("names lock poisoned").remove(name);
        match id {
            Some(id) => self.remove_handler(&id),
            None => false,
        }
    }

    /// Builds one record for this call and fans it out to every handler in
    /// insertion order, isolating a panicking handler from the rest (spec.md
    /// §5 "Failure isolation").
    pub fn log(&self, level: Level, message: &str, call_context: CallContext) {
        let record = self.builder.lock().expect("builder lock poisoned").build(
            &self.context(),
            level,
            message,
            call_context.clone(),
        );
        self.dispatch(&record, &call_context);
    }

    fn dispatch(&self, record: &Record, call_context: &CallContext) {
        let handlers: Vec<Arc<dyn Handler>> =
            self.handlers.lock().expect("handlers lock poisoned").iter().map(|e| e.handler.clone()).collect();

        for handler in handlers {
            let id = handler.handler_id().clone();
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.invoke(record)));
            if let Err(panic) = outcome {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_owned());
                self.report_error(&message, &id, record.level, &record.message, call_context);
            }
        }
    }

    /// Invokes the error hook if one is set; a hook that itself panics is
    /// ignored rather than propagated (spec.md §7 "must not itself raise;
    /// if it does, the dispatcher ignores it and continues").
    fn report_error(&self, error: &str, id: &HandlerId, level: Level, message: &str, call_context: &CallContext) {
        let hook = self.error_hook.lock().expect("error hook lock poisoned").clone();
        if let Some(hook) = hook {
            let _ = catch_unwind(AssertUnwindSafe(|| hook(error, id, level, message, call_context)));
        } else {
            eprintln!("(Logger) handler {} failed: {}", id, error);
        }
    }
}
