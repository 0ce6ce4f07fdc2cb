/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! The null sink: honours the level gate and formatter but delivers nowhere
//! (spec.md C6 table). Useful to silence a logger in tests, or as a
//! Conditional fallback that intentionally discards unmatched records.

use super::{impl_handler_core, HandlerCore, HandlerKind};
use crate::level::Level;
use crate::record::Record;

pub struct NullHandler {
    core: HandlerCore,
}

impl NullHandler {
    pub fn new(min_level: Level) -> Self {
        Self { core: HandlerCore::new(min_level) }
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.core.responsible(record.level) {
            return None;
        }
        Some(self.core.format(record))
    }
}

impl_handler_core!(NullHandler, HandlerKind::Null);
