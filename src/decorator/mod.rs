/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Decorator handlers (spec.md §4.4–§4.6): wrap a streamable child handler
//! and decide which records actually reach it. Unlike terminal handlers
//! these don't format or deliver anything themselves, so they don't compose
//! `HandlerCore`, each keeps its own identity/name and forwards
//! `set_context`/`set_format`/`set_stream` straight to the wrapped child
//! (spec.md §9 "Decorator vs. terminal").

mod conditional;
mod fingers_crossed;
mod sampling;

pub use conditional::{ConditionalHandler, Predicate};
pub use fingers_crossed::{FingersCrossedHandler, FingersCrossedStats};
pub use sampling::{SamplingHandler, SamplingStats, SamplingStrategy};
