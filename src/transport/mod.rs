/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! The HTTP transport shared by webhook, Slack, Teams and Loki handlers
//! (spec.md §4.7 "HTTP transport (shared engine)").

mod http;

pub use http::{HttpMethod, HttpTransport, HttpTransportBuilder};
