/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Construction-time validation errors (spec.md §7 "Construction validation").
//!
//! Transient and permanent delivery failures are never represented here;
//! per spec they are swallowed to an absent `Handler::invoke` return or
//! routed to the logger's error hook, never surfaced as a `Result::Err`.

use std::path::PathBuf;

/// Errors raised synchronously while constructing a handler or transport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid URL {0:?}")]
    InvalidUrl(String),

    #[error("invalid email address {0:?}")]
    InvalidEmail(String),

    #[error("HTTP method {0:?} is not one of GET, POST, PUT, PATCH, DELETE")]
    InvalidMethod(String),

    #[error("timeout must be between 1 and 300 seconds, got {0}")]
    InvalidTimeout(u64),

    #[error("retries must be between 0 and 10, got {0}")]
    InvalidRetries(u32),

    #[error("buffer capacity must be at least 1")]
    InvalidCapacity,

    #[error("parent directory {0:?} does not exist")]
    MissingParentDir(PathBuf),

    #[error("broker handle is not connected")]
    BrokerNotConnected,

    #[error("at least one label must be specified")]
    NoLabels,

    #[error("{0}")]
    Construction(String),
}

pub type Result<T> = std::result::Result<T, Error>;
