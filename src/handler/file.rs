/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Append-only file sink (spec.md §4.7 "File").

use super::{impl_handler_core, write_to_stream, HandlerCore, HandlerKind, Streamable};
use crate::error::{Error, Result};
use crate::level::Level;
use crate::record::Record;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Writes each responsible record as one line to a file opened lazily, in
/// append mode, on the first accepted record. Owns the file handle; it is
/// closed on drop. Construction fails if the parent directory doesn't exist
/// (spec.md §4.7 "File").
pub struct FileHandler {
    core: HandlerCore,
    path: PathBuf,
    file: Mutex<Option<std::fs::File>>,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
}

impl FileHandler {
    pub fn new(path: impl AsRef<Path>, min_level: Level) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(Error::MissingParentDir(parent.to_path_buf()));
            }
        }
        Ok(Self {
            core: HandlerCore::new(min_level),
            path,
            file: Mutex::new(None),
            stream: Mutex::new(None),
        })
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.core.responsible(record.level) {
            return None;
        }
        let payload = self.core.format(record);

        let mut stream_guard = self.stream.lock().expect("stream lock poisoned");
        if let Some(stream) = stream_guard.as_mut() {
            return write_to_stream(stream.as_mut(), &payload);
        }
        drop(stream_guard);

        let mut file_guard = self.file.lock().expect("file lock poisoned");
        if file_guard.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(f) => *file_guard = Some(f),
                Err(_) => return None,
            }
        }
        let file = file_guard.as_mut().expect("file opened above");
        write_to_stream(file, &payload)
    }
}

impl Streamable for FileHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl_handler_core!(FileHandler, HandlerKind::File);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::Formatter;
    use crate::handler::Handler;
    use serde_json::Map;

    fn rec(level: Level, msg: &str) -> Record {
        Record { context: "svc".into(), level, message: msg.into(), root: Map::new(), data: Map::new() }
    }

    #[test]
    fn fails_construction_without_parent_dir() {
        let err = FileHandler::new("/no/such/parent/dir/app.log", Level::Debug);
        assert!(err.is_err());
    }

    #[test]
    fn appends_lines_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let handler = FileHandler::new(&path, Level::Info).unwrap();
        assert!(!path.exists());

        assert!(handler.invoke(&rec(Level::Debug, "dropped")).is_none());
        assert!(!path.exists());

        assert!(handler.invoke(&rec(Level::Info, "kept")).is_some());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("kept"));
        assert!(!contents.contains("dropped"));
    }

    #[test]
    fn stream_override_bypasses_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let handler = FileHandler::new(&path, Level::Info).unwrap();
        let buf: Vec<u8> = Vec::new();
        handler.set_stream(Some(Box::new(buf)));
        handler.invoke(&rec(Level::Error, "to buffer"));
        assert!(!path.exists());
    }

    #[test]
    fn default_formatter_is_line_formatter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let handler = FileHandler::new(&path, Level::Debug).unwrap();
        let payload = handler.invoke(&rec(Level::Info, "hi")).unwrap();
        assert_eq!(
            payload,
            crate::formatter::LineFormatter.format(&rec(Level::Info, "hi"))
        );
    }
}
