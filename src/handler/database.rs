/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Relational database sink (spec.md §4.7 "Database", §6 "Database
//! schema"). Grounded on `Cyannide-db_logger`'s use of `sqlx` (here an
//! `AnyPool` so one handler works across Postgres/SQLite/MySQL) bridged onto
//! a private `tokio` runtime so `invoke` stays synchronous, matching the
//! single-threaded cooperative dispatch model (spec.md §5).

use super::{impl_handler_core, write_to_stream, HandlerCore, HandlerKind};
use crate::error::{Error, Result};
use crate::level::Level;
use crate::record::Record;
use serde_json::Value;
use sqlx::any::{AnyKind, AnyPool};
use sqlx::Row;
use std::io::Write;
use std::sync::Mutex;

/// The per-driver identifier-quoting dialect (spec.md §4.7 "Identifier
/// quoting is per driver").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Postgres,
    Sqlite,
}

impl SqlDialect {
    fn quote_char(self) -> char {
        match self {
            SqlDialect::MySql => '`',
            SqlDialect::Postgres | SqlDialect::Sqlite => '"',
        }
    }

    fn quote(self, ident: &str) -> String {
        let q = self.quote_char();
        format!("{}{}{}", q, ident.replace(q, &format!("{}{}", q, q)), q)
    }
}

/// An already-constructed, already-connected database connection pool
/// (spec.md §1 "Out of scope: concrete broker/database client libraries,
/// the core consumes an already-constructed producer/connection").
pub struct DatabaseConnection {
    pool: AnyPool,
    rt: tokio::runtime::Runtime,
}

impl DatabaseConnection {
    pub fn new(pool: AnyPool) -> Result<Self> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| Error::Construction(format!("failed to start runtime: {e}")))?;
        Ok(Self { pool, rt })
    }
}

pub struct DatabaseHandler {
    core: HandlerCore,
    table: String,
    conn: DatabaseConnection,
    dialect: Mutex<Option<SqlDialect>>,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
}

impl DatabaseHandler {
    pub fn new(conn: DatabaseConnection, table: impl Into<String>, min_level: Level) -> Self {
        Self {
            core: HandlerCore::new(min_level),
            table: table.into(),
            conn,
            dialect: Mutex::new(None),
            stream: Mutex::new(None),
        }
    }

    /// Detects and caches the quoting dialect from the pool's driver
    /// (spec.md §4.7 "The quote character is detected once on first use and
    /// cached").
    fn dialect(&self) -> SqlDialect {
        let mut guard = self.dialect.lock().expect("dialect lock poisoned");
        if let Some(d) = *guard {
            return d;
        }
        let d = match self.conn.pool.any_kind() {
            AnyKind::MySql => SqlDialect::MySql,
            AnyKind::Postgres => SqlDialect::Postgres,
            AnyKind::Sqlite => SqlDialect::Sqlite,
        };
        *guard = Some(d);
        d
    }

    fn insert(&self, record: &Record) -> sqlx::Result<()> {
        let dialect = self.dialect();

        let mut columns = vec!["context".to_owned(), "level".to_owned(), "message".to_owned(), "data".to_owned()];
        for key in record.root.keys() {
            columns.push(key.clone());
        }

        let quoted_table = dialect.quote(&self.table);
        let quoted_columns: Vec<String> = columns.iter().map(|c| dialect.quote(c)).collect();
        let placeholders: Vec<String> = columns.iter().map(|_| "?".to_owned()).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted_table,
            quoted_columns.join(", "),
            placeholders.join(", ")
        );

        let data_json = serde_json::to_string(&Value::Object(record.data.clone()))
            .unwrap_or_else(|_| "{}".to_owned());

        let mut query = sqlx::query(&sql)
            .bind(record.context.clone())
            .bind(record.level.name().to_owned())
            .bind(record.message.clone())
            .bind(data_json);
        for key in record.root.keys() {
            let rendered = match record.root.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
                None => String::new(),
            };
            query = query.bind(rendered);
        }

        self.conn.rt.block_on(async { query.execute(&self.conn.pool).await.map(|_| ()) })
    }

    fn invoke_impl(&self, record: &Record) -> Option<String> {
        if !self.core.responsible(record.level) {
            return None;
        }
        let payload = self.core.format(record);

        let mut guard = self.stream.lock().expect("stream lock poisoned");
        if let Some(stream) = guard.as_mut() {
            return write_to_stream(stream.as_mut(), &payload);
        }
        drop(guard);

        match self.insert(record) {
            Ok(()) => Some(payload),
            Err(e) => {
                eprintln!("(Database) Failed to insert log entry into {:?}: {}", self.table, e);
                None
            }
        }
    }
}

impl super::Streamable for DatabaseHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl_handler_core!(DatabaseHandler, HandlerKind::Database);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers_per_dialect() {
        assert_eq!(SqlDialect::MySql.quote("logs"), "`logs`");
        assert_eq!(SqlDialect::Postgres.quote("logs"), "\"logs\"");
        assert_eq!(SqlDialect::Sqlite.quote("my\"col"), "\"my\"\"col\"");
    }
}
