/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Minimal SMTP sink (spec.md §4.7 "Email (SMTP)", §6 "SMTP"). Speaks the
//! dialog directly over a `TcpStream` rather than through a mail-sending
//! crate, per spec.

use super::{impl_handler_core, write_to_stream, HandlerCore, HandlerKind, Streamable};
use crate::error::{Error, Result};
use crate::level::Level;
use crate::record::Record;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Mutex;
use std::time::{Duration, Instant};

fn looks_like_email(addr: &str) -> bool {
    let parts: Vec<&str> = addr.splitn(2, '@').collect();
    parts.len() == 2
        && !parts[0].is_empty()
        && parts[1].contains('.')
        && !addr.chars().any(char::is_whitespace)
}

/// Builder for `EmailHandler`, validated at `build()`.
pub struct EmailHandlerBuilder {
    host: String,
    port: u16,
    from: String,
    to: Vec<String>,
    use_starttls: bool,
    auth: Option<(String, String)>,
    html: bool,
    rate_limit_seconds: u64,
    min_level: Level,
}

impl EmailHandlerBuilder {
    pub fn new(host: impl Into<String>, port: u16, from: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            from: from.into(),
            to: Vec::new(),
            use_starttls: false,
            auth: None,
            html: false,
            rate_limit_seconds: 0,
            min_level: Level::Error,
        }
    }

    pub fn to(mut self, addr: impl Into<String>) -> Self {
        self.to.push(addr.into());
        self
    }

    pub fn starttls(mut self, enabled: bool) -> Self {
        self.use_starttls = enabled;
        self
    }

    pub fn auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.auth = Some((user.into(), pass.into()));
        self
    }

    pub fn html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    pub fn rate_limit_seconds(mut self, secs: u64) -> Self {
        self.rate_limit_seconds = secs;
        self
    }

    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn build(self) -> Result<EmailHandler> {
        if !looks_like_email(&self.from) {
            return Err(Error::InvalidEmail(self.from));
        }
        if self.to.is_empty() {
            return Err(Error::InvalidEmail(String::new()));
        }
        for addr in &self.to {
            if !looks_like_email(addr) {
                return Err(Error::InvalidEmail(addr.clone()));
            }
        }
        Ok(EmailHandler {
            core: HandlerCore::new(self.min_level),
            host: self.host,
            port: self.port,
            from: self.from,
            to: self.to,
            use_starttls: self.use_starttls,
            auth: self.auth,
            html: self.html,
            rate_limit_seconds: self.rate_limit_seconds,
            last_sent: Mutex::new(None),
            stream: Mutex::new(None),
        })
    }
}

pub struct EmailHandler {
    core: HandlerCore,
    host: String,
    port: u16,
    from: String,
    to: Vec<String>,
    use_starttls: bool,
    auth: Option<(String, String)>,
    html: bool,
    rate_limit_seconds: u64,
    last_sent: Mutex<Option<Instant>>,
    stream: Mutex<Option<Box<dyn Write + Send>>>,
}

impl EmailHandler {
    pub fn builder(host: impl Into<String>, port: u16, from: impl Into<String>) -> EmailHandlerBuilder {
        EmailHandlerBuilder::new(host, port, from)
    }

    fn rate_limited(&self) -> bool {
        if self.rate_limit_seconds == 0 {
            return false;
        }
        let mut last = self.last_sent.lock().expect("last_sent lock poisoned");
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < Duration::from_secs(self.rate_limit_seconds) {
                return true;
            }
        }
        *last = Some(now);
        false
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

        if self.rate_limited() {
            return None;
        }

        match self.send_smtp(record, &payload) {
            Ok(()) => Some(payload),
            Err(e) => {
                eprintln!("(Email) Failed to send log notification to {:?}: {}", self.to, e);
                None
            }
        }
    }

    fn send_smtp(&self, record: &Record, body: &str) -> std::io::Result<()> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))?;
        let mut reader = BufReader::new(stream.try_clone()?);

        expect_response(&mut reader, 220)?;
        send_line(&mut stream, "EHLO logmux")?;
        expect_response(&mut reader, 250)?;

        if self.use_starttls {
            send_line(&mut stream, "STARTTLS")?;
            expect_response(&mut reader, 220)?;
            // The TLS handshake itself is out of scope (spec.md §1 Out of
            // scope: "TLS ... below the HTTP transport's retry layer");
            // callers that need STARTTLS in production should terminate TLS
            // in front of this handler (e.g. stunnel) or supply a
            // pre-negotiated stream via `set_stream`.
            send_line(&mut stream, "EHLO logmux")?;
            expect_response(&mut reader, 250)?;
        }

        if let Some((user, pass)) = &self.auth {
            send_line(&mut stream, "AUTH LOGIN")?;
            expect_response(&mut reader, 334)?;
            send_line(&mut stream, &STANDARD.encode(user))?;
            expect_response(&mut reader, 334)?;
            send_line(&mut stream, &STANDARD.encode(pass))?;
            expect_response(&mut reader, 235)?;
        }

        send_line(&mut stream, &format!("MAIL FROM:<{}>", self.from))?;
        expect_response(&mut reader, 250)?;
        for rcpt in &self.to {
            send_line(&mut stream, &format!("RCPT TO:<{}>", rcpt))?;
            expect_response(&mut reader, 250)?;
        }

        send_line(&mut stream, "DATA")?;
        expect_response(&mut reader, 354)?;

        let date = chrono::Utc::now().to_rfc2822();
        let content_type = if self.html { "text/html" } else { "text/plain" };
        let subject = format!("[logmux] {} {}", record.level, record.context);
        send_line(&mut stream, &format!("From: {}", self.from))?;
        send_line(&mut stream, &format!("To: {}", self.to.join(", ")))?;
        send_line(&mut stream, &format!("Subject: {}", subject))?;
        send_line(&mut stream, &format!("Date: {}", date))?;
        send_line(&mut stream, &format!("Content-Type: {}; charset=utf-8", content_type))?;
        send_line(&mut stream, "Content-Transfer-Encoding: 8bit")?;
        send_line(&mut stream, "")?;
        send_line(&mut stream, body)?;
        send_line(&mut stream, ".")?;
        expect_response(&mut reader, 250)?;

        send_line(&mut stream, "QUIT")?;
        expect_response(&mut reader, 221)?;
        Ok(())
    }
}

fn send_line(stream: &mut TcpStream, line: &str) -> std::io::Result<()> {
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\r\n")
}

/// Reads one SMTP response, handling multi-line replies (a line whose 4th
/// byte is `-` continues), and checks its status code against `expected`.
fn expect_response(reader: &mut BufReader<TcpStream>, expected: u16) -> std::io::Result<()> {
    let mut last_code = 0u16;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "smtp connection closed"));
        }
        let bytes = line.as_bytes();
        if bytes.len() < 3 {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "short smtp response"));
        }
        last_code = std::str::from_utf8(&bytes[..3])
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let continues = bytes.get(3) == Some(&b'-');
        if !continues {
            break;
        }
    }
    if last_code == expected {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("expected SMTP {} but got {}", expected, last_code),
        ))
    }
}

impl Streamable for EmailHandler {
    fn set_stream(&self, stream: Option<Box<dyn Write + Send>>) {
        *self.stream.lock().expect("stream lock poisoned") = stream;
    }
}

impl_handler_core!(EmailHandler, HandlerKind::Email);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_addresses() {
        assert!(EmailHandler::builder("smtp.example.com", 25, "not-an-email").to("ok@example.com").build().is_err());
        assert!(EmailHandler::builder("smtp.example.com", 25, "from@example.com").build().is_err());
    }

    #[test]
    fn accepts_well_formed_addresses() {
        let handler =
            EmailHandler::builder("smtp.example.com", 25, "from@example.com").to("to@example.com").build();
        assert!(handler.is_ok());
    }
}
