//! capture.rs - Observes bytes written to an outbound body and keeps a bounded copy.
//!
//! `BodyCapture` wraps any `io::Write` sink. Writes are forwarded unchanged;
//! only the bytes the sink actually accepted are counted and copied. Once the
//! running total passes the limit the copy is discarded and only the count is
//! kept.
//!
//! License: MIT OR APACHE 2.0

use std::io::{self, Write};

use serde_json::Value;

/// Default capture limit in bytes.
pub const DEFAULT_LIMIT: usize = 1024 * 1024;

#[derive(Debug)]
pub struct BodyCapture<W: Write> {
    inner: W,
    limit: usize,
    logged_bytes: usize,
    body: Option<Vec<u8>>,
    overflowed: bool,
}

impl<W: Write> BodyCapture<W> {
    pub fn new(inner: W) -> Self {
        Self::with_limit(inner, DEFAULT_LIMIT)
    }

    pub fn with_limit(inner: W, limit: usize) -> Self {
        Self { inner, limit, logged_bytes: 0, body: None, overflowed: false }
    }

    /// Writes a text chunk.
    pub fn write_str(&mut self, chunk: &str) -> io::Result<()> {
        self.write_all(chunk.as_bytes())
    }

    /// Writes `value` as JSON text.
    pub fn write_json(&mut self, value: &Value) -> io::Result<()> {
        let encoded = serde_json::to_vec(value)?;
        self.write_all(&encoded)
    }

    /// Writes an optional final chunk and flushes the sink.
    pub fn end(&mut self, chunk: Option<&[u8]>) -> io::Result<()> {
        if let Some(chunk) = chunk {
            self.write_all(chunk)?;
        }
        self.flush()
    }

    /// The captured body, or an overflow marker carrying the byte count.
    pub fn logged(&self) -> String {
        if self.overflowed {
            return format!("{{\"overflowed: {}\"}}", self.logged_bytes);
        }
        self.body.as_deref().map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default()
    }

    pub fn logged_bytes(&self) -> usize {
        self.logged_bytes
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn observe(&mut self, accepted: &[u8]) {
        self.logged_bytes += accepted.len();
        if self.overflowed {
            return;
        }
        if self.logged_bytes > self.limit {
            self.overflowed = true;
            self.body = None;
        } else {
            self.body.get_or_insert_with(Vec::new).extend_from_slice(accepted);
        }
    }
}

impl<W: Write> Write for BodyCapture<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.observe(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_and_captures() {
        let mut capture = BodyCapture::new(Vec::new());
        capture.write_str("hello ").unwrap();
        capture.write_all(b"world").unwrap();
        capture.end(None).unwrap();
        assert_eq!(capture.logged(), "hello world");
        assert_eq!(capture.get_ref(), b"hello world");
    }

    #[test]
    fn test_nothing_written() {
        let capture = BodyCapture::new(Vec::new());
        assert_eq!(capture.logged(), "");
        assert!(!capture.overflowed());
    }

    #[test]
    fn test_json_chunks() {
        let mut capture = BodyCapture::new(Vec::new());
        capture.write_json(&serde_json::json!({"a": [1, 2]})).unwrap();
        assert_eq!(capture.logged(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_exact_limit_then_overflow() {
        let mut capture = BodyCapture::with_limit(Vec::new(), 10);
        capture.write_str("0123456789").unwrap();
        assert!(!capture.overflowed());
        assert_eq!(capture.logged(), "0123456789");

        capture.end(Some(b"X")).unwrap();
        assert!(capture.overflowed());
        assert_eq!(capture.logged(), "{\"overflowed: 11\"}");

        capture.write_str("more").unwrap();
        assert_eq!(capture.logged(), "{\"overflowed: 15\"}");
        assert_eq!(capture.into_inner(), b"0123456789Xmore");
    }

    #[test]
    fn test_multibyte_split_across_writes() {
        let mut capture = BodyCapture::new(Vec::new());
        let bytes = "héllo".as_bytes();
        capture.write_all(&bytes[..2]).unwrap();
        capture.write_all(&bytes[2..]).unwrap();
        assert_eq!(capture.logged(), "héllo");
    }
}
