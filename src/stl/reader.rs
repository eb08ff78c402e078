//! Byte-level tokenizer over a buffered reader.

use std::io::{self, BufRead};

/// Whitespace as understood by the C locale `isspace`.
#[inline]
pub(crate) fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Reads whitespace-delimited tokens without copying the stream into memory.
pub(crate) struct StlReader<R> {
    inner: R,
    token: Vec<u8>,
}

impl<R: BufRead> StlReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            token: Vec::with_capacity(32),
        }
    }

    pub(crate) fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub(crate) fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.inner.fill_buf()?.first().copied())
    }

    pub(crate) fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.inner.fill_buf()?.first().copied();
        if byte.is_some() {
            self.inner.consume(1);
        }
        Ok(byte)
    }

    /// Skip at most `limit` whitespace bytes, returning how many were skipped.
    pub(crate) fn skip_whitespace(&mut self, limit: usize) -> io::Result<usize> {
        let mut skipped = 0;
        while skipped < limit {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let window = &buf[..buf.len().min(limit - skipped)];
            let n = window.iter().position(|&b| !is_space(b)).unwrap_or(window.len());
            let stop = n < window.len();
            self.inner.consume(n);
            skipped += n;
            if stop {
                break;
            }
        }
        Ok(skipped)
    }

    /// Consume everything up to and including the next newline.
    pub(crate) fn skip_line(&mut self) -> io::Result<()> {
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(n) => {
                    self.inner.consume(n + 1);
                    return Ok(());
                }
                None => {
                    let len = buf.len();
                    self.inner.consume(len);
                }
            }
        }
    }

    /// Read the next token. An empty slice means the stream is exhausted.
    pub(crate) fn token(&mut self) -> io::Result<&[u8]> {
        self.skip_whitespace(usize::MAX)?;
        self.token.clear();

        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let n = buf.iter().position(|&b| is_space(b)).unwrap_or(buf.len());
            self.token.extend_from_slice(&buf[..n]);
            let stop = n < buf.len();
            self.inner.consume(n);
            if stop {
                break;
            }
        }

        Ok(&self.token)
    }
}
