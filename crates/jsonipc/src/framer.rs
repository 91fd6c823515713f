//! Newline-delimited framing of inbound bytes.
//!
//! The framer buffers bytes across reads and yields every complete document
//! once its terminating newline has arrived. Each line is parsed on its own,
//! so a malformed line never poisons its neighbours.

use serde_json::Value;

use crate::error::FramingError;

const NEWLINE: u8 = b'\n';

/// Accumulates inbound bytes and splits them into JSON documents.
#[derive(Debug)]
pub struct Framer {
    buffer: Vec<u8>,
    max_frame_bytes: usize,
    discarding: bool,
}

impl Framer {
    /// Creates a framer that buffers at most `max_frame_bytes` of a partial
    /// document.
    #[must_use]
    pub const fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_bytes,
            discarding: false,
        }
    }

    /// Number of bytes held back waiting for a newline.
    #[must_use]
    pub const fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends `bytes` and returns every document completed by them, in order.
    ///
    /// Blank lines are skipped. A line that is not valid JSON yields a
    /// [`FramingError::Decode`] in its position without affecting the rest.
    /// When the partial tail outgrows the limit it is dropped, a
    /// [`FramingError::Oversized`] is reported, and input is ignored up to the
    /// next newline.
    ///
    /// Lines completed by this call are returned even when a partial document
    /// follows them in the same chunk; only the unterminated tail is held
    /// back. Document order is unchanged.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Value, FramingError>> {
        let mut frames = Vec::new();
        let Some(input) = self.skip_discarded(bytes) else {
            return frames;
        };

        self.buffer.extend_from_slice(input);
        if let Some(last) = self.buffer.iter().rposition(|byte| *byte == NEWLINE) {
            let tail = self.buffer.split_off(last + 1);
            let complete = std::mem::replace(&mut self.buffer, tail);
            frames.extend(
                complete
                    .split(|byte| *byte == NEWLINE)
                    .filter(|part| !part.iter().all(u8::is_ascii_whitespace))
                    .map(decode),
            );
        }

        if self.buffer.len() > self.max_frame_bytes {
            self.buffer.clear();
            self.discarding = true;
            frames.push(Err(FramingError::Oversized {
                limit: self.max_frame_bytes,
            }));
        }

        frames
    }

    fn skip_discarded<'a>(&mut self, bytes: &'a [u8]) -> Option<&'a [u8]> {
        if !self.discarding {
            return Some(bytes);
        }
        let position = bytes.iter().position(|byte| *byte == NEWLINE)?;
        self.discarding = false;
        Some(bytes.get(position + 1..).unwrap_or_default())
    }
}

fn decode(line: &[u8]) -> Result<Value, FramingError> {
    serde_json::from_slice(line).map_err(|source| FramingError::Decode { source })
}
