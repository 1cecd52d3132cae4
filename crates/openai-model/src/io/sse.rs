use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only the `data` field is surfaced. Comment lines are skipped, and so
/// are the `event`, `id` and `retry` fields, which chat completion
/// servers don't rely on.
pub struct Sse {
    // Raw bytes with CRLF folded to LF. Only complete events are decoded,
    // so a character split across chunks is never seen half way.
    buf: Vec<u8>,
    // A trailing `\r` whose `\n` may still be in the next chunk.
    pending_cr: bool,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            pending_cr: false,
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain what is already buffered before reading more.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }
            if self.exhausted {
                return Ok(None);
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.push_bytes(&bytes),
                None => {
                    if self.pending_cr {
                        self.buf.push(b'\r');
                        self.pending_cr = false;
                    }
                    self.exhausted = true;
                }
            }
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.reserve(bytes.len());
        for &byte in bytes {
            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    self.buf.push(b'\n');
                    continue;
                }
                self.buf.push(b'\r');
            }
            if byte == b'\r' {
                self.pending_cr = true;
            } else {
                self.buf.push(byte);
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        while let Some(eol_idx) =
            self.buf.windows(2).position(|w| w == b"\n\n")
        {
            let Ok(event) = str::from_utf8(&self.buf[0..eol_idx]) else {
                return Err(Error::InvalidPayload);
            };
            let mut data: Option<String> = None;
            for line in event.lines() {
                if line.starts_with(':') {
                    continue;
                }
                let Some((name, value)) = line.split_once(':') else {
                    return Err(Error::InvalidPayload);
                };
                let value = value.strip_prefix(' ').unwrap_or(value);
                match name {
                    "data" => {
                        let data = data.get_or_insert_default();
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(value);
                    }
                    "event" | "id" | "retry" => {}
                    _ => return Err(Error::InvalidPayload),
                }
            }

            // Consume the bytes from the buffer.
            self.buf.drain(0..eol_idx + 2);

            if data.is_some() {
                return Ok(data);
            }
        }
        Ok(None)
    }
}
