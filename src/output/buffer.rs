// Wed Jan 14 2026 - Alex

use bytes::{BufMut, Bytes, BytesMut};
use std::io;

#[derive(Debug, Default)]
pub struct ShardBuffer {
    bytes: BytesMut,
}

impl ShardBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
        }
    }

    pub fn push_bytes(&mut self, data: &[u8]) {
        self.bytes.put_slice(data);
    }

    pub fn push_str(&mut self, s: &str) {
        self.bytes.put_slice(s.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn freeze(self) -> Bytes {
        self.bytes.freeze()
    }
}

impl io::Write for ShardBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Write for ShardBuffer {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.push_str(s);
        Ok(())
    }
}
