// Wed Jan 14 2026 - Alex

use std::io::{self, Write};

pub trait OutputSink {
    fn append(&mut self, shard: usize, data: &[u8]) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn append(&mut self, shard: usize, data: &[u8]) -> io::Result<()> {
        (**self).append(shard, data)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn append(&mut self, shard: usize, data: &[u8]) -> io::Result<()> {
        (**self).append(shard, data)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

pub struct WriterSink<W: Write> {
    writer: W,
    bytes_written: u64,
    segments: usize,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
            segments: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn append(&mut self, _shard: usize, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.bytes_written += data.len() as u64;
        self.segments += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    data: Vec<u8>,
    order: Vec<usize>,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl OutputSink for MemorySink {
    fn append(&mut self, shard: usize, data: &[u8]) -> io::Result<()> {
        self.data.extend_from_slice(data);
        self.order.push(shard);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn append(&mut self, _shard: usize, _data: &[u8]) -> io::Result<()> {
        Ok(())
    }
}
