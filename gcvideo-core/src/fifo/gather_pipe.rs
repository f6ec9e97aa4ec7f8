// Write-gathering pipe
//
// CPU stores to the GX FIFO address are collected here and handed to a
// `BurstSink` in 32-byte chunks. Values are stored big-endian, the byte
// order the command processor reads.

use log::trace;

use super::BurstSink;
use crate::error::{VideoError, VideoResult};

/// Burst size of the gather pipe.
pub const GATHER_PIPE_SIZE: usize = 32;

/// Backing storage, with slack past one burst so large writes never overflow.
pub const GATHER_PIPE_CAPACITY: usize = GATHER_PIPE_SIZE * 128;

#[derive(Clone)]
pub struct GatherPipe {
    buffer: Box<[u8]>,
    count: usize,
}

impl GatherPipe {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; GATHER_PIPE_CAPACITY].into_boxed_slice(),
            count: 0,
        }
    }

    /// Bytes waiting for a full chunk.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Pending bytes, oldest first.
    pub fn pending(&self) -> &[u8] {
        &self.buffer[..self.count]
    }

    /// Drop pending bytes without flushing them.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn write_u8(&mut self, value: u8, sink: &mut impl BurstSink) {
        self.write_bytes(&[value], sink);
    }

    pub fn write_u16(&mut self, value: u16, sink: &mut impl BurstSink) {
        self.write_bytes(&value.to_be_bytes(), sink);
    }

    pub fn write_u32(&mut self, value: u32, sink: &mut impl BurstSink) {
        self.write_bytes(&value.to_be_bytes(), sink);
    }

    pub fn write_u64(&mut self, value: u64, sink: &mut impl BurstSink) {
        self.write_bytes(&value.to_be_bytes(), sink);
    }

    pub fn write_f32(&mut self, value: f32, sink: &mut impl BurstSink) {
        self.write_u32(value.to_bits(), sink);
    }

    /// Append `data` and flush if a full chunk is ready. Writes larger than
    /// the free space flush as they go.
    pub fn write_bytes(&mut self, mut data: &[u8], sink: &mut impl BurstSink) {
        while !data.is_empty() {
            if self.count == GATHER_PIPE_CAPACITY {
                self.flush(sink);
            }
            let n = (GATHER_PIPE_CAPACITY - self.count).min(data.len());
            self.buffer[self.count..self.count + n].copy_from_slice(&data[..n]);
            self.count += n;
            data = &data[n..];
        }
        if self.count >= GATHER_PIPE_SIZE {
            self.flush(sink);
        }
    }

    /// Hand every complete chunk to `sink` and move the remainder to the front.
    pub fn flush(&mut self, sink: &mut impl BurstSink) {
        let mut processed = 0;
        while self.count - processed >= GATHER_PIPE_SIZE {
            sink.burst(&self.buffer[processed..processed + GATHER_PIPE_SIZE]);
            processed += GATHER_PIPE_SIZE;
        }
        if processed == 0 {
            return;
        }

        self.buffer.copy_within(processed..self.count, 0);
        self.count -= processed;
        trace!(
            "Gather pipe flushed {} chunks, {} bytes left",
            processed / GATHER_PIPE_SIZE,
            self.count
        );
    }

    /// The whole backing buffer, for save states.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn restore(&mut self, bytes: &[u8], count: usize) -> VideoResult<()> {
        if bytes.len() != GATHER_PIPE_CAPACITY {
            return Err(VideoError::RegisterMemoryLength {
                memory: "gather pipe",
                expected: GATHER_PIPE_CAPACITY,
                actual: bytes.len(),
            });
        }
        if count > GATHER_PIPE_CAPACITY {
            return Err(VideoError::GatherPipeOverrun {
                count,
                capacity: GATHER_PIPE_CAPACITY,
            });
        }
        self.buffer.copy_from_slice(bytes);
        self.count = count;
        Ok(())
    }
}

impl Default for GatherPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatherPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatherPipe")
            .field("count", &self.count)
            .finish()
    }
}
