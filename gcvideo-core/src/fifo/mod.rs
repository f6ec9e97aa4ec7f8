// CPU to GPU command transport
//
// The CPU writes command bytes into the gather pipe, which bursts them in
// 32-byte chunks into a FIFO window in main memory. The command processor
// reads that window back and decodes the GX command stream.

pub mod command;
pub mod gather_pipe;

pub use command::{Command, CommandProcessor, Primitive, VertexFormat};
pub use gather_pipe::{GatherPipe, GATHER_PIPE_CAPACITY, GATHER_PIPE_SIZE};

use log::{trace, warn};

/// Receives full gather-pipe chunks.
pub trait BurstSink {
    fn burst(&mut self, chunk: &[u8]);
}

/// Callback fired once per chunk written into the FIFO, with the address the
/// chunk landed at.
pub type BurstCallback = Box<dyn FnMut(u32) + Send>;

/// The CPU's view of the GPU FIFO: a ring of 32-byte slots inside `memory`.
///
/// `end` is inclusive: it is the address of the last slot, and the write
/// pointer wraps to `base` after writing there.
pub struct CpuFifo<M> {
    memory: M,
    base: u32,
    end: u32,
    write_pointer: u32,
    read_pointer: u32,
    /// Bytes written but not yet read back.
    distance: u32,
    bursts: u64,
    overruns: u64,
    on_burst: Option<BurstCallback>,
}

impl<M> CpuFifo<M>
where
    M: AsRef<[u8]> + AsMut<[u8]>,
{
    pub fn new(memory: M, base: u32, end: u32) -> Self {
        Self {
            memory,
            base,
            end,
            write_pointer: base,
            read_pointer: base,
            distance: 0,
            bursts: 0,
            overruns: 0,
            on_burst: None,
        }
    }

    pub fn set_burst_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u32) + Send + 'static,
    {
        self.on_burst = Some(Box::new(callback));
    }

    /// Move the window. Both pointers reset to `base`.
    pub fn set_bounds(&mut self, base: u32, end: u32) {
        self.base = base;
        self.end = end;
        self.write_pointer = base;
        self.read_pointer = base;
        self.distance = 0;
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn write_pointer(&self) -> u32 {
        self.write_pointer
    }

    pub fn read_pointer(&self) -> u32 {
        self.read_pointer
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    /// Total chunks received since creation.
    pub fn bursts(&self) -> u64 {
        self.bursts
    }

    /// Times the writer lapped unread data.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Bytes the ring holds, `base..=end` in 32-byte slots.
    pub fn capacity(&self) -> u32 {
        self.end.saturating_sub(self.base) + GATHER_PIPE_SIZE as u32
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_ref()
    }

    pub fn into_memory(self) -> M {
        self.memory
    }

    fn advance(&self, pointer: u32) -> u32 {
        if pointer >= self.end {
            self.base
        } else {
            pointer + GATHER_PIPE_SIZE as u32
        }
    }

    /// Copy everything between the read and write pointers out of the ring.
    pub fn read_pending(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.distance as usize);
        while self.distance >= GATHER_PIPE_SIZE as u32 {
            let start = self.read_pointer as usize;
            match self.memory.as_ref().get(start..start + GATHER_PIPE_SIZE) {
                Some(chunk) => out.extend_from_slice(chunk),
                None => warn!("FIFO read at 0x{:08X} is outside memory", self.read_pointer),
            }
            self.read_pointer = self.advance(self.read_pointer);
            self.distance -= GATHER_PIPE_SIZE as u32;
        }
        out
    }
}

impl<M> BurstSink for CpuFifo<M>
where
    M: AsRef<[u8]> + AsMut<[u8]>,
{
    fn burst(&mut self, chunk: &[u8]) {
        let address = self.write_pointer;
        let start = address as usize;
        match self.memory.as_mut().get_mut(start..start + chunk.len()) {
            Some(dst) => dst.copy_from_slice(chunk),
            None => warn!("FIFO write at 0x{:08X} is outside memory", address),
        }
        trace!("Gather pipe burst to 0x{:08X}", address);

        self.write_pointer = self.advance(address);
        self.distance = self.distance.saturating_add(chunk.len() as u32);
        let capacity = self.capacity();
        if self.distance > capacity {
            // The oldest unread slot was just overwritten; the next oldest
            // sits at the write pointer.
            warn!(
                "FIFO write at 0x{:08X} overran the reader ({} bytes pending, {} byte ring)",
                address, self.distance, capacity
            );
            self.overruns += 1;
            self.distance = capacity;
            self.read_pointer = self.write_pointer;
        }
        self.bursts += 1;
        if let Some(callback) = self.on_burst.as_mut() {
            callback(address);
        }
    }
}

impl<M> std::fmt::Debug for CpuFifo<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuFifo")
            .field("base", &self.base)
            .field("end", &self.end)
            .field("write_pointer", &self.write_pointer)
            .field("read_pointer", &self.read_pointer)
            .field("distance", &self.distance)
            .field("overruns", &self.overruns)
            .finish()
    }
}
