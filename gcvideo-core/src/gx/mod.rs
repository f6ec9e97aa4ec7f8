// GX graphics processor front end
//
// Owns BP/XF register memory and the register state tracker, and executes
// decoded FIFO commands against them. Each draw rebuilds the constant blocks
// and records the shader variants it needs.

pub mod bitfield;
pub mod bp;
pub mod lighting;
pub mod tev;
pub mod xf;

use log::{debug, trace, warn};

use crate::config::VideoConfig;
use crate::error::{VideoError, VideoResult};
use crate::fifo::{Command, CommandProcessor, Primitive, VertexFormat};
use crate::shadergen::ShaderVariantKey;
use crate::tracker::{RegisterStateTracker, TrackerState};
use bp::{BpMemory, BP_REGISTER_COUNT};
use xf::{XfMemory, XF_MEMORY_SIZE};

/// A draw as seen by the backend: what to draw and which programs it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub primitive: Primitive,
    pub vat: u8,
    pub vertex_count: u16,
    pub pixel_key: ShaderVariantKey,
    pub vertex_key: ShaderVariantKey,
}

/// Command processor registers (vertex descriptors, array bases, ...).
pub const CP_REGISTER_COUNT: usize = 0x100;

#[derive(Debug)]
pub struct GxProcessor {
    config: VideoConfig,
    bp: BpMemory,
    xf: XfMemory,
    cp: [u32; CP_REGISTER_COUNT],
    tracker: RegisterStateTracker,
    commands: CommandProcessor,
    draws: Vec<DrawCall>,
}

impl GxProcessor {
    pub fn new(config: VideoConfig) -> Self {
        let tracker = RegisterStateTracker::new(&config);
        Self {
            config,
            bp: BpMemory::new(),
            xf: XfMemory::new(),
            cp: [0; CP_REGISTER_COUNT],
            tracker,
            commands: CommandProcessor::new(),
            draws: Vec::new(),
        }
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: VideoConfig) {
        self.tracker.apply_config(&config);
        self.config = config;
    }

    pub fn bp(&self) -> &BpMemory {
        &self.bp
    }

    pub fn xf(&self) -> &XfMemory {
        &self.xf
    }

    pub fn cp_register(&self, address: u8) -> u32 {
        self.cp[address as usize]
    }

    pub fn tracker(&self) -> &RegisterStateTracker {
        &self.tracker
    }

    /// For the values the tracker takes from outside register memory
    /// (texture sizes, depth slope).
    pub fn tracker_mut(&mut self) -> &mut RegisterStateTracker {
        &mut self.tracker
    }

    pub fn set_vertex_format(&mut self, vat: usize, format: VertexFormat) {
        self.commands.set_vertex_format(vat, format);
    }

    /// Current pixel shader key, from register state.
    pub fn current_key(&self) -> ShaderVariantKey {
        ShaderVariantKey::derive(&self.bp, &self.xf, &self.config)
    }

    pub fn load_bp(&mut self, address: u8, value: u32) {
        self.bp.load(address, value);
        if address != bp::addr::BP_MASK {
            self.tracker.on_bp_write(&self.bp, address);
        }
    }

    pub fn load_xf(&mut self, address: usize, values: &[u32]) {
        for (i, &value) in values.iter().enumerate() {
            let target = address + i;
            if self.xf.set(target, value) {
                self.tracker.on_xf_write(target);
            } else {
                warn!("XF write to 0x{:04X} is outside XF memory", target);
            }
        }
    }

    pub fn load_cp(&mut self, address: u8, value: u32) {
        self.cp[address as usize] = value;
    }

    /// Feed bytes read back from the FIFO and execute every complete command.
    /// Returns the number of commands executed.
    pub fn process(&mut self, bytes: &[u8]) -> usize {
        self.commands.push_bytes(bytes);
        let mut executed = 0;
        while let Some(command) = self.commands.next_command() {
            self.execute(command);
            executed += 1;
        }
        executed
    }

    pub fn execute(&mut self, command: Command) {
        match command {
            Command::Nop | Command::PerfMetric | Command::InvalidateVertexCache => {}
            Command::LoadCp { address, value } => self.load_cp(address, value),
            Command::LoadXf { address, values } => self.load_xf(address as usize, &values),
            Command::LoadIndexedXf { array, word } => {
                trace!("Indexed XF load from array {} (0x{:08X})", array, word);
            }
            Command::CallDisplayList { address, size } => {
                debug!(
                    "Display list call 0x{:08X} ({} bytes) is not followed",
                    address, size
                );
            }
            Command::LoadBp { address, value } => self.load_bp(address, value),
            Command::Draw {
                primitive,
                vat,
                vertex_count,
            } => self.draw(primitive, vat, vertex_count),
        }
    }

    /// Bring the constant blocks up to date and record the draw.
    pub fn draw(&mut self, primitive: Primitive, vat: u8, vertex_count: u16) {
        let format = self.commands.vertex_format(vat as usize);
        self.tracker.set_vertex_components(format.components);
        self.tracker.rebuild(&self.bp, &self.xf);

        let pixel_key = self.current_key();
        self.draws.push(DrawCall {
            primitive,
            vat,
            vertex_count,
            pixel_key,
            vertex_key: pixel_key.vertex_variant(),
        });
    }

    /// Draws recorded since the last `take_draw_list` or `reset`. The list
    /// is never trimmed on its own; the backend drains it once per batch.
    pub fn draw_list(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Hand the recorded draws to the caller and start a new list.
    pub fn take_draw_list(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    /// Back to power-on state. Vertex formats are kept.
    pub fn reset(&mut self) {
        self.bp = BpMemory::new();
        self.xf = XfMemory::new();
        self.cp = [0; CP_REGISTER_COUNT];
        self.tracker = RegisterStateTracker::new(&self.config);
        self.commands.reset();
        self.draws.clear();
    }

    pub fn save_tracker_state(&self) -> TrackerState {
        self.tracker.save_state()
    }

    /// Replace register memory and rebuild every constant group from it.
    pub fn restore_state(
        &mut self,
        bp_words: &[u32],
        xf_words: &[u32],
        tracker: &TrackerState,
    ) -> VideoResult<()> {
        if !self.bp.restore(bp_words) {
            return Err(VideoError::RegisterMemoryLength {
                memory: "BP",
                expected: BP_REGISTER_COUNT,
                actual: bp_words.len(),
            });
        }
        if !self.xf.restore(xf_words) {
            return Err(VideoError::RegisterMemoryLength {
                memory: "XF",
                expected: XF_MEMORY_SIZE,
                actual: xf_words.len(),
            });
        }
        self.tracker.restore_state(tracker, &self.bp, &self.xf);
        self.commands.reset();
        Ok(())
    }
}

impl Default for GxProcessor {
    fn default() -> Self {
        Self::new(VideoConfig::default())
    }
}
