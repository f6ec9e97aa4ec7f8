// Video save states
//
// A snapshot holds raw register memory and the gather pipe, plus the pixel
// constant block and the two pending fog-range / viewport flags. Derived
// constants are never trusted on restore: every group is rebuilt from the
// restored registers.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::PixelConstants;
use crate::error::{VideoError, VideoResult};
use crate::fifo::{GatherPipe, GATHER_PIPE_CAPACITY};
use crate::gx::bp::BP_REGISTER_COUNT;
use crate::gx::xf::XF_MEMORY_SIZE;
use crate::gx::GxProcessor;
use crate::tracker::TrackerState;

/// Serialized in field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSnapshot {
    pub bp: Vec<u32>,
    pub xf: Vec<u32>,
    pub gather_pipe: Vec<u8>,
    pub gather_pipe_count: u32,
    pub pixel: PixelConstants,
    pub fog_range_changed: bool,
    pub viewport_changed: bool,
}

impl VideoSnapshot {
    pub fn capture(gx: &GxProcessor, pipe: &GatherPipe) -> Self {
        let tracker = gx.save_tracker_state();
        Self {
            bp: gx.bp().as_slice().to_vec(),
            xf: gx.xf().as_slice().to_vec(),
            gather_pipe: pipe.as_bytes().to_vec(),
            gather_pipe_count: pipe.count() as u32,
            pixel: tracker.pixel,
            fog_range_changed: tracker.fog_range_changed,
            viewport_changed: tracker.viewport_changed,
        }
    }

    /// Check the snapshot shape without touching any state.
    pub fn validate(&self) -> VideoResult<()> {
        let lengths = [
            ("BP", BP_REGISTER_COUNT, self.bp.len()),
            ("XF", XF_MEMORY_SIZE, self.xf.len()),
            ("gather pipe", GATHER_PIPE_CAPACITY, self.gather_pipe.len()),
        ];
        for (memory, expected, actual) in lengths {
            if expected != actual {
                return Err(VideoError::RegisterMemoryLength {
                    memory,
                    expected,
                    actual,
                });
            }
        }
        if self.gather_pipe_count as usize > GATHER_PIPE_CAPACITY {
            return Err(VideoError::GatherPipeOverrun {
                count: self.gather_pipe_count as usize,
                capacity: GATHER_PIPE_CAPACITY,
            });
        }
        Ok(())
    }

    /// Restore register memory and the gather pipe, then rebuild all
    /// constants. Nothing is modified if the snapshot is malformed.
    pub fn restore(&self, gx: &mut GxProcessor, pipe: &mut GatherPipe) -> VideoResult<()> {
        self.validate()?;
        let tracker = TrackerState {
            pixel: self.pixel,
            fog_range_changed: self.fog_range_changed,
            viewport_changed: self.viewport_changed,
        };
        gx.restore_state(&self.bp, &self.xf, &tracker)?;
        pipe.restore(&self.gather_pipe, self.gather_pipe_count as usize)?;
        debug!(
            "Video state restored ({} bytes in gather pipe)",
            self.gather_pipe_count
        );
        Ok(())
    }

    pub fn to_bytes(&self) -> VideoResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> VideoResult<Self> {
        Ok(bincode::deserialize(data)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create save directory")?;
            }
        }
        let data = self.to_bytes().context("Failed to serialize video state")?;
        std::fs::write(path, data).context("Failed to write video state file")?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).context("Failed to read video state file")?;
        let snapshot = Self::from_bytes(&data).context("Failed to deserialize video state")?;
        Ok(snapshot)
    }
}
