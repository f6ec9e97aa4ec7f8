// Video settings persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Feature flags reported by the GPU backend the generated code targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendCapabilities {
    pub dual_source_blend: bool,
    pub bitfield_extract: bool,
    pub dynamic_sampler_indexing: bool,
    pub geometry_shaders: bool,
    pub depth_clamp: bool,
    pub clip_control: bool,
    pub early_z: bool,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            dual_source_blend: true,
            bitfield_extract: true,
            dynamic_sampler_indexing: true,
            geometry_shaders: true,
            depth_clamp: true,
            clip_control: true,
            early_z: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Force fog off regardless of the fog registers.
    pub disable_fog: bool,
    /// Samples per pixel; anything above 1 enables MSAA.
    pub multisamples: u32,
    /// Shade every sample (only meaningful with MSAA).
    pub ssaa: bool,
    pub per_pixel_lighting: bool,
    /// Internal resolution multiplier of the EFB.
    pub efb_scale: u32,
    pub backend: BackendCapabilities,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            disable_fog: false,
            multisamples: 1,
            ssaa: false,
            per_pixel_lighting: false,
            efb_scale: 1,
            backend: BackendCapabilities::default(),
        }
    }
}

impl VideoConfig {
    pub fn msaa(&self) -> bool {
        self.multisamples > 1
    }

    pub fn ssaa(&self) -> bool {
        self.msaa() && self.ssaa
    }

    /// EFB scale as a float, never below 1.
    pub fn efb_scale_f32(&self) -> f32 {
        self.efb_scale.max(1) as f32
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: VideoConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}
