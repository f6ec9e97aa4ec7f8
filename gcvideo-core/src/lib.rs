// GameCube GX video core
//
// CPU command bytes flow through the `fifo` gather pipe and command
// processor into BP/XF register memory (`gx`). The `tracker` turns
// register writes into uniform constant blocks, and `shadergen` emits the
// uber-shaders that consume them, keyed by `ShaderVariantKey`.

pub mod config;
pub mod constants;
pub mod error;
pub mod fifo;
pub mod gx;
pub mod savestate;
pub mod shadergen;
pub mod tracker;

pub use config::{BackendCapabilities, VideoConfig};
pub use error::{VideoError, VideoResult};
pub use fifo::{BurstSink, CpuFifo, GatherPipe};
pub use gx::{DrawCall, GxProcessor};
pub use savestate::VideoSnapshot;
pub use shadergen::{
    generate_pixel_shader, generate_vertex_shader, GeneratedShader, ShaderCapabilities,
    ShaderTarget, ShaderVariantKey,
};
pub use tracker::{DirtyGroup, RegisterStateTracker};
