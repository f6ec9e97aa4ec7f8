// Uniform constant blocks shared between the register tracker and the
// generated shaders.
//
// Each block exists twice: as a `#[repr(C)]` plain-old-data struct the
// tracker fills and the backend uploads verbatim, and as a static
// `UniformBlock` description the shader generators emit as the matching
// std140 / cbuffer declaration. The two must agree byte for byte; the
// description's std140 size is checked against `size_of` in tests.

pub mod pixel;
pub mod vertex;

use crate::shadergen::{ShaderCode, ShaderTarget};

pub use pixel::{PixelConstants, UberConstants};
pub use vertex::{LightConstants, VertexConstants};

/// Scalar and vector types that appear in the constant blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Uint,
    Int,
    Float,
    Float2,
    Uint4,
    Int4,
    Float4,
    /// The per-light struct of the vertex block.
    Light,
}

impl UniformType {
    /// Type name as written in generated source. The common shader header
    /// maps the HLSL-style names onto GLSL types.
    pub fn shader_name(self) -> &'static str {
        match self {
            UniformType::Uint => "uint",
            UniformType::Int => "int",
            UniformType::Float => "float",
            UniformType::Float2 => "float2",
            UniformType::Uint4 => "uint4",
            UniformType::Int4 => "int4",
            UniformType::Float4 => "float4",
            UniformType::Light => "Light",
        }
    }

    /// (size, base alignment) under std140.
    pub fn std140_size_align(self) -> (usize, usize) {
        match self {
            UniformType::Uint | UniformType::Int | UniformType::Float => (4, 4),
            UniformType::Float2 => (8, 8),
            UniformType::Uint4 | UniformType::Int4 | UniformType::Float4 => (16, 16),
            UniformType::Light => (5 * 16, 16),
        }
    }
}

/// One member of a uniform block. `count == 0` declares a plain member,
/// anything else an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub name: &'static str,
    pub ty: UniformType,
    pub count: usize,
}

impl UniformField {
    pub const fn scalar(name: &'static str, ty: UniformType) -> Self {
        Self { name, ty, count: 0 }
    }

    pub const fn array(name: &'static str, ty: UniformType, count: usize) -> Self {
        Self { name, ty, count }
    }
}

/// Static layout of a constant block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBlock {
    pub name: &'static str,
    /// Binding point for GLSL targets (`layout(std140, binding = N)`).
    pub binding: u32,
    /// Constant buffer register for D3D (`register(bN)`).
    pub register: u32,
    pub fields: &'static [UniformField],
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

impl UniformBlock {
    /// Byte offset of every field under std140 rules.
    pub fn std140_offsets(&self) -> Vec<(&'static str, usize)> {
        let mut offset = 0;
        let mut offsets = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let (size, align) = field.ty.std140_size_align();
            if field.count == 0 {
                offset = align_up(offset, align);
                offsets.push((field.name, offset));
                offset += size;
            } else {
                // Array elements are padded to a vec4 stride.
                let stride = align_up(size, 16);
                offset = align_up(offset, 16);
                offsets.push((field.name, offset));
                offset += stride * field.count;
            }
        }
        offsets
    }

    /// Size of the block's data under std140 (end of the last member).
    pub fn std140_size(&self) -> usize {
        let mut offset = 0;
        for field in self.fields {
            let (size, align) = field.ty.std140_size_align();
            if field.count == 0 {
                offset = align_up(offset, align) + size;
            } else {
                offset = align_up(offset, 16) + align_up(size, 16) * field.count;
            }
        }
        offset
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Emit the block declaration for `target`.
    pub fn write_declaration(&self, out: &mut ShaderCode, target: ShaderTarget) {
        if target.is_glsl() {
            writeln!(out, "UBO_BINDING(std140, {}) uniform {} {{", self.binding, self.name);
        } else {
            writeln!(out, "cbuffer {} : register(b{}) {{", self.name, self.register);
        }
        for field in self.fields {
            if field.count == 0 {
                writeln!(out, "\t{}\t{};", field.ty.shader_name(), field.name);
            } else {
                writeln!(
                    out,
                    "\t{}\t{}[{}];",
                    field.ty.shader_name(),
                    field.name,
                    field.count
                );
            }
        }
        out.write("};\n");
    }

    /// Declaration text on its own, as handed to a backend alongside the
    /// generated program.
    pub fn declaration(&self, target: ShaderTarget) -> String {
        let mut out = ShaderCode::new();
        self.write_declaration(&mut out, target);
        out.into_string()
    }
}
