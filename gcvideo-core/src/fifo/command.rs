// GX command stream decoder
//
// Commands are an opcode byte followed by big-endian operands:
// - `0x00` NOP
// - `0x08` LoadCP: register byte, 32-bit value
// - `0x10` LoadXF: 32-bit header (count - 1 in bits 16-19, address in the
//   low 16 bits) followed by `count` words
// - `0x20/0x28/0x30/0x38` indexed XF load (arrays A-D): one 32-bit word
// - `0x40` call display list: address and size
// - `0x44` performance metric, `0x48` invalidate vertex cache
// - `0x61` LoadBP: 32-bit word, register in the top byte
// - `0x80-0xBF` draw: primitive in bits 3-5, vertex format in bits 0-2,
//   16-bit vertex count, then the vertex data

use log::{trace, warn};

/// Draw primitive encoded in bits 3-5 of a draw opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Primitive {
    Quads = 0,
    Quads2 = 1,
    Triangles = 2,
    TriangleStrip = 3,
    TriangleFan = 4,
    Lines = 5,
    LineStrip = 6,
    Points = 7,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Self::Quads,
        Self::Quads2,
        Self::Triangles,
        Self::TriangleStrip,
        Self::TriangleFan,
        Self::Lines,
        Self::LineStrip,
        Self::Points,
    ];

    pub fn from_opcode(opcode: u8) -> Self {
        Self::ALL[((opcode >> 3) & 7) as usize]
    }
}

/// Opcode values.
pub mod opcode {
    pub const NOP: u8 = 0x00;
    pub const LOAD_CP_REG: u8 = 0x08;
    pub const LOAD_XF_REG: u8 = 0x10;
    pub const LOAD_INDX_A: u8 = 0x20;
    pub const LOAD_INDX_B: u8 = 0x28;
    pub const LOAD_INDX_C: u8 = 0x30;
    pub const LOAD_INDX_D: u8 = 0x38;
    pub const CALL_DL: u8 = 0x40;
    pub const UNKNOWN_METRICS: u8 = 0x44;
    pub const INVL_VC: u8 = 0x48;
    pub const LOAD_BP_REG: u8 = 0x61;
    pub const DRAW_BASE: u8 = 0x80;
    pub const DRAW_END: u8 = 0xBF;
}

/// A fully decoded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nop,
    LoadCp { address: u8, value: u32 },
    LoadXf { address: u16, values: Vec<u32> },
    /// Indexed XF load from array `array` (0-3). The data lives in main
    /// memory, so only the descriptor word is recorded.
    LoadIndexedXf { array: u8, word: u32 },
    CallDisplayList { address: u32, size: u32 },
    PerfMetric,
    InvalidateVertexCache,
    LoadBp { address: u8, value: u32 },
    Draw {
        primitive: Primitive,
        vat: u8,
        vertex_count: u16,
    },
}

/// Per vertex-attribute-table layout, supplied by the vertex loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexFormat {
    /// Bytes per vertex in the command stream.
    pub stride: u32,
    /// Component flags handed to the vertex constant block.
    pub components: u32,
}

/// Incremental decoder over bytes read back from the FIFO.
///
/// Bytes are appended with [`push_bytes`](Self::push_bytes); commands that
/// are not complete yet stay buffered until more data arrives.
#[derive(Debug, Default, Clone)]
pub struct CommandProcessor {
    pending: Vec<u8>,
    cursor: usize,
    formats: [VertexFormat; 8],
    unknown_opcodes: u64,
}

impl CommandProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vertex_format(&mut self, vat: usize, format: VertexFormat) {
        if let Some(slot) = self.formats.get_mut(vat) {
            *slot = format;
        }
    }

    pub fn vertex_format(&self, vat: usize) -> VertexFormat {
        self.formats.get(vat).copied().unwrap_or_default()
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        // Compact once the consumed prefix dominates the buffer.
        if self.cursor > 0 && self.cursor * 2 >= self.pending.len() {
            self.pending.drain(..self.cursor);
            self.cursor = 0;
        }
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes buffered but not yet decoded.
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.cursor
    }

    /// Opcodes skipped because they were not recognised.
    pub fn unknown_opcodes(&self) -> u64 {
        self.unknown_opcodes
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.cursor = 0;
    }

    /// Decode the next complete command, or `None` if more bytes are needed.
    pub fn next_command(&mut self) -> Option<Command> {
        loop {
            let data = &self.pending[self.cursor..];
            let &op = data.first()?;
            let (command, size) = match op {
                opcode::NOP => (Command::Nop, 1),
                opcode::LOAD_CP_REG => {
                    let address = *data.get(1)?;
                    (
                        Command::LoadCp {
                            address,
                            value: read_u32(data, 2)?,
                        },
                        6,
                    )
                }
                opcode::LOAD_XF_REG => {
                    let header = read_u32(data, 1)?;
                    let count = ((header >> 16) & 0xF) as usize + 1;
                    let values = (0..count)
                        .map(|i| read_u32(data, 5 + 4 * i))
                        .collect::<Option<Vec<_>>>()?;
                    (
                        Command::LoadXf {
                            address: (header & 0xFFFF) as u16,
                            values,
                        },
                        5 + 4 * count,
                    )
                }
                opcode::LOAD_INDX_A | opcode::LOAD_INDX_B | opcode::LOAD_INDX_C | opcode::LOAD_INDX_D => (
                    Command::LoadIndexedXf {
                        array: (op - opcode::LOAD_INDX_A) >> 3,
                        word: read_u32(data, 1)?,
                    },
                    5,
                ),
                opcode::CALL_DL => (
                    Command::CallDisplayList {
                        address: read_u32(data, 1)?,
                        size: read_u32(data, 5)?,
                    },
                    9,
                ),
                opcode::UNKNOWN_METRICS => (Command::PerfMetric, 1),
                opcode::INVL_VC => (Command::InvalidateVertexCache, 1),
                opcode::LOAD_BP_REG => {
                    let word = read_u32(data, 1)?;
                    (
                        Command::LoadBp {
                            address: (word >> 24) as u8,
                            value: word & 0x00FF_FFFF,
                        },
                        5,
                    )
                }
                opcode::DRAW_BASE..=opcode::DRAW_END => {
                    let vertex_count = u16::from_be_bytes([*data.get(1)?, *data.get(2)?]);
                    let vat = op & 7;
                    let stride = self.formats[vat as usize].stride as usize;
                    let size = 3 + vertex_count as usize * stride;
                    if data.len() < size {
                        return None;
                    }
                    (
                        Command::Draw {
                            primitive: Primitive::from_opcode(op),
                            vat,
                            vertex_count,
                        },
                        size,
                    )
                }
                _ => {
                    warn!("Unknown GX opcode 0x{:02X}, skipping", op);
                    self.unknown_opcodes += 1;
                    self.cursor += 1;
                    continue;
                }
            };
            self.cursor += size;
            trace!("GX command {:?}", command);
            return Some(command);
        }
    }
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(cp: &mut CommandProcessor) -> Vec<Command> {
        std::iter::from_fn(|| cp.next_command()).collect()
    }

    #[test]
    fn decodes_register_loads() {
        let mut cp = CommandProcessor::new();
        cp.push_bytes(&[0x61, 0xF3, 0x12, 0x34, 0x56]);
        cp.push_bytes(&[0x08, 0x50, 0x00, 0x00, 0x00, 0x01]);
        cp.push_bytes(&[0x10, 0x00, 0x01, 0x10, 0x0A, 0, 0, 0, 1, 0, 0, 0, 2]);
        cp.push_bytes(&[0x00]);
        assert_eq!(
            decode_all(&mut cp),
            vec![
                Command::LoadBp {
                    address: 0xF3,
                    value: 0x12_3456
                },
                Command::LoadCp {
                    address: 0x50,
                    value: 1
                },
                Command::LoadXf {
                    address: 0x100A,
                    values: vec![1, 2]
                },
                Command::Nop,
            ]
        );
        assert_eq!(cp.pending_len(), 0);
    }

    #[test]
    fn incomplete_command_waits_for_more_bytes() {
        let mut cp = CommandProcessor::new();
        cp.push_bytes(&[0x61, 0x00, 0x00]);
        assert_eq!(cp.next_command(), None);
        assert_eq!(cp.pending_len(), 3);
        cp.push_bytes(&[0x00, 0x07]);
        assert_eq!(
            cp.next_command(),
            Some(Command::LoadBp {
                address: 0,
                value: 7
            })
        );
    }

    #[test]
    fn draw_skips_vertex_data() {
        let mut cp = CommandProcessor::new();
        cp.set_vertex_format(
            2,
            VertexFormat {
                stride: 12,
                components: 0,
            },
        );
        // triangles, vat 2, 3 vertices
        cp.push_bytes(&[0x92, 0x00, 0x03]);
        cp.push_bytes(&[0xEE; 35]);
        assert_eq!(cp.next_command(), None);
        cp.push_bytes(&[0xEE, 0x00]);
        assert_eq!(
            decode_all(&mut cp),
            vec![
                Command::Draw {
                    primitive: Primitive::Triangles,
                    vat: 2,
                    vertex_count: 3
                },
                Command::Nop
            ]
        );
    }

    #[test]
    fn every_draw_opcode_maps_to_a_primitive() {
        for op in opcode::DRAW_BASE..=opcode::DRAW_END {
            let primitive = Primitive::from_opcode(op);
            assert_eq!(primitive as u8, (op >> 3) & 7);
        }
        assert_eq!(Primitive::from_opcode(0x80), Primitive::Quads);
        assert_eq!(Primitive::from_opcode(0x98), Primitive::TriangleStrip);
        assert_eq!(Primitive::from_opcode(0xB8), Primitive::Points);
    }

    #[test]
    fn fixed_size_commands() {
        let mut cp = CommandProcessor::new();
        cp.push_bytes(&[0x30, 0xAA, 0xBB, 0xCC, 0xDD]);
        cp.push_bytes(&[0x40, 0, 0, 0x10, 0, 0, 0, 0, 0x20]);
        cp.push_bytes(&[0x44, 0x48]);
        assert_eq!(
            decode_all(&mut cp),
            vec![
                Command::LoadIndexedXf {
                    array: 2,
                    word: 0xAABB_CCDD
                },
                Command::CallDisplayList {
                    address: 0x1000,
                    size: 0x20
                },
                Command::PerfMetric,
                Command::InvalidateVertexCache,
            ]
        );
    }

    #[test]
    fn unknown_opcodes_are_skipped_bytewise() {
        let mut cp = CommandProcessor::new();
        cp.push_bytes(&[0xFF, 0x01, 0x00]);
        assert_eq!(decode_all(&mut cp), vec![Command::Nop]);
        assert_eq!(cp.unknown_opcodes(), 2);
    }
}
