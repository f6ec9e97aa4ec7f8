// Named bit-field descriptors for packed GX register words.
//
// Every field the tracker or the shader generators read out of BP/XF memory
// is described once by a `BitField` (start bit + width). The same descriptor
// extracts the value on the CPU and renders the matching
// `bitfieldExtract(...)` call into generated shader source, so both sides can
// never disagree about a field's position.

/// A contiguous run of bits inside a 32-bit register word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField {
    pub start: u8,
    pub width: u8,
}

impl BitField {
    pub const fn new(start: u8, width: u8) -> Self {
        assert!(width > 0 && start as u32 + width as u32 <= 32);
        Self { start, width }
    }

    /// Mask covering `width` low bits.
    #[inline]
    pub const fn mask(self) -> u32 {
        if self.width == 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Mask of this field in register position.
    #[inline]
    pub const fn shifted_mask(self) -> u32 {
        self.mask() << self.start
    }

    #[inline]
    pub const fn extract(self, word: u32) -> u32 {
        (word >> self.start) & self.mask()
    }

    /// Extract and sign-extend a two's complement field.
    #[inline]
    pub const fn extract_signed(self, word: u32) -> i32 {
        let shift = 32 - self.width as u32;
        ((self.extract(word) << shift) as i32) >> shift
    }

    #[inline]
    pub const fn is_set(self, word: u32) -> bool {
        self.extract(word) != 0
    }

    /// Returns `word` with this field replaced by `value` (truncated to width).
    #[inline]
    pub const fn insert(self, word: u32, value: u32) -> u32 {
        (word & !self.shifted_mask()) | ((value & self.mask()) << self.start)
    }

    /// Shader expression extracting this field from `source`.
    pub fn shader_extract(self, source: &str) -> String {
        format!("bitfieldExtract({source}, {}, {})", self.start, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_and_insert() {
        let f = BitField::new(10, 4);
        assert_eq!(f.mask(), 0xF);
        assert_eq!(f.shifted_mask(), 0xF << 10);
        let word = f.insert(0xFFFF_FFFF, 0x5);
        assert_eq!(f.extract(word), 0x5);
        assert_eq!(word | f.shifted_mask(), 0xFFFF_FFFF);
    }

    #[test]
    fn insert_truncates_to_width() {
        let f = BitField::new(0, 3);
        assert_eq!(f.insert(0, 0xFF), 0x7);
    }

    #[test]
    fn signed_extract() {
        let f = BitField::new(0, 11);
        assert_eq!(f.extract_signed(0x7FF), -1);
        assert_eq!(f.extract_signed(0x3FF), 1023);
        assert_eq!(f.extract_signed(0x400), -1024);
    }

    #[test]
    fn full_width_field() {
        let f = BitField::new(0, 32);
        assert_eq!(f.extract(0xDEAD_BEEF), 0xDEAD_BEEF);
        assert_eq!(f.insert(0, 0x1234_5678), 0x1234_5678);
    }

    #[test]
    fn renders_shader_extract() {
        assert_eq!(
            BitField::new(10, 4).shader_extract("bpmem_genmode"),
            "bitfieldExtract(bpmem_genmode, 10, 4)"
        );
    }
}
