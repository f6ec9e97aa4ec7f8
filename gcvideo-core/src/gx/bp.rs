// BP (Blitting Processor) register memory.
//
// The BP address space is 256 registers of 24 significant bits each. It
// holds the rasterizer/TEV/pixel-engine state: combiner configuration, konst
// selects, alpha test, fog, z-texturing and indirect texturing. Games load
// these registers through `LoadBPReg` FIFO commands; this module stores the
// raw words and names the fields the rest of the crate reads.

use super::bitfield::BitField;

/// Number of BP registers.
pub const BP_REGISTER_COUNT: usize = 0x100;

/// Only the low 24 bits of a BP register are significant.
pub const BP_VALUE_MASK: u32 = 0x00FF_FFFF;

/// BP register addresses.
pub mod addr {
    pub const GENMODE: u8 = 0x00;
    pub const IND_MTXA0: u8 = 0x06;
    pub const IND_MTX_END: u8 = 0x0E;
    pub const IND_IMASK: u8 = 0x0F;
    pub const IND_CMD0: u8 = 0x10;
    pub const IND_CMD_END: u8 = 0x1F;
    pub const RAS1_SS0: u8 = 0x25;
    pub const RAS1_SS1: u8 = 0x26;
    pub const IREF: u8 = 0x27;
    pub const TREF0: u8 = 0x28;
    pub const TREF_END: u8 = 0x2F;
    pub const SU_SSIZE0: u8 = 0x30;
    pub const SU_TSIZE_END: u8 = 0x3F;
    pub const ZMODE: u8 = 0x40;
    pub const BLENDMODE: u8 = 0x41;
    pub const CONSTANTALPHA: u8 = 0x42;
    pub const ZCOMPARE: u8 = 0x43;
    pub const TEV_COLOR_ENV0: u8 = 0xC0;
    pub const TEV_ALPHA_ENV_END: u8 = 0xDF;
    pub const TEV_REGISTERL0: u8 = 0xE0;
    pub const TEV_REGISTERH_END: u8 = 0xE7;
    pub const FOGRANGE: u8 = 0xE8;
    pub const FOGRANGE_K0: u8 = 0xE9;
    pub const FOGRANGE_K_END: u8 = 0xED;
    pub const FOGPARAM0: u8 = 0xEE;
    pub const FOGBMAGNITUDE: u8 = 0xEF;
    pub const FOGBEXPONENT: u8 = 0xF0;
    pub const FOGPARAM3: u8 = 0xF1;
    pub const FOGCOLOR: u8 = 0xF2;
    pub const ALPHACOMPARE: u8 = 0xF3;
    pub const BIAS: u8 = 0xF4;
    pub const ZTEX2: u8 = 0xF5;
    pub const TEV_KSEL0: u8 = 0xF6;
    pub const TEV_KSEL_END: u8 = 0xFD;
    pub const BP_MASK: u8 = 0xFE;
}

pub mod genmode {
    use super::BitField;
    pub const NUM_TEXGENS: BitField = BitField::new(0, 4);
    pub const NUM_COLOR_CHANS: BitField = BitField::new(4, 3);
    pub const MULTISAMPLING: BitField = BitField::new(9, 1);
    /// Stored as "stages - 1".
    pub const NUM_TEV_STAGES: BitField = BitField::new(10, 4);
    pub const CULL_MODE: BitField = BitField::new(14, 2);
    pub const NUM_IND_STAGES: BitField = BitField::new(16, 3);
    pub const ZFREEZE: BitField = BitField::new(19, 1);
}

/// `TREF` registers: two TEV stage orders per register.
pub mod tev_order {
    use super::BitField;
    pub const TEXMAP0: BitField = BitField::new(0, 3);
    pub const TEXCOORD0: BitField = BitField::new(3, 3);
    pub const ENABLE0: BitField = BitField::new(6, 1);
    pub const COLORCHAN0: BitField = BitField::new(7, 3);
    pub const TEXMAP1: BitField = BitField::new(12, 3);
    pub const TEXCOORD1: BitField = BitField::new(15, 3);
    pub const ENABLE1: BitField = BitField::new(18, 1);
    pub const COLORCHAN1: BitField = BitField::new(19, 3);

    /// Distance between the even and odd stage halves of a `TREF` word.
    pub const ODD_STAGE_SHIFT: u8 = ENABLE1.start - ENABLE0.start;
}

pub mod color_env {
    use super::BitField;
    pub const D: BitField = BitField::new(0, 4);
    pub const C: BitField = BitField::new(4, 4);
    pub const B: BitField = BitField::new(8, 4);
    pub const A: BitField = BitField::new(12, 4);
    pub const BIAS: BitField = BitField::new(16, 2);
    pub const OP: BitField = BitField::new(18, 1);
    pub const CLAMP: BitField = BitField::new(19, 1);
    pub const SHIFT: BitField = BitField::new(20, 2);
    pub const DEST: BitField = BitField::new(22, 2);
}

pub mod alpha_env {
    use super::BitField;
    pub const RSWAP: BitField = BitField::new(0, 2);
    pub const TSWAP: BitField = BitField::new(2, 2);
    pub const D: BitField = BitField::new(4, 3);
    pub const C: BitField = BitField::new(7, 3);
    pub const B: BitField = BitField::new(10, 3);
    pub const A: BitField = BitField::new(13, 3);
    pub const BIAS: BitField = BitField::new(16, 2);
    pub const OP: BitField = BitField::new(18, 1);
    pub const CLAMP: BitField = BitField::new(19, 1);
    pub const SHIFT: BitField = BitField::new(20, 2);
    pub const DEST: BitField = BitField::new(22, 2);
}

pub mod ksel {
    use super::BitField;
    pub const SWAP1: BitField = BitField::new(0, 2);
    pub const SWAP2: BitField = BitField::new(2, 2);
    pub const KCSEL0: BitField = BitField::new(4, 5);
    pub const KASEL0: BitField = BitField::new(9, 5);
    pub const KCSEL1: BitField = BitField::new(14, 5);
    pub const KASEL1: BitField = BitField::new(19, 5);
}

pub mod alpha_test {
    use super::BitField;
    pub const REF0: BitField = BitField::new(0, 8);
    pub const REF1: BitField = BitField::new(8, 8);
    pub const COMP0: BitField = BitField::new(16, 3);
    pub const COMP1: BitField = BitField::new(19, 3);
    pub const LOGIC: BitField = BitField::new(22, 2);
}

pub mod fog {
    use super::BitField;
    pub const MANT: BitField = BitField::new(0, 11);
    pub const EXP: BitField = BitField::new(11, 8);
    pub const SIGN: BitField = BitField::new(19, 1);
    pub const PROJ: BitField = BitField::new(20, 1);
    pub const FSEL: BitField = BitField::new(21, 3);
    pub const B_MAGNITUDE: BitField = BitField::new(0, 24);
    pub const B_SHIFT: BitField = BitField::new(0, 5);
    pub const COLOR_B: BitField = BitField::new(0, 8);
    pub const COLOR_G: BitField = BitField::new(8, 8);
    pub const COLOR_R: BitField = BitField::new(16, 8);
    pub const RANGE_CENTER: BitField = BitField::new(0, 10);
    pub const RANGE_ENABLED: BitField = BitField::new(10, 1);
    pub const RANGE_K_HI: BitField = BitField::new(0, 12);
    pub const RANGE_K_LO: BitField = BitField::new(12, 12);
}

pub mod ztex {
    use super::BitField;
    pub const BIAS: BitField = BitField::new(0, 24);
    pub const TYPE: BitField = BitField::new(0, 2);
    pub const OP: BitField = BitField::new(2, 2);
}

pub mod constant_alpha {
    use super::BitField;
    pub const ALPHA: BitField = BitField::new(0, 8);
    pub const ENABLE: BitField = BitField::new(8, 1);
}

pub mod zcontrol {
    use super::BitField;
    pub const PIXEL_FORMAT: BitField = BitField::new(0, 3);
    pub const ZFORMAT: BitField = BitField::new(3, 3);
    pub const EARLY_ZTEST: BitField = BitField::new(6, 1);
}

/// Indirect matrix columns. Register A holds (ma, mb, s0), B holds
/// (mc, md, s1), C holds (me, mf, s2).
pub mod ind_mtx {
    use super::BitField;
    pub const ROW0: BitField = BitField::new(0, 11);
    pub const ROW1: BitField = BitField::new(11, 11);
    pub const SCALE: BitField = BitField::new(22, 2);
}

pub mod tev_ind {
    use super::BitField;
    pub const BT: BitField = BitField::new(0, 2);
    pub const FMT: BitField = BitField::new(2, 2);
    pub const BIAS: BitField = BitField::new(4, 3);
    pub const BS: BitField = BitField::new(7, 2);
    pub const MID: BitField = BitField::new(9, 4);
    pub const SW: BitField = BitField::new(13, 3);
    pub const TW: BitField = BitField::new(16, 3);
    pub const LB_UTCLOD: BitField = BitField::new(19, 1);
    pub const FB_ADDPREV: BitField = BitField::new(20, 1);
}

pub mod tex_scale {
    use super::BitField;
    pub const SS0: BitField = BitField::new(0, 4);
    pub const TS0: BitField = BitField::new(4, 4);
    pub const SS1: BitField = BitField::new(8, 4);
    pub const TS1: BitField = BitField::new(12, 4);
}

pub mod tex_coord {
    use super::BitField;
    pub const SCALE_MINUS_1: BitField = BitField::new(0, 16);
}

/// `TEV_REGISTERL`/`TEV_REGISTERH` pairs. L carries red + alpha, H carries
/// blue + green; bit 23 routes the write to the konst bank.
pub mod tev_register {
    use super::BitField;
    pub const LOW: BitField = BitField::new(0, 11);
    pub const HIGH: BitField = BitField::new(12, 11);
    pub const KONST: BitField = BitField::new(23, 1);
}

/// Raw BP register memory plus the one-shot write mask register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpMemory {
    regs: [u32; BP_REGISTER_COUNT],
    mask: u32,
}

impl BpMemory {
    pub fn new() -> Self {
        Self {
            regs: [0; BP_REGISTER_COUNT],
            mask: BP_VALUE_MASK,
        }
    }

    #[inline]
    pub fn get(&self, address: u8) -> u32 {
        self.regs[address as usize]
    }

    /// Store a register through the BP mask, as the `LoadBPReg` command does.
    ///
    /// A write to `BP_MASK` arms the mask for the next write only. Returns the
    /// value that actually landed in the register.
    pub fn load(&mut self, address: u8, value: u32) -> u32 {
        let value = value & BP_VALUE_MASK;
        if address == addr::BP_MASK {
            self.mask = value;
            return value;
        }

        let merged = (self.regs[address as usize] & !self.mask) | (value & self.mask);
        self.regs[address as usize] = merged;
        self.mask = BP_VALUE_MASK;
        merged
    }

    /// Store a register directly, bypassing the mask (used by state restore).
    #[inline]
    pub fn set(&mut self, address: u8, value: u32) {
        self.regs[address as usize] = value & BP_VALUE_MASK;
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.regs
    }

    /// Replace the whole register file. Returns `false` if `words` is not
    /// exactly [`BP_REGISTER_COUNT`] long.
    pub fn restore(&mut self, words: &[u32]) -> bool {
        if words.len() != BP_REGISTER_COUNT {
            return false;
        }
        for (dst, &src) in self.regs.iter_mut().zip(words) {
            *dst = src & BP_VALUE_MASK;
        }
        self.mask = BP_VALUE_MASK;
        true
    }

    // -- Decoded views ---------------------------------------------------

    pub fn genmode(&self) -> u32 {
        self.get(addr::GENMODE)
    }

    /// Number of active TEV stages minus one (0..=15).
    pub fn num_tev_stages_minus_1(&self) -> u32 {
        genmode::NUM_TEV_STAGES.extract(self.genmode())
    }

    pub fn num_ind_stages(&self) -> u32 {
        genmode::NUM_IND_STAGES.extract(self.genmode())
    }

    pub fn tev_order(&self, pair: usize) -> u32 {
        self.get(addr::TREF0 + pair as u8)
    }

    pub fn color_env(&self, stage: usize) -> u32 {
        self.get(addr::TEV_COLOR_ENV0 + 2 * stage as u8)
    }

    pub fn alpha_env(&self, stage: usize) -> u32 {
        self.get(addr::TEV_COLOR_ENV0 + 2 * stage as u8 + 1)
    }

    pub fn ksel(&self, index: usize) -> u32 {
        self.get(addr::TEV_KSEL0 + index as u8)
    }

    pub fn tev_ind(&self, stage: usize) -> u32 {
        self.get(addr::IND_CMD0 + stage as u8)
    }

    /// Indirect matrix register `col` (0 = A, 1 = B, 2 = C) of matrix `index`.
    pub fn ind_mtx(&self, index: usize, col: usize) -> u32 {
        self.get(addr::IND_MTXA0 + (3 * index + col) as u8)
    }

    /// Texture map used by indirect stage `stage` (from `IREF`).
    pub fn iref_tex_map(&self, stage: usize) -> u32 {
        (self.get(addr::IREF) >> (6 * stage)) & 7
    }

    /// Texture coordinate used by indirect stage `stage` (from `IREF`).
    pub fn iref_tex_coord(&self, stage: usize) -> u32 {
        (self.get(addr::IREF) >> (6 * stage + 3)) & 7
    }

    /// Fog "A" parameter rebuilt as an IEEE float from its 11-bit mantissa.
    pub fn fog_a(&self) -> f32 {
        reconstruct_fog_float(self.get(addr::FOGPARAM0))
    }

    /// Fog "C" parameter, stored in the low bits of `FOGPARAM3`.
    pub fn fog_c(&self) -> f32 {
        reconstruct_fog_float(self.get(addr::FOGPARAM3))
    }

    pub fn fog_b_magnitude(&self) -> u32 {
        fog::B_MAGNITUDE.extract(self.get(addr::FOGBMAGNITUDE))
    }

    pub fn fog_b_shift(&self) -> u32 {
        fog::B_SHIFT.extract(self.get(addr::FOGBEXPONENT))
    }

    pub fn fog_range_k_hi(&self, index: usize) -> u32 {
        fog::RANGE_K_HI.extract(self.get(addr::FOGRANGE_K0 + index as u8))
    }

    pub fn tex_coord_scale_minus_1(&self, texcoord: usize) -> (u32, u32) {
        let s = self.get(addr::SU_SSIZE0 + 2 * texcoord as u8);
        let t = self.get(addr::SU_SSIZE0 + 2 * texcoord as u8 + 1);
        (
            tex_coord::SCALE_MINUS_1.extract(s),
            tex_coord::SCALE_MINUS_1.extract(t),
        )
    }
}

impl Default for BpMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an indirect stage word actually perturbs texture coordinates.
pub fn tev_ind_is_active(word: u32) -> bool {
    tev_ind::BS.extract(word) != 0 || tev_ind::MID.extract(word) != 0
}

fn reconstruct_fog_float(word: u32) -> f32 {
    let bits = (fog::SIGN.extract(word) << 31)
        | (fog::EXP.extract(word) << 23)
        | (fog::MANT.extract(word) << 12);
    f32::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_masked_to_24_bits() {
        let mut bp = BpMemory::new();
        bp.load(addr::GENMODE, 0xFFFF_FFFF);
        assert_eq!(bp.genmode(), 0x00FF_FFFF);
    }

    #[test]
    fn bp_mask_applies_to_next_write_only() {
        let mut bp = BpMemory::new();
        bp.load(addr::ALPHACOMPARE, 0x00AA_AAAA);
        bp.load(addr::BP_MASK, 0x0000_00FF);
        bp.load(addr::ALPHACOMPARE, 0x0000_0055);
        assert_eq!(bp.get(addr::ALPHACOMPARE), 0x00AA_AA55);

        bp.load(addr::ALPHACOMPARE, 0x0012_3456);
        assert_eq!(bp.get(addr::ALPHACOMPARE), 0x0012_3456);
    }

    #[test]
    fn fog_a_reconstructs_float() {
        let mut bp = BpMemory::new();
        // 1.0f = exp 127, mantissa 0.
        bp.set(addr::FOGPARAM0, fog::EXP.insert(0, 127));
        assert_eq!(bp.fog_a(), 1.0);

        // -0.75 = sign 1, exp 126, mantissa top bit set.
        let word = fog::SIGN.insert(fog::EXP.insert(fog::MANT.insert(0, 0x400), 126), 1);
        bp.set(addr::FOGPARAM0, word);
        assert_eq!(bp.fog_a(), -0.75);
    }

    #[test]
    fn iref_fields_per_stage() {
        let mut bp = BpMemory::new();
        // stage 1: texmap 5, texcoord 3
        bp.set(addr::IREF, (5 << 6) | (3 << 9));
        assert_eq!(bp.iref_tex_map(1), 5);
        assert_eq!(bp.iref_tex_coord(1), 3);
        assert_eq!(bp.iref_tex_map(0), 0);
    }

    #[test]
    fn odd_stage_shift_matches_field_layout() {
        assert_eq!(tev_order::ODD_STAGE_SHIFT, 12);
        assert_eq!(tev_order::TEXMAP0.start + 12, tev_order::TEXMAP1.start);
        assert_eq!(tev_order::COLORCHAN0.start + 12, tev_order::COLORCHAN1.start);
    }

    #[test]
    fn restore_rejects_wrong_length() {
        let mut bp = BpMemory::new();
        assert!(!bp.restore(&[0; 10]));
        assert!(bp.restore(&[1; BP_REGISTER_COUNT]));
        assert_eq!(bp.get(0x80), 1);
    }

    #[test]
    fn ind_stage_activity() {
        assert!(!tev_ind_is_active(0));
        assert!(tev_ind_is_active(tev_ind::MID.insert(0, 1)));
        assert!(tev_ind_is_active(tev_ind::BS.insert(0, 2)));
        assert!(!tev_ind_is_active(tev_ind::FMT.insert(0, 3)));
    }
}
