// TEV (Texture Environment) combiner encodings and fixed-point reference.
//
// The GameCube GPU has 16 TEV stages that combine textures, rasterized
// colors, and constant colors to produce final pixel output. Each stage
// computes, per channel and in 8-bit fixed point:
//
//   d OP lerp(a, b, c) + bias, scaled, then clamped
//
// or, when the bias field holds the "compare" code, one of eight compare
// operations. This module names every small-integer code the combiner
// registers carry, maps each code to the uber-shader expression it selects,
// and provides a CPU reference of the arithmetic the generated code performs.

/// Color channel input selector for a TEV stage (4-bit hardware code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TevColorArg {
    /// Previous stage color RGB.
    CprevRgb = 0,
    /// Previous stage alpha broadcast to RGB.
    AprevRgb = 1,
    C0Rgb = 2,
    A0Rgb = 3,
    C1Rgb = 4,
    A1Rgb = 5,
    C2Rgb = 6,
    A2Rgb = 7,
    TexcRgb = 8,
    TexaRgb = 9,
    RascRgb = 10,
    RasaRgb = 11,
    /// Constant 255.
    One = 12,
    /// Constant 128.
    Half = 13,
    Konst = 14,
    Zero = 15,
}

impl TevColorArg {
    pub const ALL: [TevColorArg; 16] = [
        Self::CprevRgb,
        Self::AprevRgb,
        Self::C0Rgb,
        Self::A0Rgb,
        Self::C1Rgb,
        Self::A1Rgb,
        Self::C2Rgb,
        Self::A2Rgb,
        Self::TexcRgb,
        Self::TexaRgb,
        Self::RascRgb,
        Self::RasaRgb,
        Self::One,
        Self::Half,
        Self::Konst,
        Self::Zero,
    ];

    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }

    /// Uber-shader expression (over the `State s` struct) this input reads.
    pub fn shader_source(self) -> &'static str {
        match self {
            Self::CprevRgb => "s.Reg[0].rgb",
            Self::AprevRgb => "s.Reg[0].aaa",
            Self::C0Rgb => "s.Reg[1].rgb",
            Self::A0Rgb => "s.Reg[1].aaa",
            Self::C1Rgb => "s.Reg[2].rgb",
            Self::A1Rgb => "s.Reg[2].aaa",
            Self::C2Rgb => "s.Reg[3].rgb",
            Self::A2Rgb => "s.Reg[3].aaa",
            Self::TexcRgb => "s.TexColor.rgb",
            Self::TexaRgb => "s.TexColor.aaa",
            Self::RascRgb => "s.RasColor.rgb",
            Self::RasaRgb => "s.RasColor.aaa",
            Self::One => "int3(255, 255, 255)",
            Self::Half => "int3(128, 128, 128)",
            Self::Konst => "s.KonstColor.rgb",
            Self::Zero => "int3(0, 0, 0)",
        }
    }
}

/// Alpha channel input selector for a TEV stage (3-bit hardware code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TevAlphaArg {
    AprevAlpha = 0,
    A0Alpha = 1,
    A1Alpha = 2,
    A2Alpha = 3,
    TexAlpha = 4,
    RasAlpha = 5,
    KonstAlpha = 6,
    Zero = 7,
}

impl TevAlphaArg {
    pub const ALL: [TevAlphaArg; 8] = [
        Self::AprevAlpha,
        Self::A0Alpha,
        Self::A1Alpha,
        Self::A2Alpha,
        Self::TexAlpha,
        Self::RasAlpha,
        Self::KonstAlpha,
        Self::Zero,
    ];

    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 0x7) as usize]
    }

    pub fn shader_source(self) -> &'static str {
        match self {
            Self::AprevAlpha => "s.Reg[0].a",
            Self::A0Alpha => "s.Reg[1].a",
            Self::A1Alpha => "s.Reg[2].a",
            Self::A2Alpha => "s.Reg[3].a",
            Self::TexAlpha => "s.TexColor.a",
            Self::RasAlpha => "s.RasColor.a",
            Self::KonstAlpha => "s.KonstColor.a",
            Self::Zero => "0",
        }
    }
}

/// Arithmetic operation applied in a TEV stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TevOp {
    Add = 0,
    Sub = 1,
}

impl TevOp {
    pub fn from_bits(bits: u32) -> Self {
        if bits & 1 == 0 {
            Self::Add
        } else {
            Self::Sub
        }
    }
}

/// Bias field. `Compare` switches the stage into compare mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TevBias {
    Zero = 0,
    AddHalf = 1,
    SubHalf = 2,
    Compare = 3,
}

impl TevBias {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Zero,
            1 => Self::AddHalf,
            2 => Self::SubHalf,
            _ => Self::Compare,
        }
    }
}

/// Output scale factor applied after the TEV combine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TevScale {
    Scale1 = 0,
    Scale2 = 1,
    Scale4 = 2,
    DivideBy2 = 3,
}

impl TevScale {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Scale1,
            1 => Self::Scale2,
            2 => Self::Scale4,
            _ => Self::DivideBy2,
        }
    }
}

/// Destination register for a TEV stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TevRegId {
    /// The implicit "previous" register passed between stages.
    Prev = 0,
    Reg0 = 1,
    Reg1 = 2,
    Reg2 = 3,
}

impl TevRegId {
    pub const ALL: [TevRegId; 4] = [Self::Prev, Self::Reg0, Self::Reg1, Self::Reg2];

    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 3) as usize]
    }

    /// Index into the shader's `s.Reg[]` array.
    pub fn register_index(self) -> usize {
        self as usize
    }
}

/// Compare-mode operation, encoded as `shift << 1 | op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TevCompareOp {
    R8Gt = 0,
    R8Eq = 1,
    Gr16Gt = 2,
    Gr16Eq = 3,
    Bgr24Gt = 4,
    Bgr24Eq = 5,
    /// Per-channel compare (RGB8 for the colour combiner, A8 for alpha).
    Channel8Gt = 6,
    Channel8Eq = 7,
}

impl TevCompareOp {
    pub const ALL: [TevCompareOp; 8] = [
        Self::R8Gt,
        Self::R8Eq,
        Self::Gr16Gt,
        Self::Gr16Eq,
        Self::Bgr24Gt,
        Self::Bgr24Eq,
        Self::Channel8Gt,
        Self::Channel8Eq,
    ];

    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 7) as usize]
    }

    pub fn from_shift_op(shift: u32, op: u32) -> Self {
        Self::from_bits((shift << 1) | (op & 1))
    }

    pub fn is_per_channel(self) -> bool {
        matches!(self, Self::Channel8Gt | Self::Channel8Eq)
    }

    /// Boolean expression over `color_A`/`color_B` for the packed compares.
    /// `None` for the per-channel operations, which are emitted separately.
    pub fn shader_condition(self) -> Option<&'static str> {
        match self {
            Self::R8Gt => Some("color_A.r > color_B.r"),
            Self::R8Eq => Some("color_A.r == color_B.r"),
            Self::Gr16Gt => {
                Some("(color_A.r | (color_A.g << 8)) > (color_B.r | (color_B.g << 8))")
            }
            Self::Gr16Eq => Some("color_A.r == color_B.r && color_A.g == color_B.g"),
            Self::Bgr24Gt => Some(
                "(color_A.r | (color_A.g << 8) | (color_A.b << 16)) > \
                 (color_B.r | (color_B.g << 8) | (color_B.b << 16))",
            ),
            Self::Bgr24Eq => Some(
                "color_A.r == color_B.r && color_A.g == color_B.g && color_A.b == color_B.b",
            ),
            Self::Channel8Gt | Self::Channel8Eq => None,
        }
    }
}

/// Alpha test comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlphaCompare {
    Never = 0,
    Less = 1,
    Equal = 2,
    LEqual = 3,
    Greater = 4,
    NEqual = 5,
    GEqual = 6,
    Always = 7,
}

impl AlphaCompare {
    pub const ALL: [AlphaCompare; 8] = [
        Self::Never,
        Self::Less,
        Self::Equal,
        Self::LEqual,
        Self::Greater,
        Self::NEqual,
        Self::GEqual,
        Self::Always,
    ];

    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 7) as usize]
    }

    pub fn shader_condition(self) -> &'static str {
        match self {
            Self::Never => "false",
            Self::Less => "a < b",
            Self::Equal => "a == b",
            Self::LEqual => "a <= b",
            Self::Greater => "a > b",
            Self::NEqual => "a != b",
            Self::GEqual => "a >= b",
            Self::Always => "true",
        }
    }

    pub fn evaluate(self, a: i32, b: i32) -> bool {
        match self {
            Self::Never => false,
            Self::Less => a < b,
            Self::Equal => a == b,
            Self::LEqual => a <= b,
            Self::Greater => a > b,
            Self::NEqual => a != b,
            Self::GEqual => a >= b,
            Self::Always => true,
        }
    }
}

/// How the two alpha test results combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlphaTestLogic {
    And = 0,
    Or = 1,
    Xor = 2,
    Xnor = 3,
}

impl AlphaTestLogic {
    pub const ALL: [AlphaTestLogic; 4] = [Self::And, Self::Or, Self::Xor, Self::Xnor];

    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 3) as usize]
    }

    pub fn shader_condition(self) -> &'static str {
        match self {
            Self::And => "comp0 && comp1",
            Self::Or => "comp0 || comp1",
            Self::Xor => "comp0 != comp1",
            Self::Xnor => "comp0 == comp1",
        }
    }

    pub fn evaluate(self, comp0: bool, comp1: bool) -> bool {
        match self {
            Self::And => comp0 && comp1,
            Self::Or => comp0 || comp1,
            Self::Xor => comp0 != comp1,
            Self::Xnor => comp0 == comp1,
        }
    }
}

/// Fog function select (`fsel`). Codes 1-3 all apply the linear ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FogFunction {
    Off,
    Linear,
    Exp,
    Exp2,
    BackwardsExp,
    BackwardsExp2,
}

impl FogFunction {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 7 {
            0 => Self::Off,
            1..=3 => Self::Linear,
            4 => Self::Exp,
            5 => Self::Exp2,
            6 => Self::BackwardsExp,
            _ => Self::BackwardsExp2,
        }
    }

    /// Statements remapping the linear factor `fog`, for codes 4-7.
    pub fn shader_remap(self) -> Option<&'static str> {
        match self {
            Self::Off | Self::Linear => None,
            Self::Exp => Some("fog = 1.0 - exp2(-8.0 * fog);"),
            Self::Exp2 => Some("fog = 1.0 - exp2(-8.0 * fog * fog);"),
            Self::BackwardsExp => Some("fog = exp2(-8.0 * (1.0 - fog));"),
            Self::BackwardsExp2 => Some("fog = 1.0 - fog; fog = exp2(-8.0 * fog * fog);"),
        }
    }

    /// CPU reference of the remap applied to a linear factor in [0, 1].
    pub fn remap(self, fog: f32) -> f32 {
        match self {
            Self::Off | Self::Linear => fog,
            Self::Exp => 1.0 - (-8.0 * fog).exp2(),
            Self::Exp2 => 1.0 - (-8.0 * fog * fog).exp2(),
            Self::BackwardsExp => (-8.0 * (1.0 - fog)).exp2(),
            Self::BackwardsExp2 => {
                let inv = 1.0 - fog;
                (-8.0 * inv * inv).exp2()
            }
        }
    }
}

/// Rasterized colour source selected by a stage's `colorchan` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasChannel {
    Color0,
    Color1,
    AlphaBump,
    AlphaBumpNormalized,
    Zero,
}

impl RasChannel {
    /// Codes 2-4 and 7 read as zero.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 7 {
            0 => Self::Color0,
            1 => Self::Color1,
            5 => Self::AlphaBump,
            6 => Self::AlphaBumpNormalized,
            _ => Self::Zero,
        }
    }
}

/// Depth texture operation (`ztex2.op`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZTexOp {
    Disabled,
    Add,
    Replace,
}

impl ZTexOp {
    /// Code 3 is undefined and behaves like `Replace`.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Disabled,
            1 => Self::Add,
            _ => Self::Replace,
        }
    }
}

/// Depth texture format (`ztex2.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZTexType {
    U8,
    U16,
    U24,
}

impl ZTexType {
    /// `None` for the undefined code 3.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & 3 {
            0 => Some(Self::U8),
            1 => Some(Self::U16),
            2 => Some(Self::U24),
            _ => None,
        }
    }

    /// Dot-product weights turning a sampled texel into a depth value, plus
    /// the byte scale in the last lane.
    pub fn bias_weights(self) -> [i32; 4] {
        match self {
            Self::U8 => [0, 0, 0, 1],
            Self::U16 => [1, 0, 0, 256],
            Self::U24 => [65536, 256, 1, 0],
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed-point reference
// ---------------------------------------------------------------------------

/// One channel of the TEV lerp-bias-scale pipeline.
///
/// `c` is rescaled from 0..255 to 0..256 first. For scales other than
/// divide-by-two the shift is folded into the lerp with a rounding bias of
/// 127 (subtract) or 128 (add); divide-by-two halves the final sum instead.
pub fn lerp(a: i32, b: i32, c: i32, d: i32, bias: TevBias, op: TevOp, scale: TevScale) -> i32 {
    let c = c + (c >> 7);
    let mut lerp = (a << 8) + (b - a) * c;
    let mut d = d;
    if scale != TevScale::DivideBy2 {
        let shift = scale as u32;
        lerp <<= shift;
        lerp += if op == TevOp::Sub { 127 } else { 128 };
        d <<= shift;
    }
    let mut result = lerp >> 8;

    match bias {
        TevBias::AddHalf => result += 128,
        TevBias::SubHalf => result -= 128,
        TevBias::Zero | TevBias::Compare => {}
    }
    result = match op {
        TevOp::Sub => d - result,
        TevOp::Add => d + result,
    };

    if scale == TevScale::DivideBy2 {
        result >>= 1;
    }
    result
}

/// Packed compare shared by both combiners (operations 0-5). Per-channel
/// operations return `false` here.
pub fn compare(op: TevCompareOp, a: [i32; 3], b: [i32; 3]) -> bool {
    let gr16 = |c: [i32; 3]| c[0] | (c[1] << 8);
    let bgr24 = |c: [i32; 3]| c[0] | (c[1] << 8) | (c[2] << 16);
    match op {
        TevCompareOp::R8Gt => a[0] > b[0],
        TevCompareOp::R8Eq => a[0] == b[0],
        TevCompareOp::Gr16Gt => gr16(a) > gr16(b),
        TevCompareOp::Gr16Eq => a[0] == b[0] && a[1] == b[1],
        TevCompareOp::Bgr24Gt => bgr24(a) > bgr24(b),
        TevCompareOp::Bgr24Eq => a[0] == b[0] && a[1] == b[1] && a[2] == b[2],
        TevCompareOp::Channel8Gt | TevCompareOp::Channel8Eq => false,
    }
}

/// Per-channel compare select (operations 6 and 7) for one channel.
pub fn compare_channel(op: TevCompareOp, a: i32, b: i32, c: i32) -> i32 {
    let pass = match op {
        TevCompareOp::Channel8Gt => a > b,
        TevCompareOp::Channel8Eq => a == b,
        _ => false,
    };
    if pass {
        c
    } else {
        0
    }
}

/// Clamp a stage result to [0, 255] or, unclamped, to the 11-bit signed range.
pub fn clamp_result(value: i32, clamp: bool) -> i32 {
    if clamp {
        value.clamp(0, 255)
    } else {
        value.clamp(-1024, 1023)
    }
}

/// The rasterized value the normalized alpha-bump channel reads.
pub fn normalized_alpha_bump(bump: i32) -> i32 {
    bump | (bump >> 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_args_round_trip_codes() {
        for (code, arg) in TevColorArg::ALL.iter().enumerate() {
            assert_eq!(*arg as usize, code);
            assert_eq!(TevColorArg::from_bits(code as u32), *arg);
        }
        assert_eq!(TevColorArg::One.shader_source(), "int3(255, 255, 255)");
        assert_eq!(TevColorArg::Half.shader_source(), "int3(128, 128, 128)");
        assert_eq!(TevColorArg::RasaRgb.shader_source(), "s.RasColor.aaa");
    }

    #[test]
    fn alpha_args_round_trip_codes() {
        for (code, arg) in TevAlphaArg::ALL.iter().enumerate() {
            assert_eq!(*arg as usize, code);
            assert_eq!(TevAlphaArg::from_bits(code as u32), *arg);
        }
        assert_eq!(TevAlphaArg::Zero.shader_source(), "0");
    }

    #[test]
    fn lerp_passthrough_d() {
        // a = b = c = 0 leaves d (plus rounding that truncates away).
        for d in [0, 1, 128, 255] {
            assert_eq!(lerp(0, 0, 0, d, TevBias::Zero, TevOp::Add, TevScale::Scale1), d);
        }
    }

    #[test]
    fn lerp_full_c_selects_b() {
        // c = 255 is rescaled to 256, so the lerp yields exactly b.
        assert_eq!(lerp(10, 200, 255, 0, TevBias::Zero, TevOp::Add, TevScale::Scale1), 200);
        assert_eq!(lerp(10, 200, 0, 0, TevBias::Zero, TevOp::Add, TevScale::Scale1), 10);
    }

    #[test]
    fn lerp_bias_and_subtract() {
        assert_eq!(lerp(0, 0, 0, 100, TevBias::AddHalf, TevOp::Add, TevScale::Scale1), 228);
        assert_eq!(lerp(0, 0, 0, 100, TevBias::SubHalf, TevOp::Add, TevScale::Scale1), -28);
        // Subtract: d - lerp; rounding bias 127 keeps a zero lerp at zero.
        assert_eq!(lerp(50, 0, 0, 100, TevBias::Zero, TevOp::Sub, TevScale::Scale1), 50);
    }

    #[test]
    fn lerp_scales() {
        assert_eq!(lerp(0, 0, 0, 100, TevBias::Zero, TevOp::Add, TevScale::Scale2), 200);
        assert_eq!(lerp(0, 0, 0, 100, TevBias::Zero, TevOp::Add, TevScale::Scale4), 400);
        assert_eq!(lerp(0, 0, 0, 100, TevBias::Zero, TevOp::Add, TevScale::DivideBy2), 50);
        assert_eq!(lerp(100, 0, 0, 0, TevBias::Zero, TevOp::Add, TevScale::Scale2), 200);
    }

    #[test]
    fn every_compare_op() {
        let a = [10, 2, 3];
        let b = [9, 2, 3];
        let expected = [
            (TevCompareOp::R8Gt, true),
            (TevCompareOp::R8Eq, false),
            (TevCompareOp::Gr16Gt, true),
            (TevCompareOp::Gr16Eq, false),
            (TevCompareOp::Bgr24Gt, true),
            (TevCompareOp::Bgr24Eq, false),
            (TevCompareOp::Channel8Gt, false),
            (TevCompareOp::Channel8Eq, false),
        ];
        for (op, result) in expected {
            assert_eq!(compare(op, a, b), result, "{op:?}");
        }

        // GR16 weighs green above red.
        assert!(compare(TevCompareOp::Gr16Gt, [0, 3, 0], [255, 2, 0]));
        assert!(!compare(TevCompareOp::R8Gt, [0, 3, 0], [255, 2, 0]));
        assert!(compare(TevCompareOp::Bgr24Eq, [1, 2, 3], [1, 2, 3]));

        assert_eq!(compare_channel(TevCompareOp::Channel8Gt, 5, 4, 77), 77);
        assert_eq!(compare_channel(TevCompareOp::Channel8Gt, 4, 4, 77), 0);
        assert_eq!(compare_channel(TevCompareOp::Channel8Eq, 4, 4, 77), 77);
        assert_eq!(compare_channel(TevCompareOp::R8Gt, 5, 4, 77), 0);
    }

    #[test]
    fn compare_op_encoding() {
        for code in 0..8u32 {
            let op = TevCompareOp::from_shift_op(code >> 1, code & 1);
            assert_eq!(op as u32, code);
            assert_eq!(op.shader_condition().is_none(), op.is_per_channel());
        }
    }

    #[test]
    fn clamp_ranges() {
        assert_eq!(clamp_result(300, true), 255);
        assert_eq!(clamp_result(-5, true), 0);
        assert_eq!(clamp_result(300, false), 300);
        assert_eq!(clamp_result(2000, false), 1023);
        assert_eq!(clamp_result(-2000, false), -1024);
    }

    #[test]
    fn every_alpha_compare_and_logic() {
        let truth = [
            (AlphaCompare::Never, [false, false, false]),
            (AlphaCompare::Less, [true, false, false]),
            (AlphaCompare::Equal, [false, true, false]),
            (AlphaCompare::LEqual, [true, true, false]),
            (AlphaCompare::Greater, [false, false, true]),
            (AlphaCompare::NEqual, [true, false, true]),
            (AlphaCompare::GEqual, [false, true, true]),
            (AlphaCompare::Always, [true, true, true]),
        ];
        for (code, (cmp, expect)) in truth.iter().enumerate() {
            assert_eq!(AlphaCompare::from_bits(code as u32), *cmp);
            assert_eq!(cmp.evaluate(1, 2), expect[0], "{cmp:?} less");
            assert_eq!(cmp.evaluate(2, 2), expect[1], "{cmp:?} equal");
            assert_eq!(cmp.evaluate(3, 2), expect[2], "{cmp:?} greater");
        }

        let logic = [
            (AlphaTestLogic::And, [false, false, false, true]),
            (AlphaTestLogic::Or, [false, true, true, true]),
            (AlphaTestLogic::Xor, [false, true, true, false]),
            (AlphaTestLogic::Xnor, [true, false, false, true]),
        ];
        for (code, (op, expect)) in logic.iter().enumerate() {
            assert_eq!(AlphaTestLogic::from_bits(code as u32), *op);
            let inputs = [(false, false), (false, true), (true, false), (true, true)];
            for (i, (a, b)) in inputs.iter().enumerate() {
                assert_eq!(op.evaluate(*a, *b), expect[i], "{op:?} {a} {b}");
            }
        }
    }

    #[test]
    fn every_fog_function_code() {
        let expected = [
            FogFunction::Off,
            FogFunction::Linear,
            FogFunction::Linear,
            FogFunction::Linear,
            FogFunction::Exp,
            FogFunction::Exp2,
            FogFunction::BackwardsExp,
            FogFunction::BackwardsExp2,
        ];
        for (code, func) in expected.iter().enumerate() {
            assert_eq!(FogFunction::from_bits(code as u32), *func);
            assert_eq!(func.shader_remap().is_some(), code > 3);
        }
        assert_eq!(FogFunction::Exp.remap(0.0), 0.0);
        assert_eq!(FogFunction::BackwardsExp.remap(1.0), 1.0);
        assert_eq!(FogFunction::BackwardsExp2.remap(1.0), 1.0);
        assert!((FogFunction::Exp2.remap(1.0) - (1.0 - 1.0 / 256.0)).abs() < 1e-6);
    }

    #[test]
    fn every_ras_channel_code() {
        let expected = [
            RasChannel::Color0,
            RasChannel::Color1,
            RasChannel::Zero,
            RasChannel::Zero,
            RasChannel::Zero,
            RasChannel::AlphaBump,
            RasChannel::AlphaBumpNormalized,
            RasChannel::Zero,
        ];
        for (code, chan) in expected.iter().enumerate() {
            assert_eq!(RasChannel::from_bits(code as u32), *chan);
        }
        assert_eq!(normalized_alpha_bump(0xF8), 0xFF);
        assert_eq!(normalized_alpha_bump(0), 0);
    }

    #[test]
    fn every_ztex_code() {
        assert_eq!(ZTexOp::from_bits(0), ZTexOp::Disabled);
        assert_eq!(ZTexOp::from_bits(1), ZTexOp::Add);
        assert_eq!(ZTexOp::from_bits(2), ZTexOp::Replace);
        assert_eq!(ZTexOp::from_bits(3), ZTexOp::Replace);

        assert_eq!(ZTexType::from_bits(0).map(ZTexType::bias_weights), Some([0, 0, 0, 1]));
        assert_eq!(ZTexType::from_bits(1).map(ZTexType::bias_weights), Some([1, 0, 0, 256]));
        assert_eq!(
            ZTexType::from_bits(2).map(ZTexType::bias_weights),
            Some([65536, 256, 1, 0])
        );
        assert_eq!(ZTexType::from_bits(3), None);
    }

    #[test]
    fn every_bias_scale_dest_code() {
        let biases = [TevBias::Zero, TevBias::AddHalf, TevBias::SubHalf, TevBias::Compare];
        let scales = [
            TevScale::Scale1,
            TevScale::Scale2,
            TevScale::Scale4,
            TevScale::DivideBy2,
        ];
        for code in 0..4u32 {
            assert_eq!(TevBias::from_bits(code), biases[code as usize]);
            assert_eq!(TevScale::from_bits(code), scales[code as usize]);
            assert_eq!(TevRegId::from_bits(code).register_index(), code as usize);
        }
        assert_eq!(TevOp::from_bits(0), TevOp::Add);
        assert_eq!(TevOp::from_bits(1), TevOp::Sub);
    }
}
