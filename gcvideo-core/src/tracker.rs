// Register state tracker
//
// Observes BP and XF register writes, flags the constant groups they
// affect, and rebuilds the three constant blocks (`PSBlock`, `UBERBlock`,
// `VSBlock`) from register memory before a draw.
//
// Register memory is the source of truth. `dirty_all` + `rebuild` recomputes
// every derived value from it, which is what state restore relies on.

use bitvec::prelude::*;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::config::VideoConfig;
use crate::constants::{LightConstants, PixelConstants, UberConstants, VertexConstants};
use crate::gx::bp::{
    addr, alpha_test, constant_alpha, fog, ind_mtx, tev_ind, tev_ind_is_active, tev_register,
    tex_scale, ztex, BpMemory,
};
use crate::gx::tev::ZTexType;
use crate::gx::xf::{self, reg, tex_mtx_info, unpack_rgba8, XfMemory};

/// Independently rebuilt slices of the constant blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DirtyGroup {
    // Pixel / uber
    UberRegisters,
    TevColors,
    AlphaRef,
    TexCoordScale,
    ZTextureType,
    ZTextureBias,
    /// Depth range in the pixel block and pixel-centre correction in the
    /// vertex block.
    Viewport,
    IndirectScale,
    IndirectMatrix,
    Indirect,
    TexProjection,
    FogColor,
    FogParams,
    FogRange,
    EfbScale,
    // Vertex
    PosNormalMatrix,
    Projection,
    Materials,
    Lights,
    TexMatrices,
    TransformMatrices,
    NormalMatrices,
    PostMatrices,
    TexGenInfo,
}

impl DirtyGroup {
    pub const ALL: [DirtyGroup; 24] = [
        Self::UberRegisters,
        Self::TevColors,
        Self::AlphaRef,
        Self::TexCoordScale,
        Self::ZTextureType,
        Self::ZTextureBias,
        Self::Viewport,
        Self::IndirectScale,
        Self::IndirectMatrix,
        Self::Indirect,
        Self::TexProjection,
        Self::FogColor,
        Self::FogParams,
        Self::FogRange,
        Self::EfbScale,
        Self::PosNormalMatrix,
        Self::Projection,
        Self::Materials,
        Self::Lights,
        Self::TexMatrices,
        Self::TransformMatrices,
        Self::NormalMatrices,
        Self::PostMatrices,
        Self::TexGenInfo,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn touches_pixel(self) -> bool {
        (self as u8) <= (Self::EfbScale as u8)
    }

    pub fn touches_vertex(self) -> bool {
        self == Self::Viewport || (self as u8) >= (Self::PosNormalMatrix as u8)
    }
}

/// The part of the tracker that goes into a save state. Everything else is
/// recomputed from register memory on restore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerState {
    pub pixel: PixelConstants,
    /// Pending-group flags at save time. Restore rebuilds every group, so
    /// they only keep the saved layout stable.
    pub fog_range_changed: bool,
    pub viewport_changed: bool,
}

#[derive(Debug, Clone)]
pub struct RegisterStateTracker {
    pixel: PixelConstants,
    uber: UberConstants,
    vertex: VertexConstants,
    dirty: BitVec<u32>,
    disable_fog: bool,
    efb_scale: f32,
    /// Block contents changed since the backend last uploaded them.
    pixel_changed: bool,
    vertex_changed: bool,
}

impl RegisterStateTracker {
    /// Tracker in its power-on state, i.e. rebuilt from all-zero registers.
    pub fn new(config: &VideoConfig) -> Self {
        let mut tracker = Self {
            pixel: PixelConstants::default(),
            uber: UberConstants::power_on(),
            vertex: VertexConstants::default(),
            dirty: bitvec![u32, Lsb0; 0; DirtyGroup::COUNT],
            disable_fog: config.disable_fog,
            efb_scale: config.efb_scale_f32(),
            pixel_changed: true,
            vertex_changed: true,
        };
        tracker.dirty_all();
        tracker.rebuild(&BpMemory::new(), &XfMemory::new());
        tracker
    }

    pub fn pixel_constants(&self) -> &PixelConstants {
        &self.pixel
    }

    pub fn uber_constants(&self) -> &UberConstants {
        &self.uber
    }

    pub fn vertex_constants(&self) -> &VertexConstants {
        &self.vertex
    }

    /// Apply settings that feed the constant blocks (fog override, EFB scale).
    pub fn apply_config(&mut self, config: &VideoConfig) {
        self.disable_fog = config.disable_fog;
        self.efb_scale = config.efb_scale_f32();
        for group in [
            DirtyGroup::FogColor,
            DirtyGroup::FogParams,
            DirtyGroup::FogRange,
            DirtyGroup::EfbScale,
            DirtyGroup::Viewport,
        ] {
            self.mark_dirty(group);
        }
    }

    // -- Dirty tracking --------------------------------------------------

    pub fn mark_dirty(&mut self, group: DirtyGroup) {
        self.dirty.set(group as usize, true);
    }

    pub fn is_dirty(&self, group: DirtyGroup) -> bool {
        self.dirty[group as usize]
    }

    /// True when no group is waiting for a rebuild.
    pub fn is_clean(&self) -> bool {
        self.dirty.not_any()
    }

    pub fn dirty_groups(&self) -> impl Iterator<Item = DirtyGroup> + '_ {
        self.dirty.iter_ones().map(|i| DirtyGroup::ALL[i])
    }

    pub fn dirty_all(&mut self) {
        self.dirty.fill(true);
    }

    /// Returns whether the pixel blocks changed since the last call.
    pub fn take_pixel_changed(&mut self) -> bool {
        std::mem::take(&mut self.pixel_changed)
    }

    /// Returns whether the vertex block changed since the last call.
    pub fn take_vertex_changed(&mut self) -> bool {
        std::mem::take(&mut self.vertex_changed)
    }

    // -- Register write observers ------------------------------------------

    /// Called after `bp` has stored a write to `address`.
    pub fn on_bp_write(&mut self, bp: &BpMemory, address: u8) {
        use DirtyGroup as G;
        match address {
            addr::GENMODE => {
                self.mark_dirty(G::UberRegisters);
                self.mark_dirty(G::Indirect);
            }
            addr::IND_MTXA0..=addr::IND_MTX_END => self.mark_dirty(G::IndirectMatrix),
            addr::IND_CMD0..=addr::IND_CMD_END | addr::IREF => self.mark_dirty(G::Indirect),
            addr::RAS1_SS0 | addr::RAS1_SS1 => self.mark_dirty(G::IndirectScale),
            addr::TREF0..=addr::TREF_END => self.mark_dirty(G::UberRegisters),
            addr::SU_SSIZE0..=addr::SU_TSIZE_END => self.mark_dirty(G::TexCoordScale),
            addr::CONSTANTALPHA | addr::ALPHACOMPARE => {
                self.mark_dirty(G::AlphaRef);
                self.mark_dirty(G::UberRegisters);
            }
            addr::ZCOMPARE | addr::TEV_COLOR_ENV0..=addr::TEV_ALPHA_ENV_END => {
                self.mark_dirty(G::UberRegisters)
            }
            addr::TEV_KSEL0..=addr::TEV_KSEL_END => self.mark_dirty(G::UberRegisters),
            addr::TEV_REGISTERL0..=addr::TEV_REGISTERH_END => {
                // The bank a TEV register write lands in is chosen per write,
                // so it is applied now rather than at rebuild.
                self.apply_tev_register(address, bp.get(address));
                self.mark_dirty(G::TevColors);
            }
            addr::FOGRANGE => {
                self.mark_dirty(G::FogRange);
                self.mark_dirty(G::UberRegisters);
            }
            addr::FOGRANGE_K0..=addr::FOGRANGE_K_END => self.mark_dirty(G::FogRange),
            addr::FOGPARAM0 | addr::FOGBMAGNITUDE | addr::FOGBEXPONENT => {
                self.mark_dirty(G::FogParams)
            }
            addr::FOGPARAM3 => {
                self.mark_dirty(G::FogParams);
                self.mark_dirty(G::UberRegisters);
            }
            addr::FOGCOLOR => self.mark_dirty(G::FogColor),
            addr::BIAS => self.mark_dirty(G::ZTextureBias),
            addr::ZTEX2 => {
                self.mark_dirty(G::ZTextureType);
                self.mark_dirty(G::UberRegisters);
            }
            _ => {}
        }
    }

    /// Called after XF memory word `address` has been written.
    pub fn on_xf_write(&mut self, address: usize) {
        use DirtyGroup as G;
        match address {
            xf::POS_MATRICES..=0x0FF => {
                self.mark_dirty(G::TransformMatrices);
                self.mark_dirty(G::PosNormalMatrix);
                self.mark_dirty(G::TexMatrices);
            }
            xf::NORMAL_MATRICES..=0x45F => {
                self.mark_dirty(G::NormalMatrices);
                self.mark_dirty(G::PosNormalMatrix);
            }
            xf::POST_MATRICES..=0x5FF => self.mark_dirty(G::PostMatrices),
            xf::LIGHTS..=0x67F => self.mark_dirty(G::Lights),
            reg::AMBIENT0..=reg::MATERIAL1 => self.mark_dirty(G::Materials),
            reg::NUM_COLOR_CHANS
            | reg::COLOR0_CHAN..=reg::DUAL_TEX
            | reg::NUM_TEXGEN
            | reg::POST_MTX_INFO..=0x1057 => self.mark_dirty(G::TexGenInfo),
            reg::MATRIX_INDEX_A | reg::MATRIX_INDEX_B => {
                self.mark_dirty(G::PosNormalMatrix);
                self.mark_dirty(G::TexMatrices);
            }
            reg::VIEWPORT..=0x101F => {
                self.mark_dirty(G::Viewport);
                self.mark_dirty(G::FogRange);
            }
            reg::PROJECTION..=reg::PROJECTION_TYPE => self.mark_dirty(G::Projection),
            reg::TEX_MTX_INFO..=0x1047 => {
                self.mark_dirty(G::TexGenInfo);
                self.mark_dirty(G::TexProjection);
            }
            _ => {}
        }
    }

    // -- Values supplied from outside register memory ----------------------

    /// Size of the texture bound to `texmap`, from the texture cache.
    pub fn set_tex_dims(&mut self, texmap: usize, width: u32, height: u32) {
        let Some(dims) = self.pixel.texdims.get_mut(texmap) else {
            return;
        };
        let rwidth = 1.0 / (width.max(1) as f32 * 128.0);
        let rheight = 1.0 / (height.max(1) as f32 * 128.0);
        if dims[0] != rwidth || dims[1] != rheight {
            dims[0] = rwidth;
            dims[1] = rheight;
            self.pixel_changed = true;
        }
    }

    /// Depth slope of the current primitive, for z-freeze.
    pub fn set_zslope(&mut self, dfdx: f32, dfdy: f32, f0: f32) {
        self.pixel.zslope = [dfdx, dfdy, f0, 0.0];
        self.pixel_changed = true;
    }

    pub fn set_efb_scale(&mut self, scale: f32) {
        self.efb_scale = scale.max(1.0);
        self.mark_dirty(DirtyGroup::EfbScale);
        self.mark_dirty(DirtyGroup::Viewport);
        self.mark_dirty(DirtyGroup::FogRange);
    }

    /// Component flags of the current vertex format, from the vertex loader.
    pub fn set_vertex_components(&mut self, components: u32) {
        if self.vertex.components != components {
            self.vertex.components = components;
            self.vertex_changed = true;
        }
    }

    // -- Rebuild -------------------------------------------------------------

    /// Recompute every dirty group from register memory and clear the flags.
    pub fn rebuild(&mut self, bp: &BpMemory, xf: &XfMemory) {
        if self.is_clean() {
            return;
        }

        let mut rebuilt = 0;
        for group in DirtyGroup::ALL {
            if !self.is_dirty(group) {
                continue;
            }
            self.rebuild_group(group, bp, xf);
            self.pixel_changed |= group.touches_pixel();
            self.vertex_changed |= group.touches_vertex();
            rebuilt += 1;
        }
        self.dirty.fill(false);
        debug!("Rebuilt {} constant groups", rebuilt);
    }

    fn rebuild_group(&mut self, group: DirtyGroup, bp: &BpMemory, xf: &XfMemory) {
        trace!("Rebuilding {:?}", group);
        match group {
            DirtyGroup::UberRegisters => self.rebuild_uber_registers(bp),
            DirtyGroup::TevColors => {
                for address in addr::TEV_REGISTERL0..=addr::TEV_REGISTERH_END {
                    self.apply_tev_register(address, bp.get(address));
                }
            }
            DirtyGroup::AlphaRef => {
                let test = bp.get(addr::ALPHACOMPARE);
                self.pixel.alpha[0] = alpha_test::REF0.extract(test) as i32;
                self.pixel.alpha[1] = alpha_test::REF1.extract(test) as i32;
                self.pixel.alpha[3] = constant_alpha::ALPHA.extract(bp.get(addr::CONSTANTALPHA)) as i32;
            }
            DirtyGroup::TexCoordScale => {
                for (texcoord, dims) in self.pixel.texdims.iter_mut().enumerate() {
                    let (s, t) = bp.tex_coord_scale_minus_1(texcoord);
                    dims[2] = (s + 1) as f32 * 128.0;
                    dims[3] = (t + 1) as f32 * 128.0;
                }
            }
            DirtyGroup::ZTextureType => {
                // The undefined type code leaves the weights untouched.
                if let Some(ty) = ZTexType::from_bits(ztex::TYPE.extract(bp.get(addr::ZTEX2))) {
                    self.pixel.zbias[0] = ty.bias_weights();
                }
            }
            DirtyGroup::ZTextureBias => {
                self.pixel.zbias[1][3] = ztex::BIAS.extract(bp.get(addr::BIAS)) as i32;
            }
            DirtyGroup::Viewport => self.rebuild_viewport(xf),
            DirtyGroup::IndirectScale => {
                for (high, address) in [addr::RAS1_SS0, addr::RAS1_SS1].into_iter().enumerate() {
                    let word = bp.get(address);
                    self.pixel.indtexscale[high] = [
                        tex_scale::SS0.extract(word) as i32,
                        tex_scale::TS0.extract(word) as i32,
                        tex_scale::SS1.extract(word) as i32,
                        tex_scale::TS1.extract(word) as i32,
                    ];
                }
            }
            DirtyGroup::IndirectMatrix => {
                for index in 0..3 {
                    self.rebuild_ind_matrix(bp, index);
                }
            }
            DirtyGroup::Indirect => self.rebuild_indirect(bp),
            DirtyGroup::TexProjection => {
                self.uber.projection = (0..8).fold(0, |mask, texgen| {
                    mask | (tex_mtx_info::PROJECTION.extract(xf.tex_mtx_info(texgen)) << texgen)
                });
            }
            DirtyGroup::FogColor => {
                // Left as is while fog is forced off.
                if !self.disable_fog {
                    let color = bp.get(addr::FOGCOLOR);
                    self.pixel.fogcolor[0] = fog::COLOR_R.extract(color) as i32;
                    self.pixel.fogcolor[1] = fog::COLOR_G.extract(color) as i32;
                    self.pixel.fogcolor[2] = fog::COLOR_B.extract(color) as i32;
                }
            }
            DirtyGroup::FogParams => {
                if self.disable_fog {
                    self.pixel.fogf[1][0] = 0.0;
                    self.pixel.fogi[1] = 1;
                    self.pixel.fogf[1][2] = 0.0;
                    self.pixel.fogi[3] = 1;
                } else {
                    self.pixel.fogf[1][0] = bp.fog_a();
                    self.pixel.fogi[1] = bp.fog_b_magnitude() as i32;
                    self.pixel.fogf[1][2] = bp.fog_c();
                    self.pixel.fogi[3] = bp.fog_b_shift() as i32;
                }
            }
            DirtyGroup::FogRange => self.rebuild_fog_range(bp, xf),
            DirtyGroup::EfbScale => {
                let inv = 1.0 / self.efb_scale;
                self.pixel.efbscale = [inv, inv, 0.0, 0.0];
            }
            DirtyGroup::PosNormalMatrix => {
                let index = xf.pos_normal_matrix_index() as usize;
                for row in 0..3 {
                    self.vertex.posnormal_matrix[row] = xf.pos_matrix_row(index + row);
                    let [x, y, z] = xf.normal_matrix_row((index & 31) + row);
                    self.vertex.posnormal_matrix[3 + row] = [x, y, z, 0.0];
                }
            }
            DirtyGroup::Projection => self.vertex.projection = xf.projection_rows(),
            DirtyGroup::Materials => {
                for (slot, register) in [reg::AMBIENT0, reg::AMBIENT1, reg::MATERIAL0, reg::MATERIAL1]
                    .into_iter()
                    .enumerate()
                {
                    self.vertex.materials[slot] = unpack_rgba8(xf.get(register));
                }
            }
            DirtyGroup::Lights => {
                for (index, light) in self.vertex.lights.iter_mut().enumerate() {
                    *light = light_constants(&xf.light(index));
                }
            }
            DirtyGroup::TexMatrices => {
                for texgen in 0..8 {
                    let index = xf.tex_matrix_index(texgen) as usize;
                    for row in 0..3 {
                        self.vertex.tex_matrices[3 * texgen + row] = xf.pos_matrix_row(index + row);
                    }
                }
            }
            DirtyGroup::TransformMatrices => {
                for (row, dst) in self.vertex.transform_matrices.iter_mut().enumerate() {
                    *dst = xf.pos_matrix_row(row);
                }
            }
            DirtyGroup::NormalMatrices => {
                for (row, dst) in self.vertex.normal_matrices.iter_mut().enumerate() {
                    let [x, y, z] = xf.normal_matrix_row(row);
                    *dst = [x, y, z, 0.0];
                }
            }
            DirtyGroup::PostMatrices => {
                for (row, dst) in self.vertex.post_transform_matrices.iter_mut().enumerate() {
                    *dst = xf.post_matrix_row(row);
                }
            }
            DirtyGroup::TexGenInfo => {
                self.vertex.num_color_chans = xf.num_color_chans();
                self.vertex.dual_tex_info = xf.dual_tex_enabled() as u32;
                for (i, pack) in self.vertex.xfmem_pack1.iter_mut().enumerate() {
                    let (color, alpha) = if i < 2 {
                        (xf.color_chan(i), xf.alpha_chan(i))
                    } else {
                        (0, 0)
                    };
                    *pack = [xf.tex_mtx_info(i), xf.post_mtx_info(i), color, alpha];
                }
            }
        }
    }

    fn rebuild_uber_registers(&mut self, bp: &BpMemory) {
        let uber = &mut self.uber;
        uber.genmode = bp.genmode();
        uber.alpha_test = bp.get(addr::ALPHACOMPARE);
        uber.fog_param3 = bp.get(addr::FOGPARAM3);
        uber.fog_range_base = bp.get(addr::FOGRANGE);
        uber.dstalpha = bp.get(addr::CONSTANTALPHA);
        uber.ztex2 = bp.get(addr::ZTEX2);
        uber.zcontrol = bp.get(addr::ZCOMPARE);
        for (pair, order) in uber.tevorder.iter_mut().enumerate() {
            order[0] = bp.tev_order(pair);
        }
        for (stage, combiner) in uber.combiners.iter_mut().enumerate() {
            combiner[0] = bp.color_env(stage);
            combiner[1] = bp.alpha_env(stage);
        }
        for (index, ksel) in uber.tevksel.iter_mut().enumerate() {
            ksel[0] = bp.ksel(index);
        }
    }

    /// Store one `TEV_REGISTERL`/`H` word into the colour or konst bank.
    fn apply_tev_register(&mut self, address: u8, word: u32) {
        let offset = (address - addr::TEV_REGISTERL0) as usize;
        let index = offset / 2;
        // L carries red/alpha, H carries blue/green.
        let (low_comp, high_comp) = if offset % 2 == 0 { (0, 3) } else { (2, 1) };
        let low = tev_register::LOW.extract_signed(word);
        let high = tev_register::HIGH.extract_signed(word);

        if tev_register::KONST.is_set(word) {
            self.set_konst(index, low_comp, low);
            self.set_konst(index, high_comp, high);
        } else {
            self.pixel.colors[index][low_comp] = low;
            self.pixel.colors[index][high_comp] = high;
        }
        self.pixel_changed = true;
    }

    /// Konst colour component plus its two views in the lookup table:
    /// `.rgb` at 12..16 (alpha reads zero) and the replicated single
    /// components at 16..32.
    fn set_konst(&mut self, index: usize, comp: usize, value: i32) {
        self.pixel.kcolors[index][comp] = value;
        if comp != 3 {
            self.uber.konst[12 + index][comp] = value;
        }
        self.uber.konst[16 + index + comp * 4] = [value; 4];
    }

    fn rebuild_viewport(&mut self, xf: &XfMemory) {
        let viewport = xf.viewport();
        self.pixel.zbias[1][0] = viewport.far_z as i32;
        self.pixel.zbias[1][1] = viewport.z_range as i32;

        // Shift from the 0.5 pixel centre of the host API to 7/12.
        const PIXEL_CENTER_OFFSET: f32 = 7.0 / 12.0 - 0.5;
        let width = self.efb_scale * 2.0 * viewport.wd;
        let height = self.efb_scale * -2.0 * viewport.ht;
        let correction = |extent: f32| {
            if extent == 0.0 {
                0.0
            } else {
                PIXEL_CENTER_OFFSET * 2.0 / extent
            }
        };
        self.vertex.pixel_center_correction = [
            correction(width),
            correction(height),
            viewport.z_range / 16_777_216.0,
            viewport.far_z / 16_777_216.0,
        ];
        self.vertex.viewport_size = [2.0 * viewport.wd, -2.0 * viewport.ht, 0.0, 0.0];
    }

    fn rebuild_ind_matrix(&mut self, bp: &BpMemory, index: usize) {
        let cols: [u32; 3] = std::array::from_fn(|col| bp.ind_mtx(index, col));
        let scale = ind_mtx::SCALE.extract(cols[0])
            | (ind_mtx::SCALE.extract(cols[1]) << 2)
            | (ind_mtx::SCALE.extract(cols[2]) << 4);
        let shift = 17 - scale as i32;

        self.pixel.indtexmtx[2 * index] = [
            ind_mtx::ROW0.extract_signed(cols[0]),
            ind_mtx::ROW0.extract_signed(cols[1]),
            ind_mtx::ROW0.extract_signed(cols[2]),
            shift,
        ];
        self.pixel.indtexmtx[2 * index + 1] = [
            ind_mtx::ROW1.extract_signed(cols[0]),
            ind_mtx::ROW1.extract_signed(cols[1]),
            ind_mtx::ROW1.extract_signed(cols[2]),
            shift,
        ];
    }

    fn rebuild_indirect(&mut self, bp: &BpMemory) {
        let num_stages = bp.num_tev_stages_minus_1() as usize + 1;
        let num_ind_stages = bp.num_ind_stages() as usize;

        self.uber.iref = [0; 4];
        for (stage, tevind) in self.uber.tevind.iter_mut().enumerate() {
            if stage >= num_stages {
                tevind[0] = 0;
                continue;
            }
            let word = bp.tev_ind(stage);
            let ind_stage = tev_ind::BT.extract(word) as usize;
            if ind_stage < num_ind_stages {
                if tev_ind_is_active(word) {
                    self.uber.iref[ind_stage] = bp.iref_tex_coord(ind_stage)
                        | (bp.iref_tex_map(ind_stage) << 8)
                        | (1 << 16);
                }
                tevind[0] = word | (1 << 31);
            } else {
                tevind[0] = 0;
            }
        }
    }

    fn rebuild_fog_range(&mut self, bp: &BpMemory, xf: &XfMemory) {
        let base = bp.get(addr::FOGRANGE);
        let viewport = xf.viewport();
        if !self.disable_fog && fog::RANGE_ENABLED.is_set(base) && viewport.wd != 0.0 {
            // The register holds the real centre plus 342.
            let center = fog::RANGE_CENTER.extract(base) as f32 - 342.0;
            let screen_center = center / (2.0 * viewport.wd) * 2.0 - 1.0;
            let scaled_width = ((2.0 * viewport.wd) as i32) as f32 * self.efb_scale;
            self.pixel.fogf[0][0] = screen_center;
            self.pixel.fogf[0][1] = scaled_width;
            self.pixel.fogf[0][2] = bp.fog_range_k_hi(4) as f32 / 256.0;
        } else {
            self.pixel.fogf[0][0] = 0.0;
            self.pixel.fogf[0][1] = 1.0;
            self.pixel.fogf[0][2] = 1.0;
        }
    }

    // -- Save state --------------------------------------------------------

    pub fn save_state(&self) -> TrackerState {
        TrackerState {
            pixel: self.pixel,
            fog_range_changed: self.is_dirty(DirtyGroup::FogRange),
            viewport_changed: self.is_dirty(DirtyGroup::Viewport),
        }
    }

    /// Restore from a save state. `bp` and `xf` must already hold the
    /// restored register memory; every group is rebuilt from them.
    ///
    /// Only values register memory cannot reproduce are taken from `state`:
    /// both TEV register banks (a word only addresses one of them), texture
    /// sizes and the depth slope.
    pub fn restore_state(&mut self, state: &TrackerState, bp: &BpMemory, xf: &XfMemory) {
        self.pixel = PixelConstants::default();
        self.uber = UberConstants::power_on();
        self.pixel.colors = state.pixel.colors;
        for index in 0..4 {
            for comp in 0..4 {
                self.set_konst(index, comp, state.pixel.kcolors[index][comp]);
            }
        }
        for (dims, saved) in self.pixel.texdims.iter_mut().zip(&state.pixel.texdims) {
            dims[..2].copy_from_slice(&saved[..2]);
        }
        self.pixel.zslope = state.pixel.zslope;

        self.dirty_all();
        self.rebuild(bp, xf);
        self.pixel_changed = true;
        self.vertex_changed = true;
        debug!("Register state tracker restored");
    }
}

fn light_constants(light: &xf::Light) -> LightConstants {
    let vec4 = |v: [f32; 3]| [v[0], v[1], v[2], 0.0];
    let [x, y, z] = light.dir;
    let length = (x * x + y * y + z * z).sqrt();
    let dir = if length > 0.0 {
        [x / length, y / length, z / length, 0.0]
    } else {
        [0.0; 4]
    };
    LightConstants {
        color: unpack_rgba8(light.color),
        cosatt: vec4(light.cosatt),
        distatt: vec4(light.distatt),
        pos: vec4(light.pos),
        dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gx::bp::{genmode, tev_order};
    use crate::gx::xf::{LIGHTS, LIGHT_STRIDE, NORMAL_MATRICES};

    struct Regs {
        bp: BpMemory,
        xf: XfMemory,
        tracker: RegisterStateTracker,
    }

    impl Regs {
        fn new(config: &VideoConfig) -> Self {
            Self {
                bp: BpMemory::new(),
                xf: XfMemory::new(),
                tracker: RegisterStateTracker::new(config),
            }
        }

        fn bp(&mut self, address: u8, value: u32) {
            self.bp.load(address, value);
            self.tracker.on_bp_write(&self.bp, address);
        }

        fn xf(&mut self, address: usize, value: u32) {
            self.xf.set(address, value);
            self.tracker.on_xf_write(address);
        }

        fn xf_f32(&mut self, address: usize, value: f32) {
            self.xf(address, value.to_bits());
        }

        fn rebuild(&mut self) {
            self.tracker.rebuild(&self.bp, &self.xf);
        }
    }

    #[test]
    fn power_on_defaults() {
        let tracker = RegisterStateTracker::new(&VideoConfig::default());
        let pixel = tracker.pixel_constants();
        for row in &pixel.indtexmtx {
            assert_eq!(row[3], 17);
        }
        assert_eq!(pixel.zbias[0], [0, 0, 0, 1]);
        for dims in &pixel.texdims {
            assert_eq!(&dims[2..], &[128.0, 128.0]);
        }
        assert_eq!(&pixel.fogf[0][..3], &[0.0, 1.0, 1.0]);
        assert_eq!(pixel.efbscale, [1.0, 1.0, 0.0, 0.0]);
        assert_eq!(tracker.uber_constants().konst[0], [255; 4]);
        assert!(tracker.is_clean());
    }

    #[test]
    fn every_group_has_a_stable_index() {
        for (i, group) in DirtyGroup::ALL.iter().enumerate() {
            assert_eq!(*group as usize, i);
            assert!(group.touches_pixel() || group.touches_vertex());
        }
        assert!(DirtyGroup::Viewport.touches_pixel());
        assert!(DirtyGroup::Viewport.touches_vertex());
        assert!(!DirtyGroup::Lights.touches_pixel());
    }

    #[test]
    fn writes_mark_groups_and_rebuild_clears_them() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::FOGPARAM3, 0);
        regs.xf(reg::VIEWPORT, 0);
        let dirty: Vec<_> = regs.tracker.dirty_groups().collect();
        assert_eq!(
            dirty,
            vec![
                DirtyGroup::UberRegisters,
                DirtyGroup::Viewport,
                DirtyGroup::FogParams,
                DirtyGroup::FogRange
            ]
        );
        regs.rebuild();
        assert!(regs.tracker.is_clean());
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::GENMODE, genmode::NUM_TEV_STAGES.insert(0, 3));
        regs.bp(addr::ALPHACOMPARE, 0x12_3456);
        regs.bp(addr::FOGCOLOR, 0x20_4060);
        regs.bp(addr::TREF0, tev_order::ENABLE0.insert(0, 1));
        regs.xf_f32(reg::VIEWPORT, 320.0);
        regs.xf(reg::AMBIENT0, 0x1020_3040);
        regs.rebuild();

        let pixel = *regs.tracker.pixel_constants();
        let uber = *regs.tracker.uber_constants();
        let vertex = *regs.tracker.vertex_constants();
        regs.rebuild();
        assert_eq!(*regs.tracker.pixel_constants(), pixel);
        assert_eq!(*regs.tracker.uber_constants(), uber);
        assert_eq!(*regs.tracker.vertex_constants(), vertex);

        regs.tracker.dirty_all();
        regs.rebuild();
        assert_eq!(*regs.tracker.pixel_constants(), pixel);
        assert_eq!(*regs.tracker.uber_constants(), uber);
        assert_eq!(*regs.tracker.vertex_constants(), vertex);
    }

    #[test]
    fn uber_registers_mirror_bp_words() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::TEV_COLOR_ENV0 + 5, 0xAB_CDEF);
        regs.bp(addr::TEV_KSEL0 + 7, 0x00_1234);
        regs.bp(addr::TREF0 + 2, 0x05_0505);
        regs.bp(addr::ZCOMPARE, 0x40);
        regs.rebuild();
        let uber = regs.tracker.uber_constants();
        // 0xC5 is the alpha combiner of stage 2.
        assert_eq!(uber.combiners[2][1], 0xAB_CDEF);
        assert_eq!(uber.tevksel[7][0], 0x1234);
        assert_eq!(uber.tevorder[2][0], 0x05_0505);
        assert_eq!(uber.zcontrol, 0x40);
    }

    #[test]
    fn fog_disabled_gives_neutral_params() {
        let config = VideoConfig {
            disable_fog: true,
            ..Default::default()
        };
        let mut regs = Regs::new(&config);
        regs.bp(addr::FOGPARAM0, fog::EXP.insert(0, 127));
        regs.bp(addr::FOGBMAGNITUDE, 0x1234);
        regs.bp(addr::FOGBEXPONENT, 7);
        regs.bp(addr::FOGPARAM3, fog::EXP.insert(0, 128));
        regs.bp(addr::FOGCOLOR, 0xFF_FFFF);
        regs.rebuild();

        let pixel = regs.tracker.pixel_constants();
        assert_eq!(pixel.fogf[1][0], 0.0);
        assert_eq!(pixel.fogi[1], 1);
        assert_eq!(pixel.fogf[1][2], 0.0);
        assert_eq!(pixel.fogi[3], 1);
        assert_eq!(pixel.fogcolor, [0, 0, 0, 0]);
    }

    #[test]
    fn fog_params_and_color() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::FOGPARAM0, fog::EXP.insert(0, 127));
        regs.bp(addr::FOGBMAGNITUDE, 0x1234);
        regs.bp(addr::FOGBEXPONENT, 7);
        regs.bp(addr::FOGPARAM3, fog::EXP.insert(0, 128));
        regs.bp(addr::FOGCOLOR, 0x11_2233);
        regs.rebuild();

        let pixel = regs.tracker.pixel_constants();
        assert_eq!(pixel.fogf[1][0], 1.0);
        assert_eq!(pixel.fogi[1], 0x1234);
        assert_eq!(pixel.fogf[1][2], 2.0);
        assert_eq!(pixel.fogi[3], 7);
        assert_eq!(&pixel.fogcolor[..3], &[0x11, 0x22, 0x33]);
        assert_eq!(regs.tracker.uber_constants().fog_param3, fog::EXP.insert(0, 128));
    }

    #[test]
    fn fog_range_follows_viewport() {
        let mut regs = Regs::new(&VideoConfig {
            efb_scale: 2,
            ..Default::default()
        });
        regs.xf_f32(reg::VIEWPORT, 320.0);
        regs.bp(addr::FOGRANGE_K0 + 4, fog::RANGE_K_HI.insert(0, 512));
        regs.bp(
            addr::FOGRANGE,
            fog::RANGE_ENABLED.insert(fog::RANGE_CENTER.insert(0, 342 + 320), 1),
        );
        regs.rebuild();
        let fogf = regs.tracker.pixel_constants().fogf[0];
        assert_eq!(fogf[0], 0.0);
        assert_eq!(fogf[1], 1280.0);
        assert_eq!(fogf[2], 2.0);

        // Disabling the range falls back to the identity adjustment.
        regs.bp(addr::FOGRANGE, 0);
        regs.rebuild();
        assert_eq!(&regs.tracker.pixel_constants().fogf[0][..3], &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn indirect_matrix_scale_is_stored_as_17_minus_exponent() {
        let mut regs = Regs::new(&VideoConfig::default());
        // s0 = 1, s1 = 1 -> 1 | 1 << 2 = 5
        let col0 = ind_mtx::SCALE.insert(ind_mtx::ROW0.insert(0, 0x7FF), 1);
        let col1 = ind_mtx::SCALE.insert(ind_mtx::ROW1.insert(0, 100), 1);
        regs.bp(addr::IND_MTXA0 + 3, col0);
        regs.bp(addr::IND_MTXA0 + 4, col1);
        regs.rebuild();

        let mtx = regs.tracker.pixel_constants().indtexmtx;
        assert_eq!(mtx[2], [-1, 0, 0, 12]);
        assert_eq!(mtx[3], [0, 100, 0, 12]);
        assert_eq!(mtx[0][3], 17);
    }

    #[test]
    fn indirect_scale_pairs() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::RAS1_SS1, 0x4321);
        regs.rebuild();
        let pixel = regs.tracker.pixel_constants();
        assert_eq!(pixel.indtexscale[1], [1, 2, 3, 4]);
        assert_eq!(pixel.indtexscale[0], [0; 4]);
    }

    #[test]
    fn indirect_references_for_active_stages() {
        let mut regs = Regs::new(&VideoConfig::default());
        let gen = genmode::NUM_IND_STAGES.insert(genmode::NUM_TEV_STAGES.insert(0, 2), 1);
        regs.bp(addr::GENMODE, gen);
        // stage 0 -> indirect stage 0, active
        let active = tev_ind::MID.insert(0, 1);
        regs.bp(addr::IND_CMD0, active);
        // stage 1 -> indirect stage 2, out of range
        regs.bp(addr::IND_CMD0 + 1, tev_ind::BT.insert(0, 2));
        // stage 2 -> indirect stage 0, inactive
        regs.bp(addr::IND_CMD0 + 2, 0);
        // stage 5 is past the last stage
        regs.bp(addr::IND_CMD0 + 5, active);
        // indirect stage 0: texmap 6, texcoord 3
        regs.bp(addr::IREF, 6 | (3 << 3));
        regs.rebuild();

        let uber = regs.tracker.uber_constants();
        assert_eq!(uber.iref[0], 3 | (6 << 8) | (1 << 16));
        assert_eq!(uber.tevind[0][0], active | (1 << 31));
        assert_eq!(uber.tevind[1][0], 0);
        assert_eq!(uber.tevind[2][0], 1 << 31);
        assert_eq!(uber.tevind[5][0], 0);
    }

    #[test]
    fn tev_registers_split_into_banks() {
        let mut regs = Regs::new(&VideoConfig::default());
        // c1: red = -1, alpha = 200
        regs.bp(addr::TEV_REGISTERL0 + 2, tev_register::HIGH.insert(0x7FF, 200));
        // k0: blue = 10, green = 20
        let konst = tev_register::KONST.insert(0, 1);
        regs.bp(
            addr::TEV_REGISTERL0 + 1,
            konst | tev_register::HIGH.insert(10, 20),
        );
        // k0: red = 100, alpha = 50
        regs.bp(addr::TEV_REGISTERL0, konst | tev_register::HIGH.insert(100, 50));
        regs.rebuild();

        let pixel = regs.tracker.pixel_constants();
        assert_eq!(pixel.colors[1], [-1, 0, 0, 200]);
        assert_eq!(pixel.kcolors[0], [100, 20, 10, 50]);

        let konst = regs.tracker.uber_constants().konst;
        assert_eq!(konst[12], [100, 20, 10, 0]);
        assert_eq!(konst[16], [100; 4]);
        assert_eq!(konst[20], [20; 4]);
        assert_eq!(konst[24], [10; 4]);
        assert_eq!(konst[28], [50; 4]);
        assert_eq!(konst[8], [0; 4]);
    }

    #[test]
    fn alpha_refs_and_destination_alpha() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::ALPHACOMPARE, alpha_test::REF1.insert(0x40, 0x80));
        regs.bp(addr::CONSTANTALPHA, constant_alpha::ENABLE.insert(0x7F, 1));
        regs.rebuild();
        assert_eq!(regs.tracker.pixel_constants().alpha, [0x40, 0x80, 0, 0x7F]);
        assert_eq!(regs.tracker.uber_constants().dstalpha, 0x17F);
    }

    #[test]
    fn depth_texture_constants() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::ZTEX2, ztex::TYPE.insert(0, 2));
        regs.bp(addr::BIAS, 0x12_3456);
        regs.rebuild();
        assert_eq!(regs.tracker.pixel_constants().zbias[0], [65536, 256, 1, 0]);
        assert_eq!(regs.tracker.pixel_constants().zbias[1][3], 0x12_3456);

        // Type 3 is undefined and keeps the previous weights.
        regs.bp(addr::ZTEX2, ztex::TYPE.insert(0, 3));
        regs.rebuild();
        assert_eq!(regs.tracker.pixel_constants().zbias[0], [65536, 256, 1, 0]);
    }

    #[test]
    fn texcoord_scale_and_texture_size() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::SU_SSIZE0 + 6, 63);
        regs.bp(addr::SU_SSIZE0 + 7, 127);
        regs.rebuild();
        regs.tracker.set_tex_dims(3, 64, 32);
        let dims = regs.tracker.pixel_constants().texdims[3];
        assert_eq!(dims, [1.0 / 8192.0, 1.0 / 4096.0, 8192.0, 16384.0]);
    }

    #[test]
    fn texgen_projection_mask() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.xf(reg::TEX_MTX_INFO + 1, tex_mtx_info::PROJECTION.insert(0, 1));
        regs.xf(reg::TEX_MTX_INFO + 6, tex_mtx_info::PROJECTION.insert(0, 1));
        regs.rebuild();
        assert_eq!(regs.tracker.uber_constants().projection, 0b0100_0010);
        assert_eq!(regs.tracker.vertex_constants().xfmem_pack1[6][0], 2);
    }

    #[test]
    fn vertex_matrices_and_materials() {
        let mut regs = Regs::new(&VideoConfig::default());
        // Position matrix 3 (rows 3..6) and its normal matrix.
        regs.xf(reg::MATRIX_INDEX_A, 3);
        regs.xf_f32(3 * 4, 2.0);
        regs.xf_f32(NORMAL_MATRICES + 3 * 3 + 1, 5.0);
        regs.xf(reg::MATERIAL1, 0xFF80_4000);
        regs.xf(reg::NUM_COLOR_CHANS, 2);
        regs.rebuild();

        let vertex = regs.tracker.vertex_constants();
        assert_eq!(vertex.posnormal_matrix[0], [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(vertex.posnormal_matrix[3], [0.0, 5.0, 0.0, 0.0]);
        assert_eq!(vertex.transform_matrices[3], [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(vertex.normal_matrices[3], [0.0, 5.0, 0.0, 0.0]);
        assert_eq!(vertex.materials[3], [255, 128, 64, 0]);
        assert_eq!(vertex.num_color_chans, 2);
    }

    #[test]
    fn light_direction_is_normalized() {
        let mut regs = Regs::new(&VideoConfig::default());
        let base = LIGHTS + LIGHT_STRIDE;
        regs.xf(base + 3, 0x0102_0304);
        regs.xf_f32(base + 13, 3.0);
        regs.xf_f32(base + 14, 4.0);
        regs.rebuild();

        let lights = regs.tracker.vertex_constants().lights;
        assert_eq!(lights[1].color, [1, 2, 3, 4]);
        assert_eq!(lights[1].dir, [0.6, 0.8, 0.0, 0.0]);
        // A zero direction stays zero.
        assert_eq!(lights[0].dir, [0.0; 4]);
    }

    #[test]
    fn viewport_feeds_both_blocks() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.xf_f32(reg::VIEWPORT, 320.0);
        regs.xf_f32(reg::VIEWPORT + 1, -240.0);
        regs.xf_f32(reg::VIEWPORT + 2, 16_777_216.0);
        regs.xf_f32(reg::VIEWPORT + 5, 8_388_608.0);
        regs.rebuild();

        let pixel = regs.tracker.pixel_constants();
        assert_eq!(pixel.zbias[1][0], 8_388_608);
        assert_eq!(pixel.zbias[1][1], 16_777_216);

        let vertex = regs.tracker.vertex_constants();
        let offset = 7.0f32 / 12.0 - 0.5;
        assert_eq!(vertex.pixel_center_correction[0], offset * 2.0 / 640.0);
        assert_eq!(vertex.pixel_center_correction[1], offset * 2.0 / 480.0);
        assert_eq!(vertex.pixel_center_correction[2], 1.0);
        assert_eq!(vertex.pixel_center_correction[3], 0.5);
        assert_eq!(vertex.viewport_size, [640.0, 480.0, 0.0, 0.0]);
    }

    #[test]
    fn upload_flags() {
        let mut regs = Regs::new(&VideoConfig::default());
        assert!(regs.tracker.take_pixel_changed());
        assert!(!regs.tracker.take_pixel_changed());
        assert!(regs.tracker.take_vertex_changed());

        regs.xf(reg::AMBIENT0, 1);
        regs.rebuild();
        assert!(!regs.tracker.take_pixel_changed());
        assert!(regs.tracker.take_vertex_changed());

        regs.tracker.set_vertex_components(0x1234);
        assert!(regs.tracker.take_vertex_changed());
        regs.tracker.set_vertex_components(0x1234);
        assert!(!regs.tracker.take_vertex_changed());
    }

    #[test]
    fn restore_recomputes_from_registers() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::ALPHACOMPARE, 0x00_2211);
        regs.bp(
            addr::TEV_REGISTERL0 + 6,
            tev_register::KONST.insert(0, 1) | tev_register::HIGH.insert(77, 88),
        );
        regs.tracker.set_zslope(1.0, 2.0, 3.0);
        regs.rebuild();
        let state = regs.tracker.save_state();

        // Corrupt a derived value; restore must recompute it.
        let mut tampered = state;
        tampered.pixel.alpha = [9, 9, 9, 9];

        let mut fresh = RegisterStateTracker::new(&VideoConfig::default());
        fresh.restore_state(&tampered, &regs.bp, &regs.xf);
        assert_eq!(fresh.pixel_constants(), regs.tracker.pixel_constants());
        assert_eq!(fresh.uber_constants(), regs.tracker.uber_constants());
        assert!(fresh.is_clean());
    }

    #[test]
    fn restore_ignores_every_saved_register_derived_lane() {
        let mut regs = Regs::new(&VideoConfig::default());
        regs.bp(addr::FOGCOLOR, 0x12_3456);
        regs.tracker.set_tex_dims(1, 64, 32);
        regs.tracker.set_zslope(0.5, 0.25, 1.0);
        regs.rebuild();
        let saved = regs.tracker.save_state();

        let mut tampered = saved;
        for lane in bytemuck::cast_slice_mut::<PixelConstants, u32>(std::slice::from_mut(
            &mut tampered.pixel,
        )) {
            *lane = 9;
        }
        tampered.pixel.colors = saved.pixel.colors;
        tampered.pixel.kcolors = saved.pixel.kcolors;
        tampered.pixel.zslope = saved.pixel.zslope;
        for (dims, kept) in tampered.pixel.texdims.iter_mut().zip(&saved.pixel.texdims) {
            dims[..2].copy_from_slice(&kept[..2]);
        }

        let mut fresh = RegisterStateTracker::new(&VideoConfig::default());
        fresh.restore_state(&tampered, &regs.bp, &regs.xf);
        let got = fresh.pixel_constants();
        let want = regs.tracker.pixel_constants();
        assert_eq!(got.alpha, want.alpha);
        assert_eq!(got.zbias, want.zbias);
        assert_eq!(got.fogcolor, want.fogcolor);
        assert_eq!(got.fogi, want.fogi);
        assert_eq!(got.fogf, want.fogf);
        assert_eq!(got.texdims, want.texdims);
        assert_eq!(got, want);
    }
}
