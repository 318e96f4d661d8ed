use std::borrow::Cow;
use std::rc::Rc;

use crate::foundation::error::SwrastResult;
use crate::foundation::geom::{Affine, BezPath, DeviceRect, ShapeStroke, StrokeAlignment};
use crate::raster::consumer::DirectCoverageState;
use crate::raster::engine::{Precision, RasterScratch, setup_renderer};
use crate::raster::mask::MaskCoverageState;
use crate::raster::pool::ScratchPool;
use crate::surface::compositor::PixelCompositor;
use crate::surface::texture::{Texture, TextureFactory, TextureSlot, WrapMode};

/// Which rasterizer backend a rendering context uses.
///
/// Chosen once from configuration at context construction; never switched
/// at runtime. All variants produce caller-equivalent coverage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterizerKind {
    /// Direct streaming, no scratch pooling. Simplest, slowest.
    Simple,
    /// Materializes a mask and composits it through a cached mask texture.
    Masked,
    /// Direct streaming, pooled scratch, single-precision sweep.
    Fast,
    /// Direct streaming, pooled scratch, double-precision sweep.
    #[default]
    Precise,
}

/// One rasterizer backend: fill/stroke a shape into the destination.
pub trait ShapeRenderer {
    /// Rasterize `shape` (optionally stroked) under `transform`, limited to
    /// `clip`, and composite the coverage through `compositor`.
    fn render_shape(
        &mut self,
        compositor: &mut dyn PixelCompositor,
        shape: &BezPath,
        stroke: Option<&ShapeStroke>,
        transform: Affine,
        clip: DeviceRect,
        antialiased: bool,
    ) -> SwrastResult<()>;

    /// Release backend-held resources. Only the masked variant holds any.
    fn dispose(&mut self) {}
}

/// Select the backend implementation for `kind`.
///
/// Only the masked variant retains the factory; the streaming variants
/// never touch textures.
pub fn create_shape_renderer(
    kind: RasterizerKind,
    factory: Rc<dyn TextureFactory>,
) -> Box<dyn ShapeRenderer> {
    tracing::debug!(?kind, "selecting rasterizer backend");
    match kind {
        RasterizerKind::Simple => Box::new(SimpleShapeRenderer::new()),
        RasterizerKind::Masked => Box::new(MaskedShapeRenderer::new(factory)),
        RasterizerKind::Fast => Box::new(FastShapeRenderer::new()),
        RasterizerKind::Precise => Box::new(PreciseShapeRenderer::new()),
    }
}

/// Non-centered strokes are pre-expanded into filled geometry; centered
/// strokes pass through for the rasterizer to handle natively (pre-expanding
/// those would double-process the interior and exterior offsets).
fn normalize_stroke<'a>(
    shape: &'a BezPath,
    stroke: Option<&'a ShapeStroke>,
) -> (Cow<'a, BezPath>, Option<&'a ShapeStroke>) {
    match stroke {
        Some(s) if s.alignment != StrokeAlignment::Centered => {
            (Cow::Owned(s.to_filled_shape(shape)), None)
        }
        other => (Cow::Borrowed(shape), other),
    }
}

/// Shared streaming path: sweep into the direct accumulator.
#[allow(clippy::too_many_arguments)]
fn stream_shape(
    scratch: &mut RasterScratch,
    state: &mut DirectCoverageState,
    compositor: &mut dyn PixelCompositor,
    shape: &BezPath,
    stroke: Option<&ShapeStroke>,
    transform: Affine,
    clip: DeviceRect,
    antialiased: bool,
    precision: Precision,
) -> SwrastResult<()> {
    let (fill, stroke) = normalize_stroke(shape, stroke);
    let mut renderer = setup_renderer(
        scratch,
        &fill,
        stroke,
        transform,
        clip,
        antialiased,
        precision,
    );
    let b = renderer.bounds();
    if b.is_empty() {
        return Ok(());
    }
    state.init(b.x, b.y, b.width, b.height);
    let mut consumer = state.bind(compositor);
    renderer.produce_alphas(&mut consumer)
}

/// Direct streaming backend without scratch pooling.
pub struct SimpleShapeRenderer {
    state: DirectCoverageState,
}

impl SimpleShapeRenderer {
    pub fn new() -> Self {
        Self {
            state: DirectCoverageState::new(),
        }
    }
}

impl Default for SimpleShapeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeRenderer for SimpleShapeRenderer {
    fn render_shape(
        &mut self,
        compositor: &mut dyn PixelCompositor,
        shape: &BezPath,
        stroke: Option<&ShapeStroke>,
        transform: Affine,
        clip: DeviceRect,
        antialiased: bool,
    ) -> SwrastResult<()> {
        let mut scratch = RasterScratch::new();
        stream_shape(
            &mut scratch,
            &mut self.state,
            compositor,
            shape,
            stroke,
            transform,
            clip,
            antialiased,
            Precision::Double,
        )
    }
}

/// Direct streaming backend with pooled scratch and a single-precision sweep.
pub struct FastShapeRenderer {
    pool: ScratchPool,
    state: DirectCoverageState,
}

impl FastShapeRenderer {
    pub fn new() -> Self {
        Self {
            pool: ScratchPool::new(),
            state: DirectCoverageState::new(),
        }
    }
}

impl Default for FastShapeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeRenderer for FastShapeRenderer {
    fn render_shape(
        &mut self,
        compositor: &mut dyn PixelCompositor,
        shape: &BezPath,
        stroke: Option<&ShapeStroke>,
        transform: Affine,
        clip: DeviceRect,
        antialiased: bool,
    ) -> SwrastResult<()> {
        let mut scratch = self.pool.acquire();
        stream_shape(
            &mut scratch,
            &mut self.state,
            compositor,
            shape,
            stroke,
            transform,
            clip,
            antialiased,
            Precision::Single,
        )
    }
}

/// Direct streaming backend with pooled scratch and a double-precision sweep.
pub struct PreciseShapeRenderer {
    pool: ScratchPool,
    state: DirectCoverageState,
}

impl PreciseShapeRenderer {
    pub fn new() -> Self {
        Self {
            pool: ScratchPool::new(),
            state: DirectCoverageState::new(),
        }
    }
}

impl Default for PreciseShapeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeRenderer for PreciseShapeRenderer {
    fn render_shape(
        &mut self,
        compositor: &mut dyn PixelCompositor,
        shape: &BezPath,
        stroke: Option<&ShapeStroke>,
        transform: Affine,
        clip: DeviceRect,
        antialiased: bool,
    ) -> SwrastResult<()> {
        let mut scratch = self.pool.acquire();
        stream_shape(
            &mut scratch,
            &mut self.state,
            compositor,
            shape,
            stroke,
            transform,
            clip,
            antialiased,
            Precision::Double,
        )
    }
}

/// Materializing backend: rasterizes into a full mask, uploads it to the
/// cached mask texture, then composites via an alpha-mask fill.
pub struct MaskedShapeRenderer {
    factory: Rc<dyn TextureFactory>,
    pool: ScratchPool,
    state: MaskCoverageState,
    mask_slot: TextureSlot,
    // Owning reference that keeps the slot's weak retention alive between
    // calls; the slot itself only checks liveness.
    mask_tex: Option<Rc<dyn Texture>>,
}

impl MaskedShapeRenderer {
    pub fn new(factory: Rc<dyn TextureFactory>) -> Self {
        Self {
            factory,
            pool: ScratchPool::new(),
            state: MaskCoverageState::new(),
            mask_slot: TextureSlot::new(),
            mask_tex: None,
        }
    }
}

impl ShapeRenderer for MaskedShapeRenderer {
    fn render_shape(
        &mut self,
        compositor: &mut dyn PixelCompositor,
        shape: &BezPath,
        stroke: Option<&ShapeStroke>,
        transform: Affine,
        clip: DeviceRect,
        antialiased: bool,
    ) -> SwrastResult<()> {
        let (fill, stroke) = normalize_stroke(shape, stroke);
        let mut scratch = self.pool.acquire();
        let mut renderer = setup_renderer(
            &mut scratch,
            &fill,
            stroke,
            transform,
            clip,
            antialiased,
            Precision::Double,
        );
        let b = renderer.bounds();
        if b.is_empty() {
            return Ok(());
        }
        self.state.init(b.x, b.y, b.width, b.height);
        renderer.produce_alphas(&mut self.state)?;
        drop(renderer);
        drop(scratch);

        let mask = self.state.as_mask_data();
        let factory = &self.factory;
        let tex = self.mask_slot.validate(mask.width, mask.height, |w, h| {
            factory.create_mask_texture(w, h, WrapMode::ClampNotNeeded)
        })?;
        self.mask_tex = Some(Rc::clone(&tex));
        mask.upload_to_texture(&tex)?;

        let data = tex.data();
        compositor.fill_alpha_mask(
            &data,
            mask.x,
            mask.y,
            mask.width,
            mask.height,
            0,
            tex.physical_width() as usize,
        )
    }

    fn dispose(&mut self) {
        self.mask_tex = None;
        self.mask_slot.dispose();
    }
}
