//! swrast is a software-path rendering context for a 2-D vector graphics
//! pipeline.
//!
//! It rasterizes filled and stroked shapes into an antialiased alpha-coverage
//! mask and composites that mask onto a destination surface, while managing a
//! small set of reusable device-resident scratch textures.
//!
//! # Pipeline overview
//!
//! 1. **Normalize**: a non-centered stroke is expanded into filled geometry
//!    (`ShapeStroke` + kurbo stroking); centered strokes are handled by the
//!    rasterizer itself.
//! 2. **Rasterize**: the backend selected at construction
//!    ([`RasterizerKind`]) sweeps scanlines over the transformed, clipped
//!    shape, producing delta-encoded coverage rows from pooled scratch
//!    buffers.
//! 3. **Accumulate**: an alpha consumer prefix-sums the deltas, maps them
//!    through a cached lookup table, and either streams byte rows straight
//!    into the destination [`PixelCompositor`] or materializes a mask that
//!    is uploaded to a cached texture and composited as an alpha-mask fill.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Thread-confined**: one [`RenderingContext`] per rendering thread, no
//!   internal locking.
//! - **Weak retention**: cached textures never stay alive solely because of
//!   the cache; liveness is checked before every reuse.
//! - **Unconditional cleanup**: pooled scratch is returned on every exit
//!   path, success or failure, before the call returns.
#![forbid(unsafe_code)]

mod foundation;
mod raster;
mod render;
mod surface;

pub use foundation::error::{SwrastError, SwrastResult};
pub use foundation::geom::{
    Affine, BezPath, DeviceRect, Point, Rect, ShapeStroke, Stroke, StrokeAlignment, Vec2,
};
pub use raster::consumer::{AlphaConsumer, AlphaMap, DirectCoverageConsumer, DirectCoverageState};
pub use raster::engine::{MAX_AA_ALPHA, OutputBounds, Precision};
pub use raster::mask::{MaskCoverageState, MaskData};
pub use raster::pool::{ScratchGuard, ScratchPool};
pub use render::context::RenderingContext;
pub use render::shape::{
    FastShapeRenderer, MaskedShapeRenderer, PreciseShapeRenderer, RasterizerKind, ShapeRenderer,
    SimpleShapeRenderer, create_shape_renderer,
};
pub use surface::compositor::PixelCompositor;
pub use surface::soft::{SoftTexture, SoftTextureFactory};
pub use surface::texture::{
    PixelFormat, Texture, TextureFactory, TextureSlot, TextureUsage, WrapMode,
};
