use std::rc::Rc;

use crate::foundation::error::SwrastResult;
use crate::foundation::geom::{Affine, BezPath, DeviceRect, ShapeStroke};
use crate::render::shape::{RasterizerKind, ShapeRenderer, create_shape_renderer};
use crate::surface::compositor::PixelCompositor;
use crate::surface::texture::{Texture, TextureFactory, TextureSlot, WrapMode};

/// Software-path rendering context.
///
/// The public facade of the crate: owns the rasterizer backend selected at
/// construction and the reusable texture slots (read-back buffer and
/// image-paint texture; the mask texture lives with the masked backend).
/// One instance per rendering thread; no method is reentrant-safe across
/// threads. Dropping the context without calling [`RenderingContext::dispose`]
/// is fine: weak retention already lets unused textures be reclaimed.
pub struct RenderingContext {
    factory: Rc<dyn TextureFactory>,
    renderer: Box<dyn ShapeRenderer>,
    read_back: TextureSlot,
    image_paint: TextureSlot,
}

impl RenderingContext {
    /// Build a context, selecting the rasterizer backend from `kind` once.
    pub fn new(factory: Rc<dyn TextureFactory>, kind: RasterizerKind) -> Self {
        let renderer = create_shape_renderer(kind, factory.clone());
        Self {
            factory,
            renderer,
            read_back: TextureSlot::new(),
            image_paint: TextureSlot::new(),
        }
    }

    /// Rasterize and composite one shape through the selected backend.
    ///
    /// A `stroke` of non-centered alignment is first expanded into filled
    /// geometry; a zero-area clip or degenerate output box renders nothing.
    #[tracing::instrument(skip(self, compositor, shape, stroke, transform))]
    pub fn render_shape(
        &mut self,
        compositor: &mut dyn PixelCompositor,
        shape: &BezPath,
        stroke: Option<&ShapeStroke>,
        transform: Affine,
        clip: DeviceRect,
        antialiased: bool,
    ) -> SwrastResult<()> {
        self.renderer
            .render_shape(compositor, shape, stroke, transform, clip, antialiased)
    }

    /// Return the read-back render target, at least `width` by `height`.
    pub fn validate_read_back_buffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> SwrastResult<Rc<dyn Texture>> {
        let factory = &self.factory;
        self.read_back.validate(width, height, |w, h| {
            factory.create_rt_texture(w, h, WrapMode::ClampNotNeeded)
        })
    }

    /// Return the image-paint texture, at least `width` by `height`.
    pub fn validate_image_paint_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> SwrastResult<Rc<dyn Texture>> {
        use crate::surface::texture::{PixelFormat, TextureUsage};
        let factory = &self.factory;
        self.image_paint.validate(width, height, |w, h| {
            factory.create_texture(
                PixelFormat::ArgbPremul,
                TextureUsage::Default,
                WrapMode::Repeat,
                w,
                h,
            )
        })
    }

    /// Release every cached texture slot and the backend. Idempotent.
    pub fn dispose(&mut self) {
        self.read_back.dispose();
        self.image_paint.dispose();
        self.renderer.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::soft::SoftTextureFactory;

    #[test]
    fn read_back_and_image_paint_slots_are_independent() {
        let factory = Rc::new(SoftTextureFactory::new());
        let mut ctx = RenderingContext::new(factory.clone(), RasterizerKind::Precise);

        let rb = ctx.validate_read_back_buffer(32, 16).unwrap();
        let ip = ctx.validate_image_paint_texture(8, 8).unwrap();
        assert!(!Rc::ptr_eq(&rb, &ip));
        assert_eq!(factory.allocation_count(), 2);

        // Shrinking requests keep both textures, adjusting content size only.
        let rb2 = ctx.validate_read_back_buffer(16, 16).unwrap();
        assert!(Rc::ptr_eq(&rb, &rb2));
        assert_eq!(rb2.content_width(), 16);
        assert_eq!(factory.allocation_count(), 2);
    }

    #[test]
    fn dispose_twice_is_safe() {
        let factory = Rc::new(SoftTextureFactory::new());
        let mut ctx = RenderingContext::new(factory, RasterizerKind::Masked);
        let _rb = ctx.validate_read_back_buffer(4, 4).unwrap();
        ctx.dispose();
        ctx.dispose();
    }
}
