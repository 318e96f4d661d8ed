use std::cell::Ref;
use std::rc::{Rc, Weak};

use crate::foundation::error::SwrastResult;

/// Pixel layout of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Single-channel 8-bit coverage/alpha.
    Alpha8,
    /// 32-bit premultiplied ARGB.
    ArgbPremul,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Alpha8 => 1,
            PixelFormat::ArgbPremul => 4,
        }
    }
}

/// Intended usage of a texture at creation time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureUsage {
    #[default]
    Default,
    RenderTarget,
}

/// Sampling wrap mode requested at creation time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    /// The texture is never sampled outside its content; no wrap needed.
    #[default]
    ClampNotNeeded,
    Repeat,
}

/// An opaque device-resident texture handle.
///
/// Physical dimensions are fixed at allocation; the logical content size may
/// be any value up to them and is adjusted in place by the cache.
pub trait Texture {
    fn format(&self) -> PixelFormat;
    fn physical_width(&self) -> u32;
    fn physical_height(&self) -> u32;
    fn content_width(&self) -> u32;
    fn content_height(&self) -> u32;

    /// Adjust the logical content size without reallocating.
    fn set_content_size(&self, width: u32, height: u32);

    /// Write a rectangle of packed alpha bytes (stride == `width`) into an
    /// [`PixelFormat::Alpha8`] texture.
    fn write_alpha_region(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> SwrastResult<()>;

    /// Borrow the backing bytes (row stride == physical width in pixels).
    fn data(&self) -> Ref<'_, [u8]>;
}

/// Creates device-resident textures; supplied by the surrounding pipeline.
///
/// Allocation may block on device resource acquisition; failure propagates
/// as [`crate::SwrastError::ResourceExhausted`] and is never retried here.
pub trait TextureFactory {
    fn create_texture(
        &self,
        format: PixelFormat,
        usage: TextureUsage,
        wrap: WrapMode,
        width: u32,
        height: u32,
    ) -> SwrastResult<Rc<dyn Texture>>;

    /// Convenience for an [`PixelFormat::Alpha8`] coverage-mask texture.
    fn create_mask_texture(
        &self,
        width: u32,
        height: u32,
        wrap: WrapMode,
    ) -> SwrastResult<Rc<dyn Texture>> {
        self.create_texture(PixelFormat::Alpha8, TextureUsage::Default, wrap, width, height)
    }

    /// Convenience for a render-target texture used for read-back.
    fn create_rt_texture(
        &self,
        width: u32,
        height: u32,
        wrap: WrapMode,
    ) -> SwrastResult<Rc<dyn Texture>> {
        self.create_texture(
            PixelFormat::ArgbPremul,
            TextureUsage::RenderTarget,
            wrap,
            width,
            height,
        )
    }
}

/// One reusable-texture cache slot with weak retention.
///
/// The slot never holds a strong reference: once every caller has dropped
/// its handle the texture is reclaimable, and the next validate simply
/// reallocates. Growth is monotonic until an explicit release; shrinking
/// requests only adjust the logical content size.
#[derive(Default)]
pub struct TextureSlot {
    cached: Option<Weak<dyn Texture>>,
}

impl TextureSlot {
    pub fn new() -> Self {
        Self { cached: None }
    }

    /// Return a texture whose physical extent is at least `width` by
    /// `height`, reusing the cached one when it is still live and large
    /// enough, else releasing it and allocating through `alloc`.
    pub fn validate(
        &mut self,
        width: u32,
        height: u32,
        alloc: impl FnOnce(u32, u32) -> SwrastResult<Rc<dyn Texture>>,
    ) -> SwrastResult<Rc<dyn Texture>> {
        if let Some(weak) = &self.cached
            && let Some(tex) = weak.upgrade()
            && tex.physical_width() >= width
            && tex.physical_height() >= height
        {
            tex.set_content_size(width, height);
            return Ok(tex);
        }

        // Reclaimed externally or too small: release, then reallocate.
        self.cached = None;
        tracing::debug!(width, height, "allocating cache-slot texture");
        let tex = alloc(width, height)?;
        tex.set_content_size(width, height);
        self.cached = Some(Rc::downgrade(&tex));
        Ok(tex)
    }

    /// Unconditionally release the slot's claim. Idempotent.
    pub fn dispose(&mut self) {
        self.cached = None;
    }

    /// Whether the slot currently tracks a live texture.
    pub fn is_live(&self) -> bool {
        self.cached
            .as_ref()
            .is_some_and(|w| w.strong_count() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::soft::SoftTextureFactory;

    fn slot_alloc(
        factory: &SoftTextureFactory,
    ) -> impl Fn(u32, u32) -> SwrastResult<Rc<dyn Texture>> + '_ {
        move |w, h| factory.create_mask_texture(w, h, WrapMode::ClampNotNeeded)
    }

    #[test]
    fn equal_or_smaller_requests_reuse_the_texture() {
        let factory = SoftTextureFactory::new();
        let mut slot = TextureSlot::new();

        let first = slot.validate(64, 32, slot_alloc(&factory)).unwrap();
        let second = slot.validate(48, 32, slot_alloc(&factory)).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(second.physical_width(), 64);
        assert_eq!(second.content_width(), 48);
        assert_eq!(second.content_height(), 32);
    }

    #[test]
    fn larger_requests_reallocate() {
        let factory = SoftTextureFactory::new();
        let mut slot = TextureSlot::new();

        let first = slot.validate(32, 32, slot_alloc(&factory)).unwrap();
        let second = slot.validate(33, 32, slot_alloc(&factory)).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(second.physical_width(), 33);
    }

    #[test]
    fn reclaimed_texture_is_treated_like_a_miss() {
        let factory = SoftTextureFactory::new();
        let mut slot = TextureSlot::new();

        let first = slot.validate(16, 16, slot_alloc(&factory)).unwrap();
        assert!(slot.is_live());
        drop(first);
        // Weak retention: nothing else holds the texture, so it is gone.
        assert!(!slot.is_live());
        let second = slot.validate(8, 8, slot_alloc(&factory)).unwrap();
        assert_eq!(second.physical_width(), 8);
    }

    #[test]
    fn dispose_is_idempotent() {
        let factory = SoftTextureFactory::new();
        let mut slot = TextureSlot::new();

        let tex = slot.validate(16, 16, slot_alloc(&factory)).unwrap();
        slot.dispose();
        assert!(!slot.is_live());
        slot.dispose();
        assert!(!slot.is_live());
        drop(tex);

        // The slot recovers normally after disposal.
        let tex = slot.validate(4, 4, slot_alloc(&factory)).unwrap();
        assert_eq!(tex.physical_width(), 4);
    }

    #[test]
    fn failed_allocation_leaves_the_slot_empty() {
        let mut slot = TextureSlot::new();
        let result = slot.validate(16, 16, |_, _| {
            Err(crate::SwrastError::resource_exhausted("device out of memory"))
        });
        assert!(result.is_err());
        assert!(!slot.is_live());
    }
}
