use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::foundation::error::{SwrastError, SwrastResult};
use crate::surface::texture::{PixelFormat, Texture, TextureFactory, TextureUsage, WrapMode};

/// Heap-backed software texture.
///
/// The default texture implementation for software destinations and tests;
/// a hardware pipeline substitutes its own [`TextureFactory`].
pub struct SoftTexture {
    format: PixelFormat,
    physical_width: u32,
    physical_height: u32,
    content_width: Cell<u32>,
    content_height: Cell<u32>,
    data: RefCell<Vec<u8>>,
}

impl SoftTexture {
    fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            format,
            physical_width: width,
            physical_height: height,
            content_width: Cell::new(width),
            content_height: Cell::new(height),
            data: RefCell::new(vec![0u8; len]),
        }
    }
}

impl Texture for SoftTexture {
    fn format(&self) -> PixelFormat {
        self.format
    }

    fn physical_width(&self) -> u32 {
        self.physical_width
    }

    fn physical_height(&self) -> u32 {
        self.physical_height
    }

    fn content_width(&self) -> u32 {
        self.content_width.get()
    }

    fn content_height(&self) -> u32 {
        self.content_height.get()
    }

    fn set_content_size(&self, width: u32, height: u32) {
        self.content_width.set(width.min(self.physical_width));
        self.content_height.set(height.min(self.physical_height));
    }

    fn write_alpha_region(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> SwrastResult<()> {
        if self.format != PixelFormat::Alpha8 {
            return Err(SwrastError::unsupported(
                "alpha upload requires an Alpha8 texture",
            ));
        }
        if x + width > self.physical_width || y + height > self.physical_height {
            return Err(SwrastError::validation(
                "alpha upload region exceeds physical texture extent",
            ));
        }
        if data.len() != width as usize * height as usize {
            return Err(SwrastError::validation(
                "alpha upload byte length mismatch",
            ));
        }

        let stride = self.physical_width as usize;
        let mut dst = self.data.borrow_mut();
        for row in 0..height as usize {
            let src = &data[row * width as usize..(row + 1) * width as usize];
            let base = (y as usize + row) * stride + x as usize;
            dst[base..base + width as usize].copy_from_slice(src);
        }
        Ok(())
    }

    fn data(&self) -> Ref<'_, [u8]> {
        Ref::map(self.data.borrow(), |v| v.as_slice())
    }
}

/// Factory producing [`SoftTexture`] handles.
///
/// Counts allocations so callers can observe cache behavior.
#[derive(Default)]
pub struct SoftTextureFactory {
    allocations: Cell<u64>,
}

impl SoftTextureFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of textures allocated through this factory so far.
    pub fn allocation_count(&self) -> u64 {
        self.allocations.get()
    }
}

impl TextureFactory for SoftTextureFactory {
    fn create_texture(
        &self,
        format: PixelFormat,
        _usage: TextureUsage,
        _wrap: WrapMode,
        width: u32,
        height: u32,
    ) -> SwrastResult<Rc<dyn Texture>> {
        if width == 0 || height == 0 {
            return Err(SwrastError::validation(
                "texture dimensions must be positive",
            ));
        }
        self.allocations.set(self.allocations.get() + 1);
        Ok(Rc::new(SoftTexture::new(format, width, height)))
    }
}
