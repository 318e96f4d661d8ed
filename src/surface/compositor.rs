use crate::foundation::error::SwrastResult;

/// Destination-surface boundary: blends coverage into pixels.
///
/// Implementations live in the surrounding pipeline; this crate only emits
/// alpha rows and materialized masks at device coordinates. Both entry
/// points receive display alpha bytes (0..=255), already translated through
/// the accumulator's lookup table.
pub trait PixelCompositor {
    /// Blend one alpha byte row whose first byte maps to device pixel
    /// `(x, y)`.
    fn compose_alpha_row(&mut self, alphas: &[u8], x: i32, y: i32) -> SwrastResult<()>;

    /// Blend a materialized alpha mask. `mask` is row-major with the given
    /// `stride` (bytes per row, possibly wider than `width`), starting at
    /// `offset`; the mask's top-left corner maps to device pixel `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    fn fill_alpha_mask(
        &mut self,
        mask: &[u8],
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        offset: usize,
        stride: usize,
    ) -> SwrastResult<()>;
}
