use std::rc::Rc;

use crate::foundation::error::{SwrastError, SwrastResult};
use crate::raster::consumer::{AlphaConsumer, AlphaMap};
use crate::surface::texture::Texture;

/// Persistent state of the mask-materializing coverage consumer.
///
/// Unlike the direct accumulator this one reconstructs the whole coverage
/// mask in memory, addressed by absolute row, so it can later be uploaded
/// into a cached mask texture and composited via an alpha-mask fill.
#[derive(Debug, Default)]
pub struct MaskCoverageState {
    alpha_map: AlphaMap,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    buf: Vec<u8>,
}

impl MaskCoverageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new sweep; the mask starts out fully transparent.
    pub fn init(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.x = x;
        self.y = y;
        self.w = w;
        self.h = h;
        self.buf.clear();
        self.buf.resize(w as usize * h as usize, 0);
    }

    /// View the materialized mask produced by the last sweep.
    pub fn as_mask_data(&self) -> MaskData<'_> {
        MaskData {
            x: self.x,
            y: self.y,
            width: self.w as u32,
            height: self.h as u32,
            coverage: &self.buf,
        }
    }
}

impl AlphaConsumer for MaskCoverageState {
    fn origin_x(&self) -> i32 {
        self.x
    }

    fn origin_y(&self) -> i32 {
        self.y
    }

    fn width(&self) -> i32 {
        self.w
    }

    fn height(&self) -> i32 {
        self.h
    }

    fn set_max_alpha(&mut self, max_alpha: u32) {
        self.alpha_map.ensure(max_alpha);
    }

    fn set_and_clear_relative_alphas(
        &mut self,
        deltas: &mut [i32],
        pix_y: i32,
        pix_from: i32,
        pix_to: i32,
    ) -> SwrastResult<()> {
        let row = pix_y - self.y;
        if row < 0 || row >= self.h {
            return Err(SwrastError::validation(
                "coverage row outside the mask bounding box",
            ));
        }

        let rel_from = pix_from - self.x;
        let rel_to = pix_to - self.x;
        let rel_end = rel_to.min(self.w);
        let base = row as usize * self.w as usize;

        let mut accum = 0i32;
        for rel in rel_from..rel_end {
            accum += deltas[rel as usize];
            deltas[rel as usize] = 0;
            self.buf[base + rel as usize] = self.alpha_map.alpha_for(accum);
        }
        let clear_at = if rel_to <= self.w { rel_to } else { self.w };
        deltas[clear_at as usize] = 0;
        Ok(())
    }

    // clear_alphas: default no-op; init() pre-zeroes the whole mask.
}

/// A materialized rectangular coverage mask, borrowed from the consumer
/// that produced it. Created per render call and consumed immediately.
#[derive(Clone, Copy, Debug)]
pub struct MaskData<'a> {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Row-major coverage bytes, stride == `width`.
    pub coverage: &'a [u8],
}

impl MaskData<'_> {
    /// Upload this mask into the top-left corner of `texture`.
    ///
    /// The texture's physical extent must already accommodate the mask;
    /// the cache slot guarantees that after a successful validate.
    pub fn upload_to_texture(&self, texture: &Rc<dyn Texture>) -> SwrastResult<()> {
        texture.write_alpha_region(0, 0, self.width, self.height, self.coverage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_rows_land_at_absolute_positions() {
        let mut state = MaskCoverageState::new();
        state.init(4, 10, 3, 2);
        state.set_max_alpha(256);

        // Second row only; first row stays transparent.
        let mut deltas = vec![0i32; 5];
        deltas[0] = 256;
        deltas[1] = -128;
        deltas[3] = -128;
        state
            .set_and_clear_relative_alphas(&mut deltas, 11, 4, 7)
            .unwrap();

        let mask = state.as_mask_data();
        assert_eq!((mask.x, mask.y, mask.width, mask.height), (4, 10, 3, 2));
        assert_eq!(&mask.coverage[0..3], &[0, 0, 0]);
        assert_eq!(&mask.coverage[3..6], &[255, 128, 128]);
        assert_eq!(deltas, vec![0i32; 5]);
    }

    #[test]
    fn init_resets_previous_coverage() {
        let mut state = MaskCoverageState::new();
        state.init(0, 0, 2, 1);
        state.set_max_alpha(1);
        let mut deltas = vec![1i32, 0, -1, 0];
        state
            .set_and_clear_relative_alphas(&mut deltas, 0, 0, 2)
            .unwrap();
        assert_eq!(state.as_mask_data().coverage, &[255, 255]);

        state.init(0, 0, 2, 1);
        assert_eq!(state.as_mask_data().coverage, &[0, 0]);
    }

    #[test]
    fn rows_outside_the_box_are_rejected() {
        let mut state = MaskCoverageState::new();
        state.init(0, 0, 2, 1);
        let mut deltas = vec![0i32; 4];
        let err = state
            .set_and_clear_relative_alphas(&mut deltas, 5, 0, 2)
            .unwrap_err();
        assert!(matches!(err, SwrastError::Validation(_)));
    }
}
