use crate::foundation::error::{SwrastError, SwrastResult};
use crate::surface::compositor::PixelCompositor;

/// Scanline-coverage consumer fed by the rasterization engine.
///
/// The engine hands each covered row as delta-encoded coverage changes over
/// `[pix_from, pix_to)`; the consumer reconstructs absolute coverage via a
/// running sum, translates it through an alpha lookup table, and forwards the
/// resulting byte row. Origin and extent are fixed for the lifetime of one
/// sweep and describe the tight output bounding box.
pub trait AlphaConsumer {
    fn origin_x(&self) -> i32;
    fn origin_y(&self) -> i32;
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    /// Declare the coverage ceiling. Implementations rebuild their lookup
    /// table only when the value differs from the previous sweep.
    fn set_max_alpha(&mut self, max_alpha: u32);

    /// Whether the grouped (block-flag) delta application is supported.
    fn supports_block_flags(&self) -> bool {
        false
    }

    /// Consume one delta-encoded row and clear the consumed slots.
    ///
    /// The engine reuses `deltas` for the next scanline, so the consumed
    /// range must be zeroed here, plus the single slot just past the range
    /// (clamped to the declared width when the natural end exceeds it).
    fn set_and_clear_relative_alphas(
        &mut self,
        deltas: &mut [i32],
        pix_y: i32,
        pix_from: i32,
        pix_to: i32,
    ) -> SwrastResult<()>;

    /// Grouped delta application. Consumers that cannot support it fail
    /// fast rather than silently mis-render.
    fn set_and_clear_relative_alphas_blocked(
        &mut self,
        _block_flags: &[u32],
        _deltas: &mut [i32],
        _pix_y: i32,
        _pix_from: i32,
        _pix_to: i32,
    ) -> SwrastResult<()> {
        Err(SwrastError::unsupported(
            "block-flag alpha accumulation is not supported by this consumer",
        ))
    }

    /// Row had no coverage. A no-op for self-clearing consumers.
    fn clear_alphas(&mut self, _pix_y: i32) {}
}

/// Lookup table from raw accumulated coverage to a display alpha byte.
///
/// Entry `i` (0..=max) is `round(i * 255 / max)`. Rebuilt only when the
/// ceiling changes, amortizing the build across repeated renders at the
/// same precision.
#[derive(Debug, Default)]
pub struct AlphaMap {
    table: Vec<u8>,
}

impl AlphaMap {
    pub fn new() -> Self {
        Self { table: Vec::new() }
    }

    /// Rebuild for `max_alpha` if it differs from the cached ceiling.
    ///
    /// A ceiling of zero yields an all-transparent table rather than a
    /// division by zero; the engine never produces one, but callers may.
    pub fn ensure(&mut self, max_alpha: u32) {
        let len = max_alpha as usize + 1;
        if self.table.len() == len {
            return;
        }
        self.table.clear();
        self.table.reserve(len);
        if max_alpha == 0 {
            self.table.push(0);
            return;
        }
        for i in 0..=max_alpha {
            self.table
                .push(((i * 255 + max_alpha / 2) / max_alpha) as u8);
        }
    }

    /// Translate accumulated coverage, clamping out-of-range values.
    pub fn alpha_for(&self, coverage: i32) -> u8 {
        let max = self.table.len().saturating_sub(1);
        let idx = (coverage.max(0) as usize).min(max);
        self.table.get(idx).copied().unwrap_or(0)
    }

    #[cfg(test)]
    fn table(&self) -> &[u8] {
        &self.table
    }
}

/// Persistent state of the direct-to-destination accumulator.
///
/// Lives in the streaming shape renderers across calls so the alpha lookup
/// table survives between shapes; per-call origin/extent are reset by
/// [`DirectCoverageState::init`].
#[derive(Debug, Default)]
pub struct DirectCoverageState {
    alpha_map: AlphaMap,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    row_num: i32,
    row: Vec<u8>,
}

impl DirectCoverageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new sweep over the given output bounding box.
    pub fn init(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.x = x;
        self.y = y;
        self.w = w;
        self.h = h;
        self.row_num = 0;
    }

    /// Number of rows emitted since the last [`DirectCoverageState::init`].
    pub fn rows_emitted(&self) -> i32 {
        self.row_num
    }

    /// Bind this state to a destination compositor for one render call.
    pub fn bind<'a>(
        &'a mut self,
        compositor: &'a mut dyn PixelCompositor,
    ) -> DirectCoverageConsumer<'a> {
        DirectCoverageConsumer {
            state: self,
            compositor,
        }
    }
}

/// The direct accumulator bound to a destination compositor.
///
/// Streams each reconstructed row straight into the compositor without
/// materializing an intermediate mask.
pub struct DirectCoverageConsumer<'a> {
    state: &'a mut DirectCoverageState,
    compositor: &'a mut dyn PixelCompositor,
}

impl AlphaConsumer for DirectCoverageConsumer<'_> {
    fn origin_x(&self) -> i32 {
        self.state.x
    }

    fn origin_y(&self) -> i32 {
        self.state.y
    }

    fn width(&self) -> i32 {
        self.state.w
    }

    fn height(&self) -> i32 {
        self.state.h
    }

    fn set_max_alpha(&mut self, max_alpha: u32) {
        self.state.alpha_map.ensure(max_alpha);
    }

    fn set_and_clear_relative_alphas(
        &mut self,
        deltas: &mut [i32],
        pix_y: i32,
        pix_from: i32,
        pix_to: i32,
    ) -> SwrastResult<()> {
        let s = &mut *self.state;
        let rel_from = pix_from - s.x;
        let rel_to = pix_to - s.x;
        let rel_end = rel_to.min(s.w);

        s.row.clear();
        let mut accum = 0i32;
        for rel in rel_from..rel_end {
            accum += deltas[rel as usize];
            deltas[rel as usize] = 0;
            s.row.push(s.alpha_map.alpha_for(accum));
        }

        // Clear the slot just past the consumed range so the engine can
        // reuse the buffer; clamp to the declared width when the natural
        // end-of-range exceeds it.
        let clear_at = if rel_to <= s.w { rel_to } else { s.w };
        deltas[clear_at as usize] = 0;

        self.compositor.compose_alpha_row(&s.row, pix_from, pix_y)?;
        s.row_num += 1;
        Ok(())
    }

    // clear_alphas: default no-op. Accumulation state is self-clearing via
    // the paired set-and-clear call.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingCompositor {
        rows: Vec<(i32, i32, Vec<u8>)>,
    }

    impl PixelCompositor for RecordingCompositor {
        fn compose_alpha_row(&mut self, alphas: &[u8], x: i32, y: i32) -> SwrastResult<()> {
            self.rows.push((x, y, alphas.to_vec()));
            Ok(())
        }

        fn fill_alpha_mask(
            &mut self,
            _mask: &[u8],
            _x: i32,
            _y: i32,
            _width: u32,
            _height: u32,
            _offset: usize,
            _stride: usize,
        ) -> SwrastResult<()> {
            unreachable!("direct consumer never fills masks");
        }
    }

    #[test]
    fn alpha_map_endpoints_and_monotonicity() {
        for max in [1u32, 16, 64, 255, 256, 1024] {
            let mut map = AlphaMap::new();
            map.ensure(max);
            let t = map.table();
            assert_eq!(t[0], 0);
            assert_eq!(t[max as usize], 255);
            assert!(t.windows(2).all(|w| w[0] <= w[1]), "max_alpha={max}");
        }
    }

    #[test]
    fn alpha_map_zero_ceiling_is_fully_transparent() {
        let mut map = AlphaMap::new();
        map.ensure(0);
        assert_eq!(map.table(), &[0]);
        assert_eq!(map.alpha_for(0), 0);
        assert_eq!(map.alpha_for(77), 0);
    }

    #[test]
    fn alpha_map_rebuilds_only_on_ceiling_change() {
        let mut map = AlphaMap::new();
        map.ensure(256);
        let before = map.table().as_ptr();
        map.ensure(256);
        assert_eq!(map.table().as_ptr(), before);
        map.ensure(64);
        assert_eq!(map.table().len(), 65);
    }

    #[test]
    fn rows_are_emitted_in_call_order() {
        let mut state = DirectCoverageState::new();
        state.init(10, 20, 4, 3);
        let mut compositor = RecordingCompositor::default();
        let mut consumer = state.bind(&mut compositor);
        consumer.set_max_alpha(256);

        let mut deltas = vec![0i32; 6];
        for y in 20..23 {
            deltas[0] = 256;
            deltas[2] = -256;
            consumer.set_and_clear_relative_alphas(&mut deltas, y, 10, 12).unwrap();
        }
        drop(consumer);

        assert_eq!(state.rows_emitted(), 3);
        assert_eq!(compositor.rows.len(), 3);
        for (i, (x, y, row)) in compositor.rows.iter().enumerate() {
            assert_eq!(*x, 10);
            assert_eq!(*y, 20 + i as i32);
            assert_eq!(row, &vec![255u8, 255]);
        }
    }

    #[test]
    fn consumed_slots_and_boundary_slot_are_cleared() {
        let mut state = DirectCoverageState::new();
        state.init(0, 0, 4, 1);
        let mut compositor = RecordingCompositor::default();
        let mut consumer = state.bind(&mut compositor);
        consumer.set_max_alpha(256);

        let mut deltas = vec![0i32; 6];
        deltas[1] = 128;
        deltas[3] = -128;
        consumer.set_and_clear_relative_alphas(&mut deltas, 0, 1, 3).unwrap();
        assert_eq!(deltas, vec![0i32; 6]);
    }

    #[test]
    fn boundary_slot_clamps_to_declared_width() {
        let mut state = DirectCoverageState::new();
        state.init(0, 0, 4, 1);
        let mut compositor = RecordingCompositor::default();
        let mut consumer = state.bind(&mut compositor);
        consumer.set_max_alpha(256);

        // Natural end-of-range one past the declared width: the residual
        // correction sits in slot `w` and must be wiped there.
        let mut deltas = vec![0i32; 6];
        deltas[0] = 256;
        deltas[4] = -256;
        consumer.set_and_clear_relative_alphas(&mut deltas, 0, 0, 5).unwrap();
        assert_eq!(deltas, vec![0i32; 6]);
        assert_eq!(compositor.rows[0].2, vec![255u8; 4]);
    }

    #[test]
    fn block_flag_variant_fails_fast() {
        let mut state = DirectCoverageState::new();
        state.init(0, 0, 4, 1);
        let mut compositor = RecordingCompositor::default();
        let mut consumer = state.bind(&mut compositor);
        assert!(!consumer.supports_block_flags());

        let mut deltas = vec![0i32; 6];
        let err = consumer
            .set_and_clear_relative_alphas_blocked(&[1], &mut deltas, 0, 0, 4)
            .unwrap_err();
        assert!(matches!(err, SwrastError::Unsupported(_)));
    }

    #[test]
    fn clear_alphas_is_a_no_op() {
        let mut state = DirectCoverageState::new();
        state.init(0, 0, 4, 2);
        let mut compositor = RecordingCompositor::default();
        let mut consumer = state.bind(&mut compositor);
        consumer.clear_alphas(0);
        drop(consumer);
        assert_eq!(state.rows_emitted(), 0);
        assert!(compositor.rows.is_empty());
    }
}
