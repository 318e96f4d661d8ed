use kurbo::PathEl;

use crate::foundation::error::SwrastResult;
use crate::foundation::geom::{Affine, BezPath, DeviceRect, ShapeStroke};
use crate::raster::consumer::AlphaConsumer;

/// Subpixel resolution (log2) per axis when antialiasing is on.
const SUBPIXEL_LG: u32 = 4;

/// Coverage ceiling with antialiasing on: 16x16 subsamples per pixel.
pub const MAX_AA_ALPHA: u32 = 1 << (2 * SUBPIXEL_LG);

/// Tolerance for flattening curves into line segments, in device pixels.
const FLATTEN_TOLERANCE: f64 = 0.25;

/// Coordinates are clamped to this magnitude (in subpixel units) before
/// integer conversion so degenerate transforms cannot overflow.
const COORD_LIMIT: f64 = (1 << 28) as f64;

/// Numeric precision of the scanline sweep.
///
/// Both variants produce caller-equivalent coverage; single precision trades
/// a little accuracy in edge interpolation for smaller intermediate state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precision {
    /// Edge coordinates quantized through `f32`.
    Single,
    /// Full `f64` edge coordinates.
    #[default]
    Double,
}

/// Tight device-pixel bounding box of non-zero coverage, clipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl OutputBounds {
    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// One monotonic-in-y line segment, in subpixel coordinates.
struct Edge {
    /// First subpixel scanline whose sample row this edge crosses.
    first_line: i32,
    /// Last crossed subpixel scanline (inclusive).
    last_line: i32,
    /// Crossing x at `first_line`'s sample row, subpixel units.
    x: f64,
    /// Change in crossing x per subpixel scanline.
    slope: f64,
    /// Winding direction: +1 downward, -1 upward.
    dir: i8,
}

struct ActiveEdge {
    x: f64,
    slope: f64,
    last_line: i32,
    dir: i8,
}

/// Reusable working buffers for one rasterization call.
///
/// Heavyweight by design; checked out of a [`crate::raster::pool::ScratchPool`]
/// and returned on every exit path.
pub struct RasterScratch {
    edges: Vec<Edge>,
    active: Vec<ActiveEdge>,
    crossings: Vec<(f64, i8)>,
    deltas: Vec<i32>,
    segments: Vec<((f64, f64), (f64, f64))>,
}

impl RasterScratch {
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            active: Vec::new(),
            crossings: Vec::new(),
            deltas: Vec::new(),
            segments: Vec::new(),
        }
    }
}

impl Default for RasterScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured scanline sweep over one shape, borrowing pooled scratch.
pub struct ScanlineRenderer<'s> {
    scratch: &'s mut RasterScratch,
    bounds: OutputBounds,
    lg: u32,
    max_alpha: u32,
}

/// Prepare a scanline sweep for `shape` under `transform`, limited to `clip`.
///
/// A centered `stroke` is expanded here; non-centered strokes must have been
/// normalized into filled geometry by the caller. The returned renderer's
/// [`ScanlineRenderer::bounds`] may be empty, in which case producing alphas
/// is a no-op.
pub fn setup_renderer<'s>(
    scratch: &'s mut RasterScratch,
    shape: &BezPath,
    stroke: Option<&ShapeStroke>,
    transform: Affine,
    clip: DeviceRect,
    antialiased: bool,
    precision: Precision,
) -> ScanlineRenderer<'s> {
    let lg = if antialiased { SUBPIXEL_LG } else { 0 };
    let max_alpha = 1u32 << (2 * lg);

    let expanded;
    let fill: &BezPath = match stroke {
        Some(s) => {
            expanded = s.to_filled_shape(shape);
            &expanded
        }
        None => shape,
    };

    let bounds = build_edges(scratch, fill, transform, clip, lg, precision);

    ScanlineRenderer {
        scratch,
        bounds,
        lg,
        max_alpha,
    }
}

impl ScanlineRenderer<'_> {
    /// Tight output bounding box; empty means nothing to draw.
    pub fn bounds(&self) -> OutputBounds {
        self.bounds
    }

    /// Maximum accumulated coverage per pixel for this sweep.
    pub fn max_alpha(&self) -> u32 {
        self.max_alpha
    }

    /// Sweep all scanlines, streaming delta-coverage rows to `consumer`.
    ///
    /// Rows with no coverage inside the bounding box are reported through
    /// [`AlphaConsumer::clear_alphas`] instead of emitting a row.
    pub fn produce_alphas(&mut self, consumer: &mut dyn AlphaConsumer) -> SwrastResult<()> {
        let b = self.bounds;
        if b.is_empty() {
            return Ok(());
        }
        consumer.set_max_alpha(self.max_alpha);

        let lg = self.lg;
        let sub: i32 = 1 << lg;
        let mask: i32 = sub - 1;
        let w = b.width as usize;
        let sub_x0 = b.x << lg;
        let sub_x1 = (b.x + b.width) << lg;

        let RasterScratch {
            edges,
            active,
            crossings,
            deltas,
            ..
        } = &mut *self.scratch;

        deltas.clear();
        deltas.resize(w + 2, 0);
        active.clear();

        let mut next_edge = 0usize;

        for pix_y in b.y..b.y + b.height {
            // Relative pixel column extent touched on this row.
            let mut row_from = i32::MAX;
            let mut row_to = i32::MIN;

            for s in 0..sub {
                let line = (pix_y << lg) + s;

                while next_edge < edges.len() && edges[next_edge].first_line <= line {
                    let e = &edges[next_edge];
                    if e.last_line >= line {
                        active.push(ActiveEdge {
                            x: e.x + e.slope * f64::from(line - e.first_line),
                            slope: e.slope,
                            last_line: e.last_line,
                            dir: e.dir,
                        });
                    }
                    next_edge += 1;
                }
                active.retain(|e| e.last_line >= line);
                if active.is_empty() {
                    continue;
                }

                crossings.clear();
                for e in active.iter_mut() {
                    crossings.push((e.x, e.dir));
                    e.x += e.slope;
                }
                crossings.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

                // Non-zero winding walk over sorted crossings.
                let mut winding = 0i32;
                let mut span_start = 0.0f64;
                for &(cx, dir) in crossings.iter() {
                    let prev = winding;
                    winding += i32::from(dir);
                    if prev == 0 && winding != 0 {
                        span_start = cx;
                    } else if prev != 0 && winding == 0 {
                        add_span(
                            deltas,
                            span_start,
                            cx,
                            sub_x0,
                            sub_x1,
                            lg,
                            mask,
                            &mut row_from,
                            &mut row_to,
                        );
                    }
                }
            }

            if row_to > row_from {
                consumer.set_and_clear_relative_alphas(
                    deltas,
                    pix_y,
                    b.x + row_from,
                    b.x + row_to,
                )?;
            } else {
                consumer.clear_alphas(pix_y);
            }
        }
        Ok(())
    }
}

/// Accumulate one covered span into the delta-encoded row.
///
/// `x0`/`x1` are subpixel-space span ends; `sub_x0`/`sub_x1` the clipped
/// subpixel extent of the output box. Deltas are indexed relative to the
/// box origin; the slot after a span's last pixel carries the negative
/// correction consumed (or cleared) by the alpha consumer.
#[allow(clippy::too_many_arguments)]
fn add_span(
    deltas: &mut [i32],
    x0: f64,
    x1: f64,
    sub_x0: i32,
    sub_x1: i32,
    lg: u32,
    mask: i32,
    row_from: &mut i32,
    row_to: &mut i32,
) {
    // Subsample column k is covered when its center k+0.5 lies in [x0, x1).
    let k0 = ((x0 - 0.5).ceil() as i32).max(sub_x0);
    let k1 = ((x1 - 0.5).ceil() as i32).min(sub_x1);
    if k1 <= k0 {
        return;
    }

    let ks0 = k0 - sub_x0;
    let ks1 = k1 - sub_x0;
    let p0 = ks0 >> lg;
    let p1 = ks1 >> lg;
    let sub: i32 = 1 << lg;

    if p0 == p1 {
        deltas[p0 as usize] += ks1 - ks0;
        deltas[(p0 + 1) as usize] -= ks1 - ks0;
    } else {
        deltas[p0 as usize] += sub - (ks0 & mask);
        deltas[(p0 + 1) as usize] += ks0 & mask;
        deltas[p1 as usize] -= sub - (ks1 & mask);
        deltas[(p1 + 1) as usize] -= ks1 & mask;
    }

    *row_from = (*row_from).min(p0);
    *row_to = (*row_to).max(p1 + 1);
}

/// Flatten, transform and bucket the fill outline into scanline edges.
/// Returns the clipped output bounding box.
fn build_edges(
    scratch: &mut RasterScratch,
    fill: &BezPath,
    transform: Affine,
    clip: DeviceRect,
    lg: u32,
    precision: Precision,
) -> OutputBounds {
    let empty = OutputBounds {
        x: clip.x,
        y: clip.y,
        width: 0,
        height: 0,
    };
    scratch.edges.clear();
    scratch.segments.clear();
    if clip.is_empty() {
        return empty;
    }

    let scale = f64::from(1u32 << lg);
    let quantize = |p: kurbo::Point| -> (f64, f64) {
        match precision {
            Precision::Single => (
                f64::from((p.x * scale) as f32),
                f64::from((p.y * scale) as f32),
            ),
            Precision::Double => (p.x * scale, p.y * scale),
        }
    };

    // Collect flattened segments in subpixel space, closing every subpath.
    let segments = &mut scratch.segments;
    let mut start: Option<(f64, f64)> = None;
    let mut last: Option<(f64, f64)> = None;
    let device = transform * fill;
    kurbo::flatten(device.iter(), FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            if let (Some(s), Some(l)) = (start, last)
                && l != s
            {
                segments.push((l, s));
            }
            let q = quantize(p);
            start = Some(q);
            last = Some(q);
        }
        PathEl::LineTo(p) => {
            let q = quantize(p);
            if let Some(l) = last
                && l != q
            {
                segments.push((l, q));
            }
            last = Some(q);
        }
        PathEl::ClosePath => {
            if let (Some(s), Some(l)) = (start, last)
                && l != s
            {
                segments.push((l, s));
            }
            last = start;
        }
        // flatten() only emits moves, lines and closes.
        _ => {}
    });
    if let (Some(s), Some(l)) = (start, last)
        && l != s
    {
        segments.push((l, s));
    }
    if segments.is_empty() {
        return empty;
    }

    // Geometry extent in subpixel space.
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(a, b) in segments.iter() {
        min_x = min_x.min(a.0).min(b.0);
        max_x = max_x.max(a.0).max(b.0);
        min_y = min_y.min(a.1).min(b.1);
        max_y = max_y.max(a.1).max(b.1);
    }
    if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
        return empty;
    }

    let clamp = |v: f64| v.clamp(-COORD_LIMIT, COORD_LIMIT);
    // First and one-past-last covered subsample columns/rows.
    let k_min_x = clamp(min_x - 0.5).ceil() as i32;
    let k_max_x = clamp(max_x - 0.5).ceil() as i32;
    let k_min_y = clamp(min_y - 0.5).ceil() as i32;
    let k_max_y = clamp(max_y - 0.5).ceil() as i32;
    if k_max_x <= k_min_x || k_max_y <= k_min_y {
        return empty;
    }

    let x = (k_min_x >> lg).max(clip.x);
    let y = (k_min_y >> lg).max(clip.y);
    let x_end = (((k_max_x - 1) >> lg) + 1).min(clip.max_x());
    let y_end = (((k_max_y - 1) >> lg) + 1).min(clip.max_y());
    let bounds = OutputBounds {
        x,
        y,
        width: x_end - x,
        height: y_end - y,
    };
    if bounds.is_empty() {
        return empty;
    }

    let line_start = y << lg;
    let line_end = y_end << lg;

    for &((ax, ay), (bx, by)) in segments.iter() {
        if ay == by {
            continue;
        }
        let (x0, y0, x1, y1, dir) = if ay < by {
            (ax, ay, bx, by, 1i8)
        } else {
            (bx, by, ax, ay, -1i8)
        };
        // Scanline `l` samples at l + 0.5; crossed when y0 <= l + 0.5 < y1.
        let first = (clamp(y0 - 0.5).ceil() as i32).max(line_start);
        let last = ((clamp(y1 - 0.5).ceil() as i32) - 1).min(line_end - 1);
        if last < first {
            continue;
        }
        let slope = (x1 - x0) / (y1 - y0);
        let cross_x = x0 + slope * (f64::from(first) + 0.5 - y0);
        if !cross_x.is_finite() || !slope.is_finite() {
            continue;
        }
        scratch.edges.push(Edge {
            first_line: first,
            last_line: last,
            x: cross_x,
            slope,
            dir,
        });
    }

    scratch.edges.sort_unstable_by_key(|e| e.first_line);
    bounds
}
