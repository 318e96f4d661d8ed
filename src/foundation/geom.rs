use crate::foundation::error::{SwrastError, SwrastResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Stroke, Vec2};

/// Integer device-space rectangle limiting rasterization extent.
///
/// A zero-area rectangle is valid and renders nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DeviceRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> SwrastResult<Self> {
        if width < 0 || height < 0 {
            return Err(SwrastError::validation(
                "DeviceRect width/height must be >= 0",
            ));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn max_x(self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn max_y(self) -> i32 {
        self.y + self.height
    }
}

/// How a stroke is placed relative to the path outline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeAlignment {
    /// Stroke straddles the outline; handled natively by the rasterizer.
    #[default]
    Centered,
    /// Stroke lies inside the outline.
    Inner,
    /// Stroke lies outside the outline.
    Outer,
}

/// Outline-widening descriptor: stroke geometry plus its alignment.
///
/// Non-centered strokes are converted to an equivalent filled shape before
/// rasterization (see [`ShapeStroke::to_filled_shape`]); centered strokes are
/// expanded by the rasterizer itself.
#[derive(Clone, Debug)]
pub struct ShapeStroke {
    pub stroke: Stroke,
    pub alignment: StrokeAlignment,
}

impl ShapeStroke {
    pub fn new(stroke: Stroke, alignment: StrokeAlignment) -> Self {
        Self { stroke, alignment }
    }

    /// A centered stroke of the given width with default joins and caps.
    pub fn centered(width: f64) -> Self {
        Self {
            stroke: Stroke::new(width),
            alignment: StrokeAlignment::Centered,
        }
    }

    /// Expand `shape` into the filled outline of this stroke.
    ///
    /// This is the external stroking operation; the result is treated as
    /// filled geometry and the stroke is dropped.
    pub fn to_filled_shape(&self, shape: &BezPath) -> BezPath {
        kurbo::stroke(
            shape.iter(),
            &self.stroke,
            &kurbo::StrokeOpts::default(),
            STROKE_TOLERANCE,
        )
    }
}

/// Tolerance used for stroke expansion, in shape-space units.
pub(crate) const STROKE_TOLERANCE: f64 = 0.01;
