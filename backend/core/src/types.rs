use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a shape, unique within the session.
pub type ShapeId = i64;

/// Color applied when neither the assistant nor a client supplies one.
pub const DEFAULT_COLOR: &str = "hsl(0, 0%, 0%)";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// A rectangle on the shared canvas.
///
/// Coordinates have their origin at the canvas centre, with `x` growing to the
/// right and `y` growing downward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    /// `hsl(h, s%, l%)` text.
    #[serde(default = "default_color")]
    pub color: String,
}

impl Shape {
    pub fn new(id: ShapeId, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            id,
            x,
            y,
            w,
            h,
            color: default_color(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} at ({}, {}) {}x{} {}",
            self.id, self.x, self.y, self.w, self.h, self.color
        )
    }
}

/// A partial set of shape fields. Absent fields are left untouched when applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ShapePatch {
    /// Overwrite the fields present in this patch onto `shape`.
    pub fn apply_to(&self, shape: &mut Shape) {
        if let Some(x) = self.x {
            shape.x = x;
        }
        if let Some(y) = self.y {
            shape.y = y;
        }
        if let Some(w) = self.w {
            shape.w = w;
        }
        if let Some(h) = self.h {
            shape.h = h;
        }
        if let Some(color) = &self.color {
            shape.color = color.clone();
        }
    }
}

/// A partial shape keyed by id, as sent by clients editing a shape directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeUpdate {
    pub id: ShapeId,
    #[serde(flatten)]
    pub patch: ShapePatch,
}
