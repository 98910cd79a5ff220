use tracing::debug;

use crate::error::CanvasError;
use crate::types::{Shape, ShapeId, ShapePatch};

/// The ordered collection of shapes on the session canvas.
///
/// Insertion order is kept only so snapshots serialize deterministically.
/// The store does no locking of its own; the session wraps it in a lock.
#[derive(Debug, Clone, Default)]
pub struct ShapeStore {
    shapes: Vec<Shape>,
}

impl ShapeStore {
    pub fn new() -> Self {
        Self { shapes: Vec::new() }
    }

    /// All shapes, in insertion order.
    pub fn snapshot(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Add a shape after checking its geometry. Ids are unique among live shapes.
    pub fn append(&mut self, shape: Shape) -> Result<&Shape, CanvasError> {
        if self.find_by_id(shape.id).is_some() {
            return Err(CanvasError::DuplicateId(shape.id));
        }
        check_geometry(shape.x, shape.y, shape.w, shape.h)?;
        debug!(id = shape.id, "Shape appended");
        self.shapes.push(shape);
        let index = self.shapes.len() - 1;
        Ok(&self.shapes[index])
    }

    pub fn find_by_id(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    /// Apply the present fields of `patch` to the shape with `id`.
    ///
    /// The merged shape is validated before it replaces the stored one, so a
    /// rejected patch leaves the store untouched.
    pub fn mutate(&mut self, id: ShapeId, patch: &ShapePatch) -> Result<&Shape, CanvasError> {
        let index = self
            .shapes
            .iter()
            .position(|s| s.id == id)
            .ok_or(CanvasError::NotFound(id))?;

        let mut merged = self.shapes[index].clone();
        patch.apply_to(&mut merged);
        check_geometry(merged.x, merged.y, merged.w, merged.h)?;

        debug!(id, "Shape mutated");
        self.shapes[index] = merged;
        Ok(&self.shapes[index])
    }

    /// JSON array of the current shapes, as shown to the assistant.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.shapes).unwrap_or_else(|_| "[]".to_string())
    }
}

fn check_geometry(x: f64, y: f64, w: f64, h: f64) -> Result<(), CanvasError> {
    for (name, value) in [("x", x), ("y", y), ("w", w), ("h", h)] {
        if !value.is_finite() {
            return Err(CanvasError::Validation(format!(
                "{name} must be a finite number, got {value}"
            )));
        }
    }
    for (name, value) in [("w", w), ("h", h)] {
        if value < 0.0 {
            return Err(CanvasError::Validation(format!(
                "{name} must not be negative, got {value}"
            )));
        }
    }
    Ok(())
}
