//! Annotation model: shapes in normalized coordinates, each carrying scored labels.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: u32,
    pub name: String,
    /// Display color, RGB. A palette color is used when unset.
    #[serde(default)]
    pub color: Option<[u8; 3]>,
}

impl Label {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = Some(color);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: Label,
    pub probability: f32,
}

impl ScoredLabel {
    pub fn new(label: Label, probability: f32) -> Self {
        Self { label, probability }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Shape geometry, normalized to `[0, 1]` relative to frame width/height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// Ellipse inscribed in the given bounding box.
    Ellipse { x1: f32, y1: f32, x2: f32, y2: f32 },
    Polygon { points: Vec<Point> },
}

impl Shape {
    /// Top-left corner of the shape's bounding box, normalized.
    pub fn anchor(&self) -> Point {
        match self {
            Shape::Rectangle { x1, y1, .. } | Shape::Ellipse { x1, y1, .. } => {
                Point { x: *x1, y: *y1 }
            }
            Shape::Polygon { points } => points.iter().fold(
                Point {
                    x: f32::INFINITY,
                    y: f32::INFINITY,
                },
                |acc, p| Point {
                    x: acc.x.min(p.x),
                    y: acc.y.min(p.y),
                },
            ),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        match self {
            Shape::Rectangle { x1, y1, x2, y2 } | Shape::Ellipse { x1, y1, x2, y2 } => {
                for v in [x1, y1, x2, y2] {
                    ensure_normalized(*v)?;
                }
                anyhow::ensure!(
                    x1 <= x2 && y1 <= y2,
                    "Inverted bounding box ({x1}, {y1}) -> ({x2}, {y2})"
                );
            }
            Shape::Polygon { points } => {
                anyhow::ensure!(
                    points.len() >= 3,
                    "Polygon needs at least 3 points, got {}",
                    points.len()
                );
                for p in points {
                    ensure_normalized(p.x)?;
                    ensure_normalized(p.y)?;
                }
            }
        }
        Ok(())
    }
}

fn ensure_normalized(v: f32) -> anyhow::Result<()> {
    anyhow::ensure!(
        v.is_finite() && (0.0..=1.0).contains(&v),
        "Coordinate {v} is outside of [0, 1]"
    );
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedShape {
    pub shape: Shape,
    #[serde(default)]
    pub labels: Vec<ScoredLabel>,
}

impl AnnotatedShape {
    pub fn new(shape: Shape, labels: Vec<ScoredLabel>) -> Self {
        Self { shape, labels }
    }

    /// Label with the highest probability, if any.
    pub fn top_label(&self) -> Option<&ScoredLabel> {
        self.labels
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
    }
}

/// All shapes predicted for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub shapes: Vec<AnnotatedShape>,
}

impl Annotation {
    pub fn new(shapes: Vec<AnnotatedShape>) -> Self {
        Self { shapes }
    }

    pub fn push(&mut self, shape: AnnotatedShape) {
        self.shapes.push(shape);
    }

    /// Distinct labels across all shapes, in first-seen order.
    pub fn labels(&self) -> Vec<&Label> {
        let mut labels: Vec<&Label> = Vec::new();
        for scored in self.shapes.iter().flat_map(|s| &s.labels) {
            if !labels.iter().any(|l| l.name == scored.label.name) {
                labels.push(&scored.label);
            }
        }
        labels
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open annotation file {path:?}"))?;
        let annotation: Annotation = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to parse annotation file {path:?}"))?;
        Ok(annotation)
    }

    /// Checks that all geometry is normalized and all probabilities are in range.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (idx, annotated) in self.shapes.iter().enumerate() {
            annotated
                .shape
                .validate()
                .with_context(|| format!("Invalid shape #{idx}"))?;
            for scored in &annotated.labels {
                anyhow::ensure!(
                    (0.0..=1.0).contains(&scored.probability),
                    "Invalid shape #{idx}: probability {} of label {:?} is outside of [0, 1]",
                    scored.probability,
                    scored.label.name
                );
            }
        }
        Ok(())
    }
}
