//! Renders an [`Annotation`] onto a [`Frame`].

use ab_glyph::{FontVec, PxScale};
use image::Rgb;
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_ellipse_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_text_mut, text_size,
};
use imageproc::rect::Rect;

use crate::annotation::{AnnotatedShape, Annotation, Label, Point, ScoredLabel, Shape};
use crate::frame::Frame;
use crate::palette;

const TEXT_COLOR: [u8; 3] = [255, 255, 255];
const COUNT_PANEL_COLOR: [u8; 3] = [32, 32, 32];
const CAPTION_PADDING: i32 = 2;

pub struct ShapeDrawer {
    show_count: bool,
    is_one_label: bool,
    font: Option<FontVec>,
    font_scale: PxScale,
    thickness: u32,
}

impl ShapeDrawer {
    pub fn new(show_count: bool, is_one_label: bool) -> Self {
        Self {
            show_count,
            is_one_label,
            font: None,
            font_scale: PxScale::from(16.0),
            thickness: 2,
        }
    }

    /// Font used for captions and the count panel. Without one, only outlines are drawn.
    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_font_scale(mut self, scale: f32) -> Self {
        self.font_scale = PxScale::from(scale);
        self
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness.max(1);
        self
    }

    /// Loads a TTF/OTF font from disk.
    pub fn load_font(path: &std::path::Path) -> anyhow::Result<FontVec> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read font {path:?}: {e}"))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("Invalid font {path:?}: {e}"))?;
        log::debug!("Loaded caption font {path:?}");
        Ok(font)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draws `annotation` onto `frame` and returns it.
    ///
    /// `labels` restricts drawing to labels with matching names; an empty slice draws all labels.
    /// Shapes left without any label after filtering are skipped.
    pub fn draw(
        &self,
        mut frame: Frame,
        annotation: &Annotation,
        labels: &[Label],
    ) -> anyhow::Result<Frame> {
        anyhow::ensure!(
            frame.width() > 0 && frame.height() > 0,
            "Cannot draw on an empty {}x{} frame",
            frame.width(),
            frame.height()
        );
        annotation.validate()?;
        log::trace!(
            "Drawing {} shapes on {}x{} frame",
            annotation.shapes.len(),
            frame.width(),
            frame.height()
        );

        let mut counts: Vec<(&Label, usize)> = Vec::new();
        for annotated in &annotation.shapes {
            let kept = keep_labels(annotated, labels);
            if !labels.is_empty() && kept.is_empty() {
                continue;
            }

            let color = kept
                .first()
                .map(|scored| palette::label_color(&scored.label))
                .unwrap_or_else(|| palette::name_color(""));
            self.draw_shape(&mut frame, &annotated.shape, color);

            if self.font.is_some() {
                if let Some(caption) = caption_text(&kept, self.is_one_label) {
                    self.draw_caption(&mut frame, annotated.shape.anchor(), &caption, color);
                }
            }

            for scored in kept {
                match counts.iter_mut().find(|(l, _)| l.name == scored.label.name) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((&scored.label, 1)),
                }
            }
        }

        if self.show_count {
            self.draw_counts(&mut frame, &counts);
        }

        Ok(frame)
    }

    fn draw_shape(&self, frame: &mut Frame, shape: &Shape, color: [u8; 3]) {
        let (w, h) = frame.dimensions();
        let color = Rgb(frame.native_color(color));
        let canvas = frame.pixels_mut();
        match shape {
            Shape::Rectangle { x1, y1, x2, y2 } => {
                let (x0, y0) = (to_px(*x1, w), to_px(*y1, h));
                let (x1, y1) = (to_px(*x2, w), to_px(*y2, h));
                for t in 0..self.thickness as i32 {
                    let width = x1 - x0 + 1 - 2 * t;
                    let height = y1 - y0 + 1 - 2 * t;
                    if width <= 0 || height <= 0 {
                        break;
                    }
                    let rect = Rect::at(x0 + t, y0 + t).of_size(width as u32, height as u32);
                    draw_hollow_rect_mut(canvas, rect, color);
                }
            }
            Shape::Ellipse { x1, y1, x2, y2 } => {
                let (x0, y0) = (to_px(*x1, w), to_px(*y1, h));
                let (x1, y1) = (to_px(*x2, w), to_px(*y2, h));
                let center = ((x0 + x1) / 2, (y0 + y1) / 2);
                let (rx, ry) = ((x1 - x0) / 2, (y1 - y0) / 2);
                for t in 0..self.thickness as i32 {
                    if rx - t < 0 || ry - t < 0 {
                        break;
                    }
                    draw_hollow_ellipse_mut(canvas, center, rx - t, ry - t, color);
                }
            }
            Shape::Polygon { points } => {
                let px: Vec<(f32, f32)> = points
                    .iter()
                    .map(|p| (to_px(p.x, w) as f32, to_px(p.y, h) as f32))
                    .collect();
                for (i, start) in px.iter().enumerate() {
                    let end = px[(i + 1) % px.len()];
                    let normal = edge_normal(*start, end);
                    // Offsets straddle the edge: thickness 3 draws at -1, 0, 1.
                    for t in 0..self.thickness as i32 {
                        let offset = (t - self.thickness as i32 / 2) as f32;
                        let (dx, dy) = (normal.0 * offset, normal.1 * offset);
                        draw_line_segment_mut(
                            canvas,
                            (start.0 + dx, start.1 + dy),
                            (end.0 + dx, end.1 + dy),
                            color,
                        );
                    }
                }
            }
        }
    }

    fn draw_caption(&self, frame: &mut Frame, anchor: Point, text: &str, color: [u8; 3]) {
        let Some(font) = &self.font else {
            return;
        };
        let (w, h) = frame.dimensions();
        let (text_w, text_h) = text_size(self.font_scale, font, text);
        let box_h = text_h as i32 + 2 * CAPTION_PADDING;
        let x = to_px(anchor.x, w);
        let mut y = to_px(anchor.y, h) - box_h;
        if y < 0 {
            y = to_px(anchor.y, h);
        }

        let background = Rgb(frame.native_color(color));
        let text_color = Rgb(frame.native_color(TEXT_COLOR));
        let canvas = frame.pixels_mut();
        let rect = Rect::at(x, y).of_size(text_w + 2 * CAPTION_PADDING as u32, box_h as u32);
        draw_filled_rect_mut(canvas, rect, background);
        draw_text_mut(
            canvas,
            text_color,
            x + CAPTION_PADDING,
            y + CAPTION_PADDING,
            self.font_scale,
            font,
            text,
        );
    }

    fn draw_counts(&self, frame: &mut Frame, counts: &[(&Label, usize)]) {
        let Some(font) = &self.font else {
            return;
        };
        if counts.is_empty() {
            return;
        }
        let lines: Vec<String> = counts
            .iter()
            .map(|(label, n)| format!("{}: {n}", label.name))
            .collect();
        let line_h = self.font_scale.y.ceil() as i32 + CAPTION_PADDING;
        let panel_w = lines
            .iter()
            .map(|line| text_size(self.font_scale, font, line).0)
            .max()
            .unwrap_or(0)
            + 2 * CAPTION_PADDING as u32;
        let panel_h = (line_h * lines.len() as i32 + CAPTION_PADDING) as u32;

        let background = Rgb(frame.native_color(COUNT_PANEL_COLOR));
        let line_colors: Vec<Rgb<u8>> = counts
            .iter()
            .map(|(label, _)| Rgb(frame.native_color(palette::label_color(label))))
            .collect();
        let canvas = frame.pixels_mut();
        draw_filled_rect_mut(canvas, Rect::at(0, 0).of_size(panel_w, panel_h), background);
        for (i, (line, color)) in lines.iter().zip(line_colors).enumerate() {
            let y = CAPTION_PADDING + i as i32 * line_h;
            draw_text_mut(canvas, color, CAPTION_PADDING, y, self.font_scale, font, line);
        }
    }
}

/// Caption for a shape: the top label's name in single-label mode, otherwise
/// every label as `name NN%`.
pub fn caption_text(kept: &[&ScoredLabel], is_one_label: bool) -> Option<String> {
    if is_one_label {
        return kept
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
            .map(|scored| scored.label.name.clone());
    }
    if kept.is_empty() {
        return None;
    }
    let parts: Vec<String> = kept
        .iter()
        .map(|scored| format!("{} {:.0}%", scored.label.name, scored.probability * 100.0))
        .collect();
    Some(parts.join(", "))
}

/// Unit normal of the edge `start -> end`, zero for a degenerate edge.
fn edge_normal(start: (f32, f32), end: (f32, f32)) -> (f32, f32) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let len = dx.hypot(dy);
    if len == 0.0 {
        (0.0, 0.0)
    } else {
        (-dy / len, dx / len)
    }
}

fn keep_labels<'a>(annotated: &'a AnnotatedShape, filter: &[Label]) -> Vec<&'a ScoredLabel> {
    annotated
        .labels
        .iter()
        .filter(|scored| filter.is_empty() || filter.iter().any(|l| l.name == scored.label.name))
        .collect()
}

/// Normalized coordinate to a pixel index inside `[0, size)`.
fn to_px(v: f32, size: u32) -> i32 {
    ((v * size as f32).round() as i32).clamp(0, size.saturating_sub(1) as i32)
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    const RED: [u8; 3] = [255, 0, 0];

    fn red_box() -> Annotation {
        Annotation::new(vec![AnnotatedShape::new(
            Shape::Rectangle {
                x1: 0.2,
                y1: 0.2,
                x2: 0.6,
                y2: 0.6,
            },
            vec![ScoredLabel::new(Label::new(0, "person").with_color(RED), 0.9)],
        )])
    }

    fn blank(order_bgr: bool) -> Frame {
        let frame = Frame::from_rgb(RgbImage::new(10, 10));
        if order_bgr {
            frame.to_bgr()
        } else {
            frame
        }
    }

    #[test]
    fn draws_rectangle_outline_only() {
        let drawer = ShapeDrawer::new(false, false).with_thickness(1);
        let out = drawer.draw(blank(false), &red_box(), &[]).unwrap();
        let px = out.pixels();
        assert_eq!(px.get_pixel(2, 2), &Rgb(RED));
        assert_eq!(px.get_pixel(6, 6), &Rgb(RED));
        assert_eq!(px.get_pixel(4, 2), &Rgb(RED));
        // inside and outside untouched
        assert_eq!(px.get_pixel(4, 4), &Rgb([0, 0, 0]));
        assert_eq!(px.get_pixel(8, 8), &Rgb([0, 0, 0]));
    }

    #[test]
    fn color_follows_frame_channel_order() {
        let drawer = ShapeDrawer::new(false, false).with_thickness(1);
        let out = drawer.draw(blank(true), &red_box(), &[]).unwrap();
        assert_eq!(out.pixels().get_pixel(2, 2), &Rgb([0, 0, 255]));
        assert_eq!(out.to_rgb_image().get_pixel(2, 2), &Rgb(RED));
    }

    #[test]
    fn thickness_grows_inward() {
        let drawer = ShapeDrawer::new(false, false).with_thickness(2);
        let out = drawer.draw(blank(false), &red_box(), &[]).unwrap();
        assert_eq!(out.pixels().get_pixel(3, 3), &Rgb(RED));
        assert_eq!(out.pixels().get_pixel(4, 4), &Rgb([0, 0, 0]));
    }

    #[test]
    fn label_filter_skips_other_shapes() {
        let drawer = ShapeDrawer::new(false, false);
        let out = drawer
            .draw(blank(false), &red_box(), &[Label::new(1, "car")])
            .unwrap();
        assert!(out.pixels().pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn invalid_annotation_is_an_error() {
        let drawer = ShapeDrawer::new(true, false);
        let bad = Annotation::new(vec![AnnotatedShape::new(
            Shape::Rectangle {
                x1: 0.0,
                y1: 0.0,
                x2: 2.0,
                y2: 1.0,
            },
            vec![],
        )]);
        assert!(drawer.draw(blank(false), &bad, &[]).is_err());
    }

    #[test]
    fn ellipse_and_polygon_touch_frame() {
        let drawer = ShapeDrawer::new(false, false).with_thickness(1);
        let annotation = Annotation::new(vec![
            AnnotatedShape::new(
                Shape::Ellipse {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 0.8,
                    y2: 0.8,
                },
                vec![ScoredLabel::new(Label::new(0, "a").with_color(RED), 0.5)],
            ),
            AnnotatedShape::new(
                Shape::Polygon {
                    points: vec![
                        Point { x: 0.0, y: 0.9 },
                        Point { x: 0.9, y: 0.9 },
                        Point { x: 0.5, y: 0.5 },
                    ],
                },
                vec![ScoredLabel::new(Label::new(1, "b").with_color(RED), 0.5)],
            ),
        ]);
        let out = drawer.draw(blank(false), &annotation, &[]).unwrap();
        // ellipse top point and polygon base
        assert_eq!(out.pixels().get_pixel(4, 0), &Rgb(RED));
        assert_eq!(out.pixels().get_pixel(5, 9), &Rgb(RED));
    }

    const FONT: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/data/DejaVuSansMono.ttf"
    ));
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const PANEL: Rgb<u8> = Rgb(COUNT_PANEL_COLOR);

    fn font() -> FontVec {
        FontVec::try_from_vec(FONT.to_vec()).unwrap()
    }

    fn corner_box() -> Annotation {
        Annotation::new(vec![AnnotatedShape::new(
            Shape::Rectangle {
                x1: 0.6,
                y1: 0.6,
                x2: 0.9,
                y2: 0.9,
            },
            vec![ScoredLabel::new(Label::new(0, "person").with_color(RED), 0.9)],
        )])
    }

    fn canvas() -> Frame {
        Frame::from_rgb(RgbImage::new(64, 48))
    }

    #[test]
    fn caption_lists_every_label_with_probability() {
        let person = ScoredLabel::new(Label::new(0, "person"), 0.42);
        let dog = ScoredLabel::new(Label::new(1, "dog"), 0.87);
        assert_eq!(
            caption_text(&[&person, &dog], false).as_deref(),
            Some("person 42%, dog 87%")
        );
        assert_eq!(caption_text(&[], false), None);
    }

    #[test]
    fn one_label_caption_is_top_label_name() {
        let person = ScoredLabel::new(Label::new(0, "person"), 0.42);
        let dog = ScoredLabel::new(Label::new(1, "dog"), 0.87);
        assert_eq!(caption_text(&[&person, &dog], true).as_deref(), Some("dog"));
        assert_eq!(caption_text(&[], true), None);
    }

    #[test]
    fn font_draws_caption_above_shape() {
        let drawer = ShapeDrawer::new(false, false).with_font(font());
        assert!(drawer.has_font());
        let out = drawer.draw(canvas(), &corner_box(), &[]).unwrap();
        // outline starts at row 29, caption background sits above it
        let x = to_px(0.6, 64) as u32;
        assert!((0..29).any(|y| out.pixels().get_pixel(x, y) == &Rgb(RED)));

        let plain = ShapeDrawer::new(false, false)
            .draw(canvas(), &corner_box(), &[])
            .unwrap();
        assert!((0..29).all(|y| plain.pixels().get_pixel(x, y) == &BLACK));
    }

    #[test]
    fn show_count_draws_panel_in_corner() {
        let with_count = ShapeDrawer::new(true, false).with_font(font());
        let out = with_count.draw(canvas(), &corner_box(), &[]).unwrap();
        assert_eq!(out.pixels().get_pixel(0, 0), &PANEL);

        let without_count = ShapeDrawer::new(false, false).with_font(font());
        let out = without_count.draw(canvas(), &corner_box(), &[]).unwrap();
        assert_eq!(out.pixels().get_pixel(0, 0), &BLACK);

        // nothing to count, no panel
        let out = with_count.draw(canvas(), &Annotation::default(), &[]).unwrap();
        assert_eq!(out.pixels().get_pixel(0, 0), &BLACK);
    }

    #[test]
    fn show_count_needs_a_font() {
        let drawer = ShapeDrawer::new(true, false);
        assert!(!drawer.has_font());
        let out = drawer.draw(canvas(), &corner_box(), &[]).unwrap();
        assert_eq!(out.pixels().get_pixel(0, 0), &BLACK);
    }

    #[test]
    fn empty_frame_is_an_error() {
        let empty = Frame::from_rgb(RgbImage::new(0, 0));
        let drawer = ShapeDrawer::new(true, false).with_font(font());
        assert!(drawer.draw(empty.clone(), &corner_box(), &[]).is_err());
        assert!(ShapeDrawer::new(false, false)
            .draw(empty, &Annotation::default(), &[])
            .is_err());
    }

    #[test]
    fn polygon_thickness_widens_horizontal_edges() {
        let drawer = ShapeDrawer::new(false, false).with_thickness(2);
        let triangle = Annotation::new(vec![AnnotatedShape::new(
            Shape::Polygon {
                points: vec![
                    Point { x: 0.1, y: 0.8 },
                    Point { x: 0.9, y: 0.8 },
                    Point { x: 0.5, y: 0.2 },
                ],
            },
            vec![ScoredLabel::new(Label::new(0, "a").with_color(RED), 0.5)],
        )]);
        let out = drawer
            .draw(Frame::from_rgb(RgbImage::new(20, 20)), &triangle, &[])
            .unwrap();
        // base runs along row 16, thickened by one row
        assert_eq!(out.pixels().get_pixel(10, 16), &Rgb(RED));
        assert_eq!(out.pixels().get_pixel(10, 15), &Rgb(RED));
        assert_eq!(out.pixels().get_pixel(10, 14), &BLACK);
        assert_eq!(out.pixels().get_pixel(10, 17), &BLACK);
    }
}
