use std::time::Duration;

use annotation_common::annotation::Annotation;
use annotation_common::frame::Frame;
use annotation_common::shape_drawer::ShapeDrawer;

use crate::config::VisualizerConfig;
use crate::display::{DisplaySurface, NativeWindow};
use crate::pacing;
use crate::streamer::Streamer;

/// Draws predictions onto frames and presents them.
///
/// ```no_run
/// # fn run(frame: annotation_common::frame::Frame, annotation: annotation_common::annotation::Annotation) -> anyhow::Result<()> {
/// use visualizer::{Visualizer, VisualizerConfig};
///
/// let mut visualizer = Visualizer::new(VisualizerConfig::default())?;
/// let output = visualizer.draw(&frame, &annotation)?;
/// visualizer.show(&output)?;
/// # Ok(())
/// # }
/// ```
pub struct Visualizer {
    config: VisualizerConfig,
    shape_drawer: ShapeDrawer,
    /// `None` when display is suppressed.
    surface: Option<Box<dyn DisplaySurface>>,
}

impl Visualizer {
    /// Creates the visualizer, opening its window unless display is suppressed.
    pub fn new(config: VisualizerConfig) -> anyhow::Result<Self> {
        let shape_drawer = build_shape_drawer(&config)?;
        let surface: Option<Box<dyn DisplaySurface>> = if config.no_show {
            None
        } else {
            Some(Box::new(NativeWindow::open(
                &config.window_name,
                config.geometry,
            )?))
        };
        Ok(Self {
            config,
            shape_drawer,
            surface,
        })
    }

    /// Creates the visualizer on top of an already open surface.
    /// The surface is dropped right away if display is suppressed.
    pub fn with_surface(
        config: VisualizerConfig,
        surface: Box<dyn DisplaySurface>,
    ) -> anyhow::Result<Self> {
        let shape_drawer = build_shape_drawer(&config)?;
        let surface = (!config.no_show).then_some(surface);
        Ok(Self {
            config,
            shape_drawer,
            surface,
        })
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// True while frames are being presented to a surface that is still open.
    pub fn is_open(&self) -> bool {
        self.surface.as_ref().is_some_and(|surface| surface.is_open())
    }

    /// Returns a BGR copy of `frame` with `annotation` drawn on it.
    pub fn draw(&self, frame: &Frame, annotation: &Annotation) -> anyhow::Result<Frame> {
        self.shape_drawer.draw(frame.to_bgr(), annotation, &[])
    }

    /// Presents `frame`, and writes it to the configured output path if any.
    pub fn show(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        surface.show(frame)?;
        if let Some(output) = &self.config.output {
            frame.save(output)?;
            log::debug!("Saved frame to {output:?}");
        }
        Ok(())
    }

    /// Polls for a key press for the configured delay; true iff `q` was pressed.
    pub fn is_quit(&mut self) -> anyhow::Result<bool> {
        let delay = self.config.key_delay();
        let Some(surface) = self.surface.as_mut() else {
            return Ok(false);
        };
        Ok(surface.wait_key(delay)? == Some('q'))
    }

    /// Sleeps off the rest of the frame time when a video frame was processed
    /// faster than the video's own frame rate.
    pub fn video_delay<S>(&self, elapsed: Duration, streamer: &S) -> anyhow::Result<()>
    where
        S: Streamer + ?Sized,
    {
        if self.surface.is_none() {
            return Ok(());
        }
        let media_type = streamer.media_type();
        if !media_type.is_video() {
            return Ok(());
        }
        if let Some(delay) = pacing::frame_delay(elapsed, streamer.fps())? {
            log::trace!("{media_type} frame done in {elapsed:?}, sleeping {delay:?}");
            std::thread::sleep(delay);
        }
        Ok(())
    }

    /// Closes the window. Dropping the visualizer does the same.
    pub fn close(self) {
        if self.surface.is_some() {
            log::info!("Closing visualizer {:?}", self.config.window_name);
        }
    }
}

fn build_shape_drawer(config: &VisualizerConfig) -> anyhow::Result<ShapeDrawer> {
    let drawer = ShapeDrawer::new(config.show_count, config.is_one_label);
    match &config.font {
        Some(path) => Ok(drawer.with_font(ShapeDrawer::load_font(path)?)),
        None => {
            log::debug!("No font configured, labels and counts won't be drawn");
            Ok(drawer)
        }
    }
}
