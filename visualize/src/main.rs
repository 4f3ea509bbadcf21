use std::path::PathBuf;
use std::time::Instant;

use annotation_common::annotation::Annotation;
use annotation_common::frame::Frame;
use clap::Parser;
use tracing_subscriber::prelude::*;
use visualizer::{Visualizer, VisualizerConfig};

#[derive(Debug, Parser)]
pub struct Args {
    /// Path to input image (.jpeg/.png).
    input: PathBuf,
    /// Annotation json to draw on top of the image.
    annotation: PathBuf,
    /// Json file with visualizer settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Title of the display window.
    #[arg(long)]
    window_name: Option<String>,
    /// Draw per-label object counts.
    #[arg(long, action, default_value = "false")]
    show_count: bool,
    /// Caption shapes with their top label only.
    #[arg(long, action, default_value = "false")]
    one_label: bool,
    /// Don't open a window, just draw (and save, if --output is given).
    #[arg(long, action, default_value = "false")]
    no_show: bool,
    /// Key polling delay in milliseconds, 0 waits for a key press.
    #[arg(long)]
    delay: Option<u64>,
    /// Where to write the annotated image.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// TTF/OTF font used for label captions.
    #[arg(long)]
    font: Option<PathBuf>,
    /// Initial window width.
    #[arg(long)]
    width: Option<u32>,
    /// Initial window height.
    #[arg(long)]
    height: Option<u32>,
    /// Window x offset from the primary monitor's origin.
    #[arg(long)]
    x: Option<i32>,
    /// Window y offset from the primary monitor's origin.
    #[arg(long)]
    y: Option<i32>,
    /// X of the primary monitor's origin on the desktop.
    #[arg(long)]
    monitor_x: Option<i32>,
    /// Y of the primary monitor's origin on the desktop.
    #[arg(long)]
    monitor_y: Option<i32>,
}

impl Args {
    fn visualizer_config(&self) -> anyhow::Result<VisualizerConfig> {
        let mut config = match &self.config {
            Some(path) => VisualizerConfig::from_json_file(path)?,
            None => VisualizerConfig::default(),
        };
        if let Some(name) = &self.window_name {
            config.window_name = name.clone();
        }
        config.show_count |= self.show_count;
        config.is_one_label |= self.one_label;
        config.no_show |= self.no_show;
        if self.delay.is_some() {
            config.delay_ms = self.delay;
        }
        if self.output.is_some() {
            config.output = self.output.clone();
        }
        if self.font.is_some() {
            config.font = self.font.clone();
        }
        let geometry = &mut config.geometry;
        geometry.width = self.width.unwrap_or(geometry.width);
        geometry.height = self.height.unwrap_or(geometry.height);
        geometry.offset_x = self.x.unwrap_or(geometry.offset_x);
        geometry.offset_y = self.y.unwrap_or(geometry.offset_y);
        geometry.monitor_x = self.monitor_x.unwrap_or(geometry.monitor_x);
        geometry.monitor_y = self.monitor_y.unwrap_or(geometry.monitor_y);
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,visualize=info,visualizer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.visualizer_config()?;
    log::debug!("{config:?}");

    let frame = Frame::open(&args.input)?;
    let annotation = Annotation::from_json_file(&args.annotation)?;
    log::info!(
        "Loaded {:?} ({}x{}) with {} shapes",
        args.input,
        frame.width(),
        frame.height(),
        annotation.shapes.len()
    );

    let no_show = config.no_show;
    let output = config.output.clone();
    let mut visualizer = Visualizer::new(config)?;

    let start = Instant::now();
    let drawn = visualizer.draw(&frame, &annotation)?;
    log::info!("Drew annotation in {:?}", start.elapsed());

    if no_show {
        // show() is a no-op without a window, so save here.
        if let Some(output) = output {
            drawn.save(&output)?;
            log::info!("Saved annotated image to {output:?}");
        }
        return Ok(());
    }

    visualizer.show(&drawn)?;
    println!("Press 'q' in the window to quit.");
    while visualizer.is_open() {
        if visualizer.is_quit()? {
            break;
        }
    }
    visualizer.close();

    Ok(())
}
