//! Surfaces frames can be presented on.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use annotation_common::frame::Frame;
use minifb::{InputCallback, Key, KeyRepeat, ScaleMode, Window, WindowOptions};

use crate::config::WindowGeometry;

/// How often a blocking key wait wakes up to pump window events.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Something that can present frames and report key presses.
pub trait DisplaySurface {
    /// Presents `frame`, replacing whatever was shown before.
    fn show(&mut self, frame: &Frame) -> anyhow::Result<()>;

    /// Waits up to `delay` for a key press and returns the first key pressed.
    /// A zero `delay` waits until a key is pressed or the surface goes away.
    fn wait_key(&mut self, delay: Duration) -> anyhow::Result<Option<char>>;

    /// False once the user closed the surface.
    fn is_open(&self) -> bool {
        true
    }
}

/// A native desktop window.
pub struct NativeWindow {
    name: String,
    window: Window,
    buffer: Vec<u32>,
    buffer_dims: (usize, usize),
    typed: TypedChars,
}

impl NativeWindow {
    /// Opens a window sized and placed per `geometry`.
    pub fn open(name: &str, geometry: WindowGeometry) -> anyhow::Result<Self> {
        let mut window = Window::new(
            name,
            geometry.width as usize,
            geometry.height as usize,
            WindowOptions {
                resize: true,
                scale_mode: ScaleMode::AspectRatioStretch,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("Failed to create window {name:?}: {e}"))?;

        // Key polling paces itself.
        window.limit_update_rate(None);
        let (x, y) = geometry.position();
        window.set_position(x as isize, y as isize);
        let typed = TypedChars::default();
        window.set_input_callback(Box::new(typed.clone()));

        log::info!(
            "Opened window {name:?} ({}x{}) at ({x}, {y})",
            geometry.width,
            geometry.height,
        );

        Ok(Self {
            name: name.to_string(),
            window,
            buffer: Vec::new(),
            buffer_dims: (0, 0),
            typed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pumps window events, redrawing the last frame if there is one.
    fn refresh(&mut self) -> anyhow::Result<()> {
        if self.buffer.is_empty() {
            self.window.update();
            return Ok(());
        }
        let (w, h) = self.buffer_dims;
        self.window
            .update_with_buffer(&self.buffer, w, h)
            .map_err(|e| anyhow::anyhow!("Failed to update window {:?}: {e}", self.name))
    }
}

impl DisplaySurface for NativeWindow {
    fn show(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let rgb = frame.to_rgb_image();
        let (w, h) = (rgb.width() as usize, rgb.height() as usize);

        // minifb wants one u32 per pixel: 0x00RRGGBB
        self.buffer.clear();
        self.buffer.extend(
            rgb.pixels()
                .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | (p[2] as u32)),
        );
        self.buffer_dims = (w, h);
        self.refresh()
    }

    fn wait_key(&mut self, delay: Duration) -> anyhow::Result<Option<char>> {
        let start = Instant::now();
        loop {
            if !self.window.is_open() {
                log::debug!("Window {:?} was closed", self.name);
                return Ok(None);
            }
            self.refresh()?;

            // Typed characters carry the real case; raw keys cover keys that type nothing.
            let pressed = self.window.get_keys_pressed(KeyRepeat::No);
            if let Some(c) = self.typed.pop() {
                self.typed.clear();
                return Ok(Some(c));
            }
            if let Some(key) = pressed.first() {
                let shift = self.window.is_key_down(Key::LeftShift)
                    || self.window.is_key_down(Key::RightShift);
                return Ok(Some(key_to_char(*key, shift, false)));
            }

            let waited = start.elapsed();
            if delay.is_zero() {
                std::thread::sleep(POLL_INTERVAL);
            } else if waited >= delay {
                return Ok(None);
            } else {
                std::thread::sleep(POLL_INTERVAL.min(delay - waited));
            }
        }
    }
}

impl Drop for NativeWindow {
    fn drop(&mut self) {
        log::debug!("Closing window {:?}", self.name);
    }
}

/// Characters the window reports as typed, shift and caps lock applied.
#[derive(Clone, Default)]
struct TypedChars(Arc<Mutex<VecDeque<char>>>);

impl TypedChars {
    fn pop(&self) -> Option<char> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }

    fn clear(&self) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl InputCallback for TypedChars {
    fn add_char(&mut self, uni_char: u32) {
        if let Some(c) = char::from_u32(uni_char) {
            self.0.lock().unwrap_or_else(|e| e.into_inner()).push_back(c);
        }
    }
}

/// Maps a key to the character it types. Letters are uppercase when exactly one of
/// `shift`/`caps_lock` is active. Keys that don't type anything map to U+FFFD.
fn key_to_char(key: Key, shift: bool, caps_lock: bool) -> char {
    let c = match key {
        Key::A => 'a',
        Key::B => 'b',
        Key::C => 'c',
        Key::D => 'd',
        Key::E => 'e',
        Key::F => 'f',
        Key::G => 'g',
        Key::H => 'h',
        Key::I => 'i',
        Key::J => 'j',
        Key::K => 'k',
        Key::L => 'l',
        Key::M => 'm',
        Key::N => 'n',
        Key::O => 'o',
        Key::P => 'p',
        Key::Q => 'q',
        Key::R => 'r',
        Key::S => 's',
        Key::T => 't',
        Key::U => 'u',
        Key::V => 'v',
        Key::W => 'w',
        Key::X => 'x',
        Key::Y => 'y',
        Key::Z => 'z',
        Key::Key0 | Key::NumPad0 => '0',
        Key::Key1 | Key::NumPad1 => '1',
        Key::Key2 | Key::NumPad2 => '2',
        Key::Key3 | Key::NumPad3 => '3',
        Key::Key4 | Key::NumPad4 => '4',
        Key::Key5 | Key::NumPad5 => '5',
        Key::Key6 | Key::NumPad6 => '6',
        Key::Key7 | Key::NumPad7 => '7',
        Key::Key8 | Key::NumPad8 => '8',
        Key::Key9 | Key::NumPad9 => '9',
        Key::Space => ' ',
        Key::Enter | Key::NumPadEnter => '\n',
        Key::Tab => '\t',
        Key::Escape => '\u{1b}',
        _ => return char::REPLACEMENT_CHARACTER,
    };
    if c.is_ascii_lowercase() && shift != caps_lock {
        c.to_ascii_uppercase()
    } else {
        c
    }
}
