use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, RgbImage};

/// Byte order of the three color channels of every pixel in a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// An 8-bit, 3-channel pixel buffer that remembers its channel order.
///
/// The underlying buffer is an [`RgbImage`] regardless of the order, so the
/// `image`/`imageproc` APIs can operate on it directly; `order` says how the
/// bytes must be interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: RgbImage,
    order: ChannelOrder,
}

impl Frame {
    pub fn new(pixels: RgbImage, order: ChannelOrder) -> Self {
        Self { pixels, order }
    }

    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self::new(pixels, ChannelOrder::Rgb)
    }

    /// Decodes an image file into an RGB frame.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path).with_context(|| format!("Failed to open image {path:?}"))?;
        Ok(Self::from(image))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbImage {
        &mut self.pixels
    }

    /// Returns a new frame with BGR channel order.
    pub fn to_bgr(&self) -> Frame {
        match self.order {
            ChannelOrder::Bgr => self.clone(),
            ChannelOrder::Rgb => Frame::new(swap_red_blue(&self.pixels), ChannelOrder::Bgr),
        }
    }

    /// Returns the pixels as they should appear on screen, in RGB order.
    pub fn to_rgb_image(&self) -> RgbImage {
        match self.order {
            ChannelOrder::Rgb => self.pixels.clone(),
            ChannelOrder::Bgr => swap_red_blue(&self.pixels),
        }
    }

    /// Maps an RGB color into this frame's channel order.
    pub fn native_color(&self, rgb: [u8; 3]) -> [u8; 3] {
        match self.order {
            ChannelOrder::Rgb => rgb,
            ChannelOrder::Bgr => [rgb[2], rgb[1], rgb[0]],
        }
    }

    /// Encodes the frame to `path`, overwriting any existing file.
    /// The format is picked from the file extension.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.to_rgb_image()
            .save(path)
            .with_context(|| format!("Failed to write frame to {path:?}"))
    }
}

impl From<DynamicImage> for Frame {
    fn from(image: DynamicImage) -> Self {
        Self::from_rgb(image.to_rgb8())
    }
}

fn swap_red_blue(src: &RgbImage) -> RgbImage {
    let mut dst = src.clone();
    for pixel in dst.pixels_mut() {
        pixel.0.swap(0, 2);
    }
    dst
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn sample() -> Frame {
        let mut pixels = RgbImage::new(2, 1);
        pixels.put_pixel(0, 0, Rgb([10, 20, 30]));
        pixels.put_pixel(1, 0, Rgb([200, 100, 0]));
        Frame::from_rgb(pixels)
    }

    #[test]
    fn to_bgr_swaps_red_and_blue() {
        let rgb = sample();
        let bgr = rgb.to_bgr();
        assert_eq!(bgr.order(), ChannelOrder::Bgr);
        assert_eq!(bgr.pixels().get_pixel(0, 0), &Rgb([30, 20, 10]));
        assert_eq!(bgr.pixels().get_pixel(1, 0), &Rgb([0, 100, 200]));
        // source untouched
        assert_eq!(rgb.pixels().get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn to_bgr_on_bgr_frame_is_a_copy() {
        let bgr = sample().to_bgr();
        assert_eq!(bgr.to_bgr(), bgr);
    }

    #[test]
    fn rgb_view_undoes_bgr() {
        let rgb = sample();
        assert_eq!(rgb.to_bgr().to_rgb_image(), *rgb.pixels());
    }

    #[test]
    fn native_color_follows_order() {
        let rgb = sample();
        assert_eq!(rgb.native_color([1, 2, 3]), [1, 2, 3]);
        assert_eq!(rgb.to_bgr().native_color([1, 2, 3]), [3, 2, 1]);
    }
}
