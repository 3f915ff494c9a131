//! Capturable drawing surface.

use crate::source::SourceImage;

/// An RGBA8 frame buffer whose contents are sampled once per redraw.
#[derive(Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    draws: u64,
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            draws: 0,
        }
    }

    /// Allocate a surface matching the image's intrinsic size.
    pub fn for_image(image: &SourceImage) -> Self {
        Self::new(image.width(), image.height())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Draw `image` stretched over the whole surface.
    pub fn draw_image(&mut self, image: &SourceImage) {
        if image.width() == self.width && image.height() == self.height {
            self.pixels.copy_from_slice(image.pixels());
        } else {
            self.draw_scaled(image);
        }
        self.draws += 1;
    }

    /// Nearest-neighbour stretch for images that do not match the surface.
    fn draw_scaled(&mut self, image: &SourceImage) {
        let src = image.pixels();
        let (sw, sh) = (image.width() as usize, image.height() as usize);
        let (dw, dh) = (self.width as usize, self.height as usize);

        for y in 0..dh {
            let sy = y * sh / dh;
            for x in 0..dw {
                let sx = x * sw / dw;
                let s = (sy * sw + sx) * 4;
                let d = (y * dw + x) * 4;
                self.pixels[d..d + 4].copy_from_slice(&src[s..s + 4]);
            }
        }
    }

    /// Current frame contents.
    pub fn frame(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes in one frame.
    pub fn frame_len(&self) -> usize {
        self.pixels.len()
    }

    /// Redraws issued so far.
    pub fn draw_count(&self) -> u64 {
        self.draws
    }
}
