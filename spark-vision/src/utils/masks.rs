use anyhow::{ensure, Result};
use bitvec::prelude::*;
use image::{GrayImage, Luma, Rgb, RgbImage};
use rayon::prelude::*;
use std::fmt;

/// Binary mask with the dimensions of the image it was decoded for.
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: BitVec,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: bitvec![0; width as usize * height as usize],
        }
    }

    pub fn from_bits(width: u32, height: u32, bits: BitVec) -> Option<Self> {
        (bits.len() == width as usize * height as usize).then_some(Self { width, height, bits })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.bits.set(index, value);
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn foreground_count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn bits(&self) -> &BitSlice {
        &self.bits
    }

    /// Row-major bytes, `255` for foreground and `0` for background.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.iter().map(|bit| if *bit { 255 } else { 0 }).collect()
    }

    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mask")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("foreground", &self.foreground_count())
            .finish()
    }
}

pub trait ApplyMask {
    fn layering_mask(&mut self, mask: &Mask, apply_color: Rgb<u8>) -> Result<()>;
}

impl ApplyMask for RgbImage {
    fn layering_mask(&mut self, mask: &Mask, apply_color: Rgb<u8>) -> Result<()> {
        ensure!(
            self.dimensions() == (mask.width(), mask.height()),
            "mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            self.width(),
            self.height()
        );

        let bits = mask.bits();
        self.par_chunks_mut(3)
            .enumerate()
            .filter(|(index, _)| bits[*index])
            .for_each(|(_, pixel)| {
                for (channel, color) in pixel.iter_mut().zip(apply_color.0) {
                    *channel = channel.saturating_add(color);
                }
            });

        Ok(())
    }
}
