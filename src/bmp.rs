// SPDX-License-Identifier: GPL-3.0-only

//! Uncompressed Windows bitmaps, as found behind the BGRT and in image files.

use alloc::vec::Vec;
use core::{cmp, fmt, mem};
use plain::Plain;
use uefi::status::Error;

use crate::graphics::BltPixel;
use crate::{ascii, read_struct, Result, ToolError};

const FILE_HEADER_SIZE: u32 = 14;

// BMP_IMAGE_HEADER
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct BmpHeader {
    pub char_b: u8,
    pub char_m: u8,
    pub size: u32,
    pub reserved: [u16; 2],
    pub image_offset: u32,
    pub header_size: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub planes: u16,
    pub bit_per_pixel: u16,
    pub compression_type: u32,
    pub image_size: u32,
    pub x_pixels_per_meter: u32,
    pub y_pixels_per_meter: u32,
    pub number_of_colors: u32,
    pub important_colors: u32,
}

unsafe impl Plain for BmpHeader {}

pub const BMP_HEADER_SIZE: usize = mem::size_of::<BmpHeader>();

fn unsupported(message: &str) -> ToolError {
    ToolError::new(Error::Unsupported, message)
}

impl BmpHeader {
    /// Read and validate the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header: Self = read_struct(data)?;
        header.validate()?;
        Ok(header)
    }

    pub fn validate(&self) -> Result<()> {
        if self.char_b != b'B' || self.char_m != b'M' {
            return Err(unsupported("Unsupported image format"));
        }
        // Only BITMAPINFOHEADER follows the file header
        if self.header_size != BMP_HEADER_SIZE as u32 - FILE_HEADER_SIZE {
            return Err(unsupported("Unsupported BITMAPFILEHEADER"));
        }
        if self.compression_type != 0 {
            return Err(unsupported("Compression type not 0"));
        }
        match self.bit_per_pixel {
            4 | 8 | 12 | 24 => Ok(()),
            _ => Err(unsupported("Bits per pixel is not one of 4, 8, 12 or 24")),
        }
    }

    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let size = self.size;
        let image_offset = self.image_offset;
        let header_size = self.header_size;
        let width = self.pixel_width;
        let height = self.pixel_height;
        let planes = self.planes;
        let bit_per_pixel = self.bit_per_pixel;
        let compression_type = self.compression_type;
        let image_size = self.image_size;
        let x_pixels_per_meter = self.x_pixels_per_meter;
        let y_pixels_per_meter = self.y_pixels_per_meter;
        let number_of_colors = self.number_of_colors;
        let important_colors = self.important_colors;

        writeln!(out, "  BMP Signature     : \"{}\"", ascii(&[self.char_b, self.char_m]))?;
        writeln!(out, "  Size              : {}", size)?;
        writeln!(out, "  Image Offset      : {}", image_offset)?;
        writeln!(out, "  Header Size       : {}", header_size)?;
        writeln!(out, "  Image Width       : {}", width)?;
        writeln!(out, "  Image Height      : {}", height)?;
        writeln!(out, "  Planes            : {}", planes)?;
        writeln!(out, "  Bit Per Pixel     : {}", bit_per_pixel)?;
        writeln!(out, "  Compression Type  : {}", compression_type)?;
        writeln!(out, "  Image Size        : {}", image_size)?;
        writeln!(out, "  X Pixels Per Meter: {}", x_pixels_per_meter)?;
        writeln!(out, "  Y Pixels Per Meter: {}", y_pixels_per_meter)?;
        writeln!(out, "  Number of Colors  : {}", number_of_colors)?;
        writeln!(out, "  Important Colors  : {}", important_colors)
    }

    /// Bytes per pixel row, padded to a multiple of four.
    pub fn stride(&self) -> usize {
        let bits = self.pixel_width as usize * self.bit_per_pixel as usize;
        (bits + 31) / 32 * 4
    }
}

/// A bitmap converted to top-down GOP pixels.
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<BltPixel>,
}

fn palette(data: &[u8], header: &BmpHeader) -> Result<Vec<BltPixel>> {
    let max = 1usize << header.bit_per_pixel;
    let count = match header.number_of_colors as usize {
        0 => max,
        n => cmp::min(n, max),
    };
    let start = (FILE_HEADER_SIZE + header.header_size) as usize;
    let table = data
        .get(start..start + count * 4)
        .ok_or_else(|| ToolError::new(Error::InvalidParameter, "Palette truncated"))?;
    Ok(table
        .chunks_exact(4)
        .map(|c| BltPixel {
            blue: c[0],
            green: c[1],
            red: c[2],
            reserved: c[3],
        })
        .collect())
}

/// Decode a bitmap file held in memory.
pub fn decode(data: &[u8]) -> Result<Image> {
    let header = BmpHeader::parse(data)?;
    let bit_per_pixel = header.bit_per_pixel;
    let width = header.pixel_width as usize;
    let height = header.pixel_height as usize;
    let stride = header.stride();
    let offset = header.image_offset as usize;
    if width == 0 || height == 0 {
        return Err(ToolError::new(Error::InvalidParameter, "Image is empty"));
    }

    let bitmap = stride
        .checked_mul(height)
        .and_then(|len| data.get(offset..offset.checked_add(len)?))
        .ok_or_else(|| ToolError::new(Error::InvalidParameter, "Image data truncated"))?;

    let palette = match bit_per_pixel {
        4 | 8 => palette(data, &header)?,
        24 => Vec::new(),
        _ => {
            return Err(unsupported(&format!("{} bits per pixel images cannot be displayed", bit_per_pixel)));
        }
    };
    let color = |index: usize| palette.get(index).copied().unwrap_or_default();

    let mut pixels = Vec::with_capacity(width * height);
    // Rows are stored bottom-up
    for row in bitmap.chunks_exact(stride).rev() {
        for x in 0..width {
            let pixel = match bit_per_pixel {
                4 => {
                    let byte = row[x / 2];
                    let index = if x % 2 == 0 { byte >> 4 } else { byte & 0xF };
                    color(index as usize)
                }
                8 => color(row[x] as usize),
                _ => BltPixel {
                    blue: row[x * 3],
                    green: row[x * 3 + 1],
                    red: row[x * 3 + 2],
                    reserved: 0,
                },
            };
            pixels.push(pixel);
        }
    }

    Ok(Image { width, height, pixels })
}
