// SPDX-License-Identifier: GPL-3.0-only

//! Boot Graphics Resource Table.

use core::{fmt, mem};
use plain::Plain;

use super::SdtHeader;
use crate::{read_struct, Result};

pub const SIGNATURE: &[u8; 4] = b"BGRT";

pub const STATUS_NOT_DISPLAYED: u8 = 0;
pub const STATUS_DISPLAYED: u8 = 1;
pub const IMAGE_TYPE_BMP: u8 = 0;

#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct Bgrt {
    pub header: SdtHeader,
    pub version: u16,
    pub status: u8,
    pub image_type: u8,
    pub image_address: u64,
    pub image_offset_x: u32,
    pub image_offset_y: u32,
}

unsafe impl Plain for Bgrt {}

pub const BGRT_SIZE: usize = mem::size_of::<Bgrt>();

impl Bgrt {
    pub fn parse(table: &[u8]) -> Result<Self> {
        read_struct(table)
    }

    /// Version, status, image type and offsets.
    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let version = self.version;
        let offset_x = self.image_offset_x;
        let offset_y = self.image_offset_y;

        writeln!(out, "  Version           : {}", version)?;
        write!(out, "  Status            : {}", self.status)?;
        match self.status {
            STATUS_NOT_DISPLAYED => write!(out, " (Not displayed)")?,
            STATUS_DISPLAYED => write!(out, " (Displayed)")?,
            _ => (),
        }
        writeln!(out)?;
        write!(out, "  Image Type        : {}", self.image_type)?;
        if self.image_type == IMAGE_TYPE_BMP {
            write!(out, " (BMP format)")?;
        }
        writeln!(out)?;
        writeln!(out, "  Offset Y          : {}", offset_y)?;
        writeln!(out, "  Offset X          : {}", offset_x)
    }
}
