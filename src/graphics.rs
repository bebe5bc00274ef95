// SPDX-License-Identifier: GPL-3.0-only

//! Graphics Output, UGA Draw and Console Control protocols.

use core::{fmt, ptr};
use uefi::guid::Guid;
use uefi::status::{Error, Status};

use crate::runtime::Protocol;
use crate::status::check;

pub const GRAPHICS_OUTPUT_PROTOCOL_GUID: Guid = Guid(0x9042_a9de, 0x23dc, 0x4a38, [0x96, 0xfb, 0x7a, 0xde, 0xd0, 0x80, 0x51, 0x6a]);
pub const UGA_DRAW_PROTOCOL_GUID: Guid = Guid(0x982c_298b, 0xf4fa, 0x41cb, [0xb8, 0x38, 0x77, 0xaa, 0x68, 0x8f, 0xb8, 0x39]);
pub const CONSOLE_CONTROL_PROTOCOL_GUID: Guid = Guid(0xf42f_7782, 0x012e, 0x4c12, [0x99, 0x56, 0x49, 0xf9, 0x43, 0x04, 0xf7, 0x21]);

pub const PIXEL_RGB_RESERVED: u32 = 0;
pub const PIXEL_BGR_RESERVED: u32 = 1;
pub const PIXEL_BIT_MASK: u32 = 2;
pub const PIXEL_BLT_ONLY: u32 = 3;

const BLT_BUFFER_TO_VIDEO: u32 = 2;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct BltPixel {
    pub blue: u8,
    pub green: u8,
    pub red: u8,
    pub reserved: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct PixelBitmask {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub reserved: u32,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct ModeInfo {
    pub version: u32,
    pub horizontal_resolution: u32,
    pub vertical_resolution: u32,
    pub pixel_format: u32,
    pub pixel_information: PixelBitmask,
    pub pixels_per_scan_line: u32,
}

impl fmt::Display for ModeInfo {
    /// Resolution, pixel format and scan line, as listed by GraphicModes.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{} ", self.horizontal_resolution, self.vertical_resolution)?;
        match self.pixel_format {
            PIXEL_RGB_RESERVED => write!(f, "RGBReserved")?,
            PIXEL_BGR_RESERVED => write!(f, "BGRReserved")?,
            PIXEL_BIT_MASK => {
                let mask = self.pixel_information;
                write!(
                    f,
                    "Red:{:08x} Green:{:08x} Blue:{:08x} Reserved:{:08x}",
                    mask.red, mask.green, mask.blue, mask.reserved
                )?
            }
            PIXEL_BLT_ONLY => write!(f, "(blt only)")?,
            _ => write!(f, "(Invalid pixel format)")?,
        }
        write!(f, " Pixels {}", self.pixels_per_scan_line)
    }
}

#[repr(C)]
pub struct GraphicsOutputMode {
    pub max_mode: u32,
    pub mode: u32,
    pub info: *const ModeInfo,
    pub size_of_info: usize,
    pub frame_buffer_base: u64,
    pub frame_buffer_size: usize,
}

#[repr(C)]
pub struct GraphicsOutputProtocol {
    pub query_mode: extern "efiapi" fn(&GraphicsOutputProtocol, u32, &mut usize, &mut *const ModeInfo) -> Status,
    pub set_mode: extern "efiapi" fn(&GraphicsOutputProtocol, u32) -> Status,
    #[allow(clippy::type_complexity)]
    pub blt: extern "efiapi" fn(
        &GraphicsOutputProtocol,
        *mut BltPixel,
        u32,
        usize,
        usize,
        usize,
        usize,
        usize,
        usize,
        usize,
    ) -> Status,
    pub mode: *const GraphicsOutputMode,
}

impl Protocol for GraphicsOutputProtocol {
    const GUID: Guid = GRAPHICS_OUTPUT_PROTOCOL_GUID;
}

/// A graphics adapter able to list and switch modes and draw a buffer.
pub trait Graphics {
    fn max_mode(&self) -> u32;
    fn current_mode(&self) -> u32;
    fn current_info(&self) -> Option<ModeInfo>;
    fn query_mode(&self, mode: u32) -> Result<ModeInfo, Error>;
    fn set_mode(&self, mode: u32) -> Result<(), Error>;
    /// Draw a `width` by `height` buffer with its top left corner at `(x, y)`.
    fn blt(&self, pixels: &[BltPixel], x: usize, y: usize, width: usize, height: usize) -> Result<(), Error>;

    /// Query a mode, starting the adapter first if needed.
    fn query_mode_started(&self, mode: u32) -> Result<ModeInfo, Error> {
        match self.query_mode(mode) {
            Err(Error::NotStarted) => {
                let _ = self.set_mode(self.current_mode());
                self.query_mode(mode)
            }
            other => other,
        }
    }
}

impl GraphicsOutputProtocol {
    fn mode(&self) -> Option<&GraphicsOutputMode> {
        unsafe { self.mode.as_ref() }
    }
}

impl Graphics for GraphicsOutputProtocol {
    fn max_mode(&self) -> u32 {
        self.mode().map_or(0, |mode| mode.max_mode)
    }

    fn current_mode(&self) -> u32 {
        self.mode().map_or(0, |mode| mode.mode)
    }

    fn current_info(&self) -> Option<ModeInfo> {
        self.mode().and_then(|mode| unsafe { mode.info.as_ref() }).copied()
    }

    fn query_mode(&self, mode: u32) -> Result<ModeInfo, Error> {
        let mut size = 0;
        let mut info = ptr::null();
        check((self.query_mode)(self, mode, &mut size, &mut info))?;
        unsafe { info.as_ref() }.copied().ok_or(Error::DeviceError)
    }

    fn set_mode(&self, mode: u32) -> Result<(), Error> {
        check((self.set_mode)(self, mode)).map(|_| ())
    }

    fn blt(&self, pixels: &[BltPixel], x: usize, y: usize, width: usize, height: usize) -> Result<(), Error> {
        if pixels.len() < width * height {
            return Err(Error::InvalidParameter);
        }
        check((self.blt)(
            self,
            pixels.as_ptr() as *mut BltPixel,
            BLT_BUFFER_TO_VIDEO,
            0,
            0,
            x,
            y,
            width,
            height,
            0,
        ))
        .map(|_| ())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UgaMode {
    pub horizontal_resolution: u32,
    pub vertical_resolution: u32,
    pub color_depth: u32,
    pub refresh_rate: u32,
}

#[repr(C)]
pub struct UgaDrawProtocol {
    pub get_mode: extern "efiapi" fn(&UgaDrawProtocol, &mut u32, &mut u32, &mut u32, &mut u32) -> Status,
    pub set_mode: extern "efiapi" fn(&UgaDrawProtocol, u32, u32, u32, u32) -> Status,
    pub blt: usize,
}

impl Protocol for UgaDrawProtocol {
    const GUID: Guid = UGA_DRAW_PROTOCOL_GUID;
}

pub trait UgaDraw {
    fn mode(&self) -> Result<UgaMode, Error>;
}

impl UgaDraw for UgaDrawProtocol {
    fn mode(&self) -> Result<UgaMode, Error> {
        let mut mode = UgaMode::default();
        check((self.get_mode)(
            self,
            &mut mode.horizontal_resolution,
            &mut mode.vertical_resolution,
            &mut mode.color_depth,
            &mut mode.refresh_rate,
        ))?;
        Ok(mode)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScreenMode {
    Text,
    Graphics,
    MaxValue,
}

#[repr(C)]
pub struct ConsoleControlProtocol {
    pub get_mode: extern "efiapi" fn(&ConsoleControlProtocol, &mut u32, &mut u8, &mut u8) -> Status,
    pub set_mode: extern "efiapi" fn(&ConsoleControlProtocol, u32) -> Status,
    pub lock_std_in: usize,
}

impl Protocol for ConsoleControlProtocol {
    const GUID: Guid = CONSOLE_CONTROL_PROTOCOL_GUID;
}

/// Legacy EDK console control.
pub trait ConsoleControl {
    /// Current screen mode and whether GOP or UGA is available.
    fn mode(&self) -> Result<(ScreenMode, bool), Error>;
}

impl ConsoleControl for ConsoleControlProtocol {
    fn mode(&self) -> Result<(ScreenMode, bool), Error> {
        let mut mode = 0;
        let mut gop_uga_exists = 0;
        let mut std_in_locked = 0;
        check((self.get_mode)(self, &mut mode, &mut gop_uga_exists, &mut std_in_locked))?;
        let mode = match mode {
            0 => ScreenMode::Text,
            1 => ScreenMode::Graphics,
            _ => ScreenMode::MaxValue,
        };
        Ok((mode, gop_uga_exists != 0))
    }
}
