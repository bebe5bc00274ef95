// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;
use uefi::status::Error;

use crate::bmp::{decode, BmpHeader};
use crate::error::Context;
use crate::fs::{FileStore, SimpleFileSystemProtocol, Volume};
use crate::graphics::{Graphics, GraphicsOutputProtocol};
use crate::runtime::Runtime;
use crate::shell::{is, Command};
use crate::{Result, ToolError};

pub const USAGE: &str = "Usage: DisplayBMP [-v | --verbose] BMPfilename\n       DisplayBMP [-V | --version]\n";

/// Top left corner of the drawn image.
pub const IMAGE_ORIGIN: (usize, usize) = (50, 75);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Options {
    pub verbose: bool,
    pub file: String,
}

pub fn parse(args: &[String]) -> Command<Options> {
    let file = |arg: &String| !arg.starts_with('-');
    match args {
        [] | [_] => Command::Help,
        [_, arg] => Command::common(arg).unwrap_or_else(|| {
            if file(arg) {
                Command::Run(Options {
                    verbose: false,
                    file: arg.clone(),
                })
            } else {
                Command::Invalid
            }
        }),
        [_, flag, arg] if is(flag, "-v", "--verbose") && file(arg) => Command::Run(Options {
            verbose: true,
            file: arg.clone(),
        }),
        _ => Command::Invalid,
    }
}

fn press_key(out: &mut dyn Write, wait_for_key: &dyn Fn() -> Result<()>) -> Result<()> {
    write!(out, "\nPress any key to continue...\n\n")?;
    wait_for_key()
}

/// The mode with the widest scan line, the first one on ties.
fn widest_mode(gop: &dyn Graphics) -> u32 {
    let mut best = (0, 0);
    for mode in 0..gop.max_mode() {
        match gop.query_mode_started(mode) {
            Ok(info) if info.pixels_per_scan_line > best.1 => best = (mode, info.pixels_per_scan_line),
            Ok(_) => (),
            Err(err) => log::debug!("QueryMode {} failed: {:?}", mode, err),
        }
    }
    best.0
}

pub fn run(
    store: &dyn FileStore,
    gop: Option<&dyn Graphics>,
    options: &Options,
    wait_for_key: &dyn Fn() -> Result<()>,
    out: &mut dyn Write,
) -> Result<()> {
    let data = store.read(&options.file)?;
    let header = BmpHeader::parse(&data)?;
    if options.verbose {
        writeln!(out)?;
        header.print(out)?;
        press_key(out, wait_for_key)?;
    }

    let gop = gop.ok_or_else(|| ToolError::new(Error::NotFound, "Graphics console not found."))?;
    let image = decode(&data)?;

    let original = gop.current_mode();
    let mode = widest_mode(gop);
    log::debug!("mode {} -> {}", original, mode);
    gop.set_mode(mode).context("SetMode")?;

    let (x, y) = IMAGE_ORIGIN;
    let drawn = gop
        .blt(&image.pixels, x, y, image.width, image.height)
        .context("Gop->Blt");

    let key = press_key(out, wait_for_key);
    gop.set_mode(original).context("SetMode")?;
    key?;
    drawn
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    let options = match parse(args).options(out, USAGE)? {
        Some(options) => options,
        None => return Ok(()),
    };
    let image = rt.loaded_image()?;
    let fs = rt
        .handle_protocol::<SimpleFileSystemProtocol>(image.device_handle)
        .context("Could not open specified file")?;
    let gops = rt
        .physical_protocols::<GraphicsOutputProtocol>()
        .context("No GOP handles found via LocateHandleBuffer")?;
    let gop = gops.first().map(|&gop| gop as &dyn Graphics);
    run(&Volume::new(fs), gop, &options, &|| rt.wait_for_key(), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmp::tests::bmp;
    use crate::fs::MemoryStore;
    use crate::graphics::BltPixel;
    use crate::shell::tests::args;
    use crate::tools::graphic_modes::tests::FakeGop;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::cell::Cell;

    fn store(name: &str, data: Vec<u8>) -> MemoryStore {
        let store = MemoryStore::default();
        store.files.borrow_mut().insert(name.to_string(), data);
        store
    }

    fn options(verbose: bool) -> Options {
        Options {
            verbose,
            file: "logo.bmp".to_string(),
        }
    }

    #[test]
    fn options_parsing() {
        assert_eq!(parse(&args("DisplayBMP logo.bmp")), Command::Run(options(false)));
        assert_eq!(parse(&args("DisplayBMP --verbose logo.bmp")), Command::Run(options(true)));
        assert_eq!(parse(&args("DisplayBMP")), Command::Help);
        assert_eq!(parse(&args("DisplayBMP -v")), Command::Invalid);
        assert_eq!(parse(&args("DisplayBMP -v -x")), Command::Invalid);
        assert_eq!(parse(&args("DisplayBMP logo.bmp -v")), Command::Invalid);
        assert_eq!(parse(&args("DisplayBMP -V")), Command::Version);
    }

    #[test]
    fn draws_in_widest_mode() {
        let store = store("logo.bmp", bmp(1, 1, 24, &[], &[0x10, 0x20, 0x30, 0]));
        let gop = FakeGop::new(&[(800, 600, 800), (1920, 1080, 1920), (1280, 1024, 1280)]);
        gop.current.set(2);
        let keys = Cell::new(0);
        let wait = || -> Result<()> {
            keys.set(keys.get() + 1);
            Ok(())
        };
        let mut out = String::new();
        run(&store, Some(&gop), &options(false), &wait, &mut out).unwrap();

        assert_eq!(*gop.switches.borrow(), [1, 2]);
        let drawn = gop.drawn.borrow();
        assert_eq!(drawn.len(), 1);
        let (x, y, width, height, pixels) = &drawn[0];
        assert_eq!((*x, *y, *width, *height), (50, 75, 1, 1));
        assert_eq!(pixels[0], BltPixel { blue: 0x10, green: 0x20, red: 0x30, reserved: 0 });
        assert_eq!(keys.get(), 1);
        assert_eq!(out, "\nPress any key to continue...\n\n");
    }

    #[test]
    fn verbose_header_waits() {
        let store = store("logo.bmp", bmp(1, 1, 24, &[], &[0; 4]));
        let gop = FakeGop::new(&[(640, 480, 640)]);
        let keys = Cell::new(0);
        let wait = || -> Result<()> {
            keys.set(keys.get() + 1);
            Ok(())
        };
        let mut out = String::new();
        run(&store, Some(&gop), &options(true), &wait, &mut out).unwrap();
        assert!(out.starts_with("\n  BMP Signature     : \"BM\"\n"));
        assert_eq!(keys.get(), 2);
    }

    #[test]
    fn restores_mode_when_key_wait_fails() {
        let store = store("logo.bmp", bmp(1, 1, 24, &[], &[0; 4]));
        let gop = FakeGop::new(&[(800, 600, 800), (1920, 1080, 1920)]);
        let wait = || -> Result<()> { Err(ToolError::new(Error::DeviceError, "WaitForEvent")) };
        let mut out = String::new();
        let err = run(&store, Some(&gop), &options(false), &wait, &mut out).unwrap_err();

        assert!(matches!(err.status, Error::DeviceError));
        assert_eq!(*gop.switches.borrow(), [1, 0]);
        assert_eq!(gop.current.get(), 0);
        assert_eq!(gop.drawn.borrow().len(), 1);
    }

    #[test]
    fn rejects_before_drawing() {
        let gop = FakeGop::new(&[(640, 480, 640)]);
        let mut out = String::new();

        let mut data = bmp(1, 1, 24, &[], &[0; 4]);
        // BI_RLE8
        data[30] = 1;
        let err = run(&store("logo.bmp", data), Some(&gop), &options(false), &|| Ok(()), &mut out).unwrap_err();
        assert_eq!(err.message, "Compression type not 0");

        let twelve = bmp(1, 1, 12, &[], &[0; 4]);
        let err = run(&store("logo.bmp", twelve), Some(&gop), &options(false), &|| Ok(()), &mut out).unwrap_err();
        assert!(matches!(err.status, Error::Unsupported));

        let err = run(&MemoryStore::default(), Some(&gop), &options(false), &|| Ok(()), &mut out).unwrap_err();
        assert_eq!(err.message, "Could not open specified file");

        let good = bmp(1, 1, 24, &[], &[0; 4]);
        let err = run(&store("logo.bmp", good), None, &options(false), &|| Ok(()), &mut out).unwrap_err();
        assert_eq!(err.message, "Graphics console not found.");

        assert!(gop.switches.borrow().is_empty());
        assert!(out.is_empty());
    }
}
