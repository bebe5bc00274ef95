// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::acpi::bgrt::{Bgrt, BGRT_SIZE, SIGNATURE};
use crate::acpi::Acpi;
use crate::bmp::{BmpHeader, BMP_HEADER_SIZE};
use crate::error::Context;
use crate::fs::{FileStore, SimpleFileSystemProtocol, Volume};
use crate::hex_table;
use crate::mapper::Mapper;
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::Result;

pub const USAGE: &str = "Usage: ShowBGRT [-v | --verbose] [ -s | --save]\n       ShowBGRT [-V | --version]\n       ShowBGRT [-d | --dump]\n";

/// Boot logo saved by `--save`, in the root of the first file system.
pub const LOGO_FILE: &str = "bootlogo.bmp";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    Normal,
    Verbose,
    Dump,
    Save,
}

pub fn parse(args: &[String]) -> Command<Mode> {
    single_flag(
        args,
        Mode::Normal,
        &[
            ("-v", "--verbose", Mode::Verbose),
            ("-d", "--dump", Mode::Dump),
            ("-s", "--save", Mode::Save),
        ],
    )
}

/// Validate the logo the BGRT points at and print or save it.
fn boot_logo(mapper: &dyn Mapper, address: u64, mode: Mode, store: Option<&dyn FileStore>, out: &mut dyn Write) -> Result<()> {
    let header = BmpHeader::parse(mapper.map(address, BMP_HEADER_SIZE)?)?;
    match mode {
        Mode::Save => {
            let size = header.size as usize;
            let image = mapper.map(address, size)?;
            if let Some(store) = store {
                store.write(LOGO_FILE, image)?;
                writeln!(out, "Successfully saved image to {}", LOGO_FILE)?;
            }
        }
        Mode::Verbose => {
            writeln!(out)?;
            writeln!(out, "Image Details")?;
            header.print(out)?;
        }
        _ => (),
    }
    Ok(())
}

pub fn run(acpi: &Acpi, mapper: &dyn Mapper, mode: Mode, store: Option<&dyn FileStore>, out: &mut dyn Write) -> Result<()> {
    let table = acpi.find(SIGNATURE)?;
    let bgrt = Bgrt::parse(table)?;

    writeln!(out)?;
    if mode == Mode::Dump {
        hex_table(out, &table[..BGRT_SIZE])?;
    } else {
        if mode == Mode::Verbose {
            bgrt.header.print(out)?;
        }
        if mode != Mode::Save {
            bgrt.print(out)?;
        }
        let image_address = bgrt.image_address;
        if mode == Mode::Verbose {
            writeln!(out, "  Physical Address  : 0x{:08x}", image_address)?;
        }
        boot_logo(mapper, image_address, mode, store, out)?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    let mode = match parse(args).options(out, USAGE)? {
        Some(mode) => mode,
        None => return Ok(()),
    };

    let mapper = rt.mapper();
    let acpi = Acpi::new(&mapper, &rt.config_tables())?;
    let volume = match mode {
        Mode::Save => Some(Volume::new(
            rt.locate_protocol::<SimpleFileSystemProtocol>()
                .context("Cannot find EFI_SIMPLE_FILE_SYSTEM_PROTOCOL")?,
        )),
        _ => None,
    };
    run(&acpi, &mapper, mode, volume.as_ref().map(|v| v as &dyn FileStore), out)
}
