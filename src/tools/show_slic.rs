// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;
use uefi::status::Error;

use crate::acpi::slic::{Slic, SIGNATURE};
use crate::acpi::Acpi;
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::{Result, ToolError};

pub const USAGE: &str = "Usage: ShowSLIC [-v | --verbose]\n       ShowSLIC [-V | --version]\n";

pub fn parse(args: &[String]) -> Command<bool> {
    single_flag(args, false, &[("-v", "--verbose", true)])
}

/// Print every SLIC table the platform lists.
pub fn run(acpi: &Acpi, verbose: bool, out: &mut dyn Write) -> Result<()> {
    let tables = acpi.tables(SIGNATURE)?;
    if tables.is_empty() {
        return Err(ToolError::new(Error::NotFound, "SLIC table not found"));
    }
    for table in tables {
        Slic::parse(table)?.print(out, verbose)?;
    }
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    let verbose = match parse(args).options(out, USAGE)? {
        Some(verbose) => verbose,
        None => return Ok(()),
    };
    let mapper = rt.mapper();
    let acpi = Acpi::new(&mapper, &rt.config_tables())?;
    run(&acpi, verbose, out)
}
