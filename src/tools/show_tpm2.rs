// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;
use uefi::status::Error;

use crate::acpi::tpm2::{ControlArea, Tpm2Table, CONTROL_AREA_SIZE, SIGNATURE};
use crate::acpi::Acpi;
use crate::mapper::Mapper;
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::{Result, ToolError};

pub const USAGE: &str = "Usage: ShowTPM2 [-V | --version]\n";

pub fn parse(args: &[String]) -> Command<()> {
    single_flag(args, (), &[])
}

fn print_table(mapper: &dyn Mapper, data: &[u8], out: &mut dyn Write) -> Result<()> {
    let table = Tpm2Table::parse(data)?;

    writeln!(out)?;
    table.print_header(out)?;
    let address = table.control_area_address;
    if address == 0 {
        log::debug!("TPM2 table has no control area");
    } else {
        ControlArea::parse(mapper.map(address, CONTROL_AREA_SIZE)?)?.print(out)?;
    }
    table.print_start_method(out, data)?;
    writeln!(out)?;
    Ok(())
}

pub fn run(acpi: &Acpi, mapper: &dyn Mapper, out: &mut dyn Write) -> Result<()> {
    let tables = acpi.tables(SIGNATURE)?;
    if tables.is_empty() {
        return Err(ToolError::new(Error::NotFound, "TPM2 table not found"));
    }
    for data in tables {
        print_table(mapper, data, out)?;
    }
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    if parse(args).options(out, USAGE)?.is_none() {
        return Ok(());
    }
    let mapper = rt.mapper();
    let acpi = Acpi::new(&mapper, &rt.config_tables())?;
    run(&acpi, &mapper, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acpi::tests::platform;
    use crate::acpi::tpm2::tests::{control_area, tpm2};
    use crate::shell::tests::args;

    #[test]
    fn options() {
        assert_eq!(parse(&args("ShowTPM2")), Command::Run(()));
        assert_eq!(parse(&args("ShowTPM2 -V")), Command::Version);
        assert_eq!(parse(&args("ShowTPM2 a b")), Command::Invalid);
    }

    #[test]
    fn with_control_area() {
        let (mapper, config) = platform(&[tpm2(0xfed4_0040, 7, &[])]);
        let mapper = mapper.with(0xfed4_0040, &control_area());
        let acpi = Acpi::new(&mapper, &config).unwrap();
        let mut out = String::new();
        run(&acpi, &mapper, &mut out).unwrap();
        assert!(out.starts_with("\n                       Signature : TPM2\n"));
        assert!(out.contains(
            "       Control Area (CA) Address : 0xfed40040\n                  CA Error Value : 0x0000 (0)\n"
        ));
        assert!(out.contains("      CA Response Buffer Address : 0xfed40080\n                    Start Method : 7"));
        assert!(out.ends_with("  Platform Specific Methods Size : 0\n\n"));
    }

    #[test]
    fn without_control_area() {
        let (mapper, config) = platform(&[tpm2(0, 2, &[1, 2])]);
        let acpi = Acpi::new(&mapper, &config).unwrap();
        let mut out = String::new();
        run(&acpi, &mapper, &mut out).unwrap();
        assert!(!out.contains("CA Error Value"));
        assert!(out.contains("    Platform Specific Parameters : 01 02 \n"));
    }
}
