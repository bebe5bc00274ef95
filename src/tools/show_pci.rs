// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;
use uefi::status::Error;

use crate::error::Context;
use crate::pci::{scan_bus, PciEnumerationComplete, PciRootBridge, PciRootBridgeIoProtocol, PCI_MAX_BUS};
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::{Result, ToolError};

pub const USAGE: &str = "Usage: ShowPCI [-V | --version]\n";

pub fn parse(args: &[String]) -> Command<()> {
    single_flag(args, (), &[])
}

fn print_bus_range(out: &mut dyn Write, bridge: &dyn PciRootBridge, min: u16, max: u16) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "  Bus     Vendor    Device   Subvendor SubvendorDevice")?;
    writeln!(out, "  ----------------------------------------------------")?;
    for bus in min..=max {
        for function in scan_bus(bridge, bus).context("Reading PCI configuration space")? {
            writeln!(out, "{}", function)?;
        }
    }
    Ok(())
}

pub fn run(bridges: &[&dyn PciRootBridge], out: &mut dyn Write) -> Result<()> {
    if bridges.is_empty() {
        return Err(ToolError::new(Error::NotFound, "Failed to find any PCI handles"));
    }

    for bridge in bridges {
        let ranges = match bridge.bus_ranges() {
            Ok(ranges) => ranges,
            Err(Error::Unsupported) => {
                log::debug!("root bridge has no bus resources, scanning every bus");
                vec![(0, PCI_MAX_BUS)]
            }
            Err(err) => {
                let message = format!("Retrieving PCI bus range [{:?}]", err);
                return Err(ToolError::new(err, message));
            }
        };
        for (min, max) in ranges {
            print_bus_range(out, *bridge, min, max)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    if parse(args).options(out, USAGE)?.is_none() {
        return Ok(());
    }

    if !rt.has_protocol::<PciEnumerationComplete>() {
        return Err(ToolError::new(Error::NotFound, "Could not find PCI enumeration protocol"));
    }

    let found = rt.protocols::<PciRootBridgeIoProtocol>()?;
    let bridges: Vec<&dyn PciRootBridge> = found.iter().map(|&bridge| bridge as &dyn PciRootBridge).collect();
    run(&bridges, out)
}
