// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;
use uefi::status::Error;

use crate::error::Context;
use crate::event_log::PcrEvent;
use crate::mapper::Mapper;
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::tcg::{Tree, TreeProtocol, EVENT_LOG_FORMAT_TCG_1_2};
use crate::{Result, ToolError};

pub const USAGE: &str = "Usage: ShowTrEE [-v | --verbose]\n       ShowTrEE [-V | --version]\n";

const LABEL_WIDTH: usize = 29;

pub fn parse(args: &[String]) -> Command<bool> {
    single_flag(args, false, &[("-v", "--verbose", true)])
}

pub fn run(tree: &dyn Tree, mapper: &dyn Mapper, verbose: bool, out: &mut dyn Write) -> Result<()> {
    let capability = tree.capability().context("TrEEProtocol GetCapability")?;
    if capability.tree_present_flag == 0 {
        return Err(ToolError::new(Error::NotFound, "TrEEProtocol TrEEPresentFlag is false."));
    }
    capability.print(out)?;

    let info = tree
        .event_log(EVENT_LOG_FORMAT_TCG_1_2)
        .context("TreeProtocol GetEventLog")?;
    if info.last_entry == 0 {
        return Err(ToolError::new(Error::NotFound, "Event log is empty"));
    }
    let last = PcrEvent::read(mapper, info.last_entry)?;
    last.print(out, LABEL_WIDTH, "Last Event PCR Index", verbose)?;
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    let verbose = match parse(args).options(out, USAGE)? {
        Some(verbose) => verbose,
        None => return Ok(()),
    };
    let tree = rt
        .locate_protocol::<TreeProtocol>()
        .context("Failed to locate EFI_TREE_PROTOCOL")?;
    run(tree, &rt.mapper(), verbose, out)
}
