// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::error::Context;
use crate::event_log::events;
use crate::mapper::Mapper;
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::tcg::{Tree, TreeProtocol, EVENT_LOG_FORMAT_TCG_1_2};
use crate::Result;

pub const USAGE: &str = "Usage: ShowTrEELog [-v | --verbose]\n       ShowTrEELog [-V | --version]\n";

const LABEL_WIDTH: usize = 17;

pub fn parse(args: &[String]) -> Command<bool> {
    single_flag(args, false, &[("-v", "--verbose", true)])
}

pub fn run(tree: &dyn Tree, mapper: &dyn Mapper, verbose: bool, out: &mut dyn Write) -> Result<()> {
    let info = tree
        .event_log(EVENT_LOG_FORMAT_TCG_1_2)
        .context("TreeProtocol GetEventLog")?;
    for event in events(mapper, &info)? {
        event.print(out, LABEL_WIDTH, "Event PCR Index", verbose)?;
    }
    if info.truncated {
        writeln!(out, "Event log truncated")?;
    }
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
