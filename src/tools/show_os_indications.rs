// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::osind::OsIndications;
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::variable::Variables;
use crate::Result;

pub const USAGE: &str = "Usage: ShowOsIndications [-v | --verbose]\n                         [-V | --version]\n";

pub fn parse(args: &[String]) -> Command<bool> {
    single_flag(args, false, &[("-v", "--verbose", true)])
}

pub fn run(vars: &dyn Variables, verbose: bool, out: &mut dyn Write) -> Result<()> {
    let indications = OsIndications::read(vars)?;

    writeln!(out)?;
    if verbose {
        indications.print_raw(out)?;
        writeln!(out)?;
    }
    indications.print_features(out)?;
    writeln!(out)?;
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    match parse(args).options(out, USAGE)? {
        Some(verbose) => run(&rt.variables(), verbose, out),
        None => Ok(()),
    }
}
