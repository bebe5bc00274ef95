// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::hex_bytes;
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::tcg::locate_tcg;
use crate::tpm::{pcr_read, Transport, TPM_NUM_PCR};
use crate::Result;

pub const USAGE: &str = "Usage: ShowPCR12 [-V | --version]\n";

pub fn parse(args: &[String]) -> Command<()> {
    single_flag(args, (), &[])
}

pub fn run(tpm: &dyn Transport, out: &mut dyn Write) -> Result<()> {
    for index in 0..TPM_NUM_PCR {
        let digest = pcr_read(tpm, index)?;
        write!(out, "[{:02}]  ", index)?;
        hex_bytes(out, &digest, " ")?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    if parse(args).options(out, USAGE)?.is_none() {
        return Ok(());
    }
    run(locate_tcg(rt)?, out)
}
