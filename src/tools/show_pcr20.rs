// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::runtime::Runtime;
use crate::shell::Command;
use crate::tcg::locate_tcg2;
use crate::tpm::Transport;
use crate::tpm2::{algorithm_usage, parse_algorithm, print_bank, read_bank, TPM_ALG_SHA1};
use crate::Result;

pub fn usage() -> String {
    let mut usage = String::from("Usage: ShowPCR20 [-V | --version]\n       ShowPCR20 [algorithm]\n");
    usage.push_str(&algorithm_usage());
    usage.push('\n');
    usage
}

pub fn parse(args: &[String]) -> Command<u16> {
    match args {
        [] | [_] => Command::Run(TPM_ALG_SHA1),
        [_, arg] => Command::common(arg)
            .or_else(|| parse_algorithm(arg).map(Command::Run))
            .unwrap_or(Command::Invalid),
        _ => Command::Invalid,
    }
}

pub fn run(tpm: &dyn Transport, hash: u16, out: &mut dyn Write) -> Result<()> {
    let digests = read_bank(tpm, hash)?;
    print_bank(out, hash, &digests)
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    match parse(args).options(out, &usage())? {
        Some(hash) => run(locate_tcg2(rt)?, hash, out),
        None => Ok(()),
    }
}
