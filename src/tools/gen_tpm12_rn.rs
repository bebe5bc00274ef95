// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::hex_bytes;
use crate::runtime::Runtime;
use crate::shell::{is, Command};
use crate::tcg::locate_tcg;
use crate::tpm::{get_random, Transport};
use crate::Result;

pub const USAGE: &str = "Usage: GenTPM12RN [-v | --verbose] [NumberOfBytes]\n       GenTPM12RN [-V | --version]\n";

pub const DEFAULT_RANDOM_BYTES: u64 = 1;
pub const MAX_RANDOM_BYTES: u64 = 24;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Options {
    pub verbose: bool,
    /// Requested byte count, zero for zero or negative input
    pub count: u64,
}

/// An optionally negative decimal. Negative values read as zero, values
/// too large for a `u64` saturate.
fn number(arg: &str) -> Option<u64> {
    let (negative, digits) = match arg.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, arg),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

pub fn parse(args: &[String]) -> Command<Options> {
    let verbose = |arg: &str| is(arg, "-v", "--verbose");
    let options = |verbose, count| Command::Run(Options { verbose, count });

    match args {
        [] | [_] => options(false, DEFAULT_RANDOM_BYTES),
        [_, arg] => Command::common(arg).unwrap_or_else(|| {
            if verbose(arg) {
                options(true, DEFAULT_RANDOM_BYTES)
            } else {
                number(arg).map_or(Command::Invalid, |count| options(false, count))
            }
        }),
        [_, flag, arg] if verbose(flag) => number(arg).map_or(Command::Invalid, |count| options(true, count)),
        _ => Command::Invalid,
    }
}

/// Check the requested count, printing why it was rejected or clamped.
fn limit(count: u64, out: &mut dyn Write) -> Result<Option<u64>> {
    if count < 1 {
        writeln!(out, "ERROR: Zero or negative number entered")?;
        write!(out, "{}", USAGE)?;
        return Ok(None);
    } else if count > MAX_RANDOM_BYTES {
        writeln!(out, "Sorry - Output limited to a maximum of {} bytes", MAX_RANDOM_BYTES)?;
        return Ok(Some(MAX_RANDOM_BYTES));
    }
    Ok(Some(count))
}

fn generate(tpm: &dyn Transport, verbose: bool, count: u64, out: &mut dyn Write) -> Result<()> {
    let bytes = get_random(tpm, count as u32)?;
    if verbose {
        writeln!(out)?;
        writeln!(out, "  Number of Random Bytes Requested: {}", count)?;
        writeln!(out, "   Number of Random Bytes Received: {}", bytes.len())?;
        write!(out, "             Random Bytes Received: ")?;
        hex_bytes(out, &bytes, " ")?;
        writeln!(out)?;
    } else {
        hex_bytes(out, &bytes, "")?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn run(tpm: &dyn Transport, options: Options, out: &mut dyn Write) -> Result<()> {
    match limit(options.count, out)? {
        Some(count) => generate(tpm, options.verbose, count, out),
        None => Ok(()),
    }
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    let options = match parse(args).options(out, USAGE)? {
        Some(options) => options,
        None => return Ok(()),
    };
    // The count is checked before the TPM is located
    match limit(options.count, out)? {
        Some(count) => generate(locate_tcg(rt)?, options.verbose, count, out),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::tests::args;
    use crate::tpm::tests::rsp12;
    use crate::tpm::ScriptedTpm;
    use alloc::vec::Vec;

    fn random(bytes: &[u8]) -> Vec<u8> {
        let mut params = (bytes.len() as u32).to_be_bytes().to_vec();
        params.extend_from_slice(bytes);
        rsp12(0, &params)
    }

    #[test]
    fn options() {
        let run = |verbose, count| Command::Run(Options { verbose, count });
        assert_eq!(parse(&args("GenTPM12RN")), run(false, 1));
        assert_eq!(parse(&args("GenTPM12RN 8")), run(false, 8));
        assert_eq!(parse(&args("GenTPM12RN -v")), run(true, 1));
        assert_eq!(parse(&args("GenTPM12RN --verbose 16")), run(true, 16));
        assert_eq!(parse(&args("GenTPM12RN -3")), run(false, 0));
        assert_eq!(parse(&args("GenTPM12RN 99999999999999999999999")), run(false, u64::MAX));
        assert_eq!(parse(&args("GenTPM12RN 8 -v")), Command::Invalid);
        assert_eq!(parse(&args("GenTPM12RN -v x")), Command::Invalid);
        assert_eq!(parse(&args("GenTPM12RN 1e3")), Command::Invalid);
        assert_eq!(parse(&args("GenTPM12RN -V")), Command::Version);
    }

    #[test]
    fn quiet_output() {
        let tpm = ScriptedTpm::new(vec![random(&[0xde, 0xad, 0xbe, 0xef])]);
        let mut out = String::new();
        run(&tpm, Options { verbose: false, count: 4 }, &mut out).unwrap();
        assert_eq!(out, "deadbeef\n");
        // bytesRequested
        assert_eq!(&tpm.commands.borrow()[0][10..], &[0, 0, 0, 4]);
    }

    #[test]
    fn verbose_output() {
        let tpm = ScriptedTpm::new(vec![random(&[0x01, 0x02])]);
        let mut out = String::new();
        run(&tpm, Options { verbose: true, count: 2 }, &mut out).unwrap();
        assert_eq!(
            out,
            "\n  Number of Random Bytes Requested: 2\n   Number of Random Bytes Received: 2\n             Random Bytes Received: 01 02 \n\n"
        );
    }

    #[test]
    fn limits() {
        let mut out = String::new();
        run(&ScriptedTpm::default(), Options { verbose: false, count: 0 }, &mut out).unwrap();
        assert!(out.starts_with("ERROR: Zero or negative number entered\nUsage: GenTPM12RN"));

        let tpm = ScriptedTpm::new(vec![random(&[0xaa; 24])]);
        let mut out = String::new();
        run(&tpm, Options { verbose: false, count: 100 }, &mut out).unwrap();
        assert!(out.starts_with("Sorry - Output limited to a maximum of 24 bytes\naaaa"));
        assert_eq!(&tpm.commands.borrow()[0][10..], &[0, 0, 0, 24]);
    }
}
