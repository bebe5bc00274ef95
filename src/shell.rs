// SPDX-License-Identifier: GPL-3.0-only

//! Command line handling shared by the tools.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::Result;

/// Split UEFI load options into words. Double quotes group words.
pub fn split_command_line(options: &[u16]) -> Vec<String> {
    let line: String = char::decode_utf16(options.iter().copied().take_while(|&c| c != 0))
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();

    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    args.push(core::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        args.push(current);
    }
    args
}

/// Whether `arg` is the short or long spelling of an option.
pub fn is(arg: &str, short: &str, long: &str) -> bool {
    arg == short || arg == long
}

/// Outcome of parsing a tool's arguments.
#[derive(Debug, Eq, PartialEq)]
pub enum Command<T> {
    Run(T),
    Version,
    Help,
    /// Unknown option or too many arguments
    Invalid,
}

impl<T> Command<T> {
    /// The version and help options every tool accepts.
    pub fn common(arg: &str) -> Option<Self> {
        if is(arg, "-V", "--version") {
            Some(Command::Version)
        } else if is(arg, "-h", "--help") {
            Some(Command::Help)
        } else {
            None
        }
    }

    /// Print version or usage text, or hand back the options to run with.
    pub fn options(self, out: &mut dyn Write, usage: &str) -> Result<Option<T>> {
        match self {
            Command::Run(options) => return Ok(Some(options)),
            Command::Version => writeln!(out, "Version: {}", env!("CARGO_PKG_VERSION"))?,
            Command::Help => write!(out, "{}", usage)?,
            Command::Invalid => {
                writeln!(out, "ERROR: Unknown option.")?;
                write!(out, "{}", usage)?;
            }
        }
        Ok(None)
    }
}

/// Parse tools taking at most one flag from `flags`, mapping each to its options.
pub fn single_flag<T: Clone>(args: &[String], default: T, flags: &[(&str, &str, T)]) -> Command<T> {
    match args {
        [] | [_] => Command::Run(default),
        [_, arg] => Command::common(arg).unwrap_or_else(|| {
            flags
                .iter()
                .find(|(short, long, _)| is(arg, short, long))
                .map_or(Command::Invalid, |(_, _, value)| Command::Run(value.clone()))
        }),
        _ => Command::Invalid,
    }
}
