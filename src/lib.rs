// SPDX-License-Identifier: GPL-3.0-only

#![no_std]
#![allow(clippy::missing_safety_doc)]

#[macro_use]
extern crate alloc;

use alloc::string::String;
use core::fmt::{self, Write};
use plain::Plain;

pub mod acpi;
pub mod bmp;
pub mod error;
pub mod event_log;
pub mod fs;
pub mod graphics;
pub mod mapper;
pub mod osind;
pub mod pci;
pub mod runtime;
pub mod shell;
pub mod status;
pub mod tcg;
pub mod tools;
pub mod tpm;
pub mod tpm2;
pub mod variable;

pub use error::{Result, ToolError};

/// Copy a packed firmware structure out of a byte buffer.
pub fn read_struct<T: Plain + Copy>(data: &[u8]) -> Result<T> {
    Ok(*plain::from_bytes::<T>(data)?)
}

/// Convert a fixed size ASCII field, stopping at the first NUL.
pub fn ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect()
}

/// Print bytes as rows of sixteen `0xNN` values.
pub fn hex_table(out: &mut dyn Write, data: &[u8]) -> fmt::Result {
    write!(out, "  ")?;
    for (i, byte) in data.iter().enumerate() {
        if i > 0 && i % 16 == 0 {
            write!(out, "\n  ")?;
        }
        write!(out, "0x{:02x} ", byte)?;
    }
    writeln!(out)
}

/// Print bytes as lowercase hex with the given separator.
pub fn hex_bytes(out: &mut dyn Write, data: &[u8], separator: &str) -> fmt::Result {
    for byte in data {
        write!(out, "{:02x}{}", byte, separator)?;
    }
    Ok(())
}

/// Spell a big-endian four character code, such as a TPM manufacturer id.
pub fn four_cc(value: u32) -> String {
    ascii(&value.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn ascii_stops_at_nul() {
        assert_eq!(ascii(b"BGRT"), "BGRT");
        assert_eq!(ascii(b"ALASKA\0\0"), "ALASKA");
        assert_eq!(ascii(b"A\x01B"), "A.B");
    }

    #[test]
    fn hex_table_wraps_rows() {
        let data: alloc::vec::Vec<u8> = (0..18).collect();
        let mut out = String::new();
        hex_table(&mut out, &data).unwrap();
        assert_eq!(
            out,
            "  0x00 0x01 0x02 0x03 0x04 0x05 0x06 0x07 0x08 0x09 0x0a 0x0b 0x0c 0x0d 0x0e 0x0f \n  0x10 0x11 \n"
        );
    }

    #[test]
    fn manufacturer_four_cc() {
        assert_eq!(four_cc(0x4946_5800), "IFX");
        assert_eq!(four_cc(0x4e54_4300), "NTC");
    }
}
