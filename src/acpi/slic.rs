// SPDX-License-Identifier: GPL-3.0-only

//! Software Licensing Description Table.

use core::{cmp, fmt, mem};
use plain::Plain;

use super::SdtHeader;
use crate::{ascii, hex_table, read_struct, Result};

pub const SIGNATURE: &[u8; 4] = b"SLIC";

#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct OemPublicKey {
    pub kind: u32,
    pub length: u32,
    pub key_type: u8,
    pub version: u8,
    pub reserved: u16,
    pub algorithm: u32,
    pub magic: [u8; 4],
    pub bit_length: u32,
    pub exponent: u32,
    pub modulus: [u8; 128],
}

#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct WindowsMarker {
    pub kind: u32,
    pub length: u32,
    pub version: u32,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub product: [u8; 8],
    pub minor_version: u16,
    pub major_version: u16,
    pub signature: [u8; 144],
}

#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct Slic {
    pub header: SdtHeader,
    pub public_key: OemPublicKey,
    pub marker: WindowsMarker,
}

unsafe impl Plain for OemPublicKey {}
unsafe impl Plain for WindowsMarker {}
unsafe impl Plain for Slic {}

pub const SLIC_SIZE: usize = mem::size_of::<Slic>();

impl OemPublicKey {
    pub fn print(&self, out: &mut dyn fmt::Write, verbose: bool) -> fmt::Result {
        let kind = self.kind;
        let length = self.length;
        let reserved = self.reserved;
        let algorithm = self.algorithm;
        let bit_length = self.bit_length;
        let exponent = self.exponent;

        writeln!(out, "OEM Public Key")?;
        writeln!(out, "  Type              : 0x{:08x} ({})", kind, kind)?;
        writeln!(out, "  Length            : 0x{:08x} ({})", length, length)?;
        writeln!(out, "  KeyType           : 0x{:02x} ({})", self.key_type, self.key_type)?;
        writeln!(out, "  Version           : 0x{:02x} ({})", self.version, self.version)?;
        writeln!(out, "  Reserved          : 0x{:04x} ({})", reserved, reserved)?;
        writeln!(out, "  Algorithm         : 0x{:08x} ({})", algorithm, algorithm)?;
        writeln!(out, "  Magic             : \"{}\"", ascii(&self.magic))?;
        writeln!(out, "  Bit Length        : 0x{:08x} ({})", bit_length, bit_length)?;
        writeln!(out, "  Exponent          : 0x{:08x} ({})", exponent, exponent)?;
        if verbose {
            let len = cmp::min(bit_length as usize / 8, self.modulus.len());
            writeln!(out, "  Modulus:")?;
            hex_table(out, &self.modulus[..len])?;
        }
        writeln!(out)
    }
}

impl WindowsMarker {
    pub fn print(&self, out: &mut dyn fmt::Write, verbose: bool) -> fmt::Result {
        let kind = self.kind;
        let length = self.length;
        let version = self.version;
        let major = self.major_version;
        let minor = self.minor_version;

        writeln!(out, "Windows Marker")?;
        writeln!(out, "  Type              : 0x{:08x} ({})", kind, kind)?;
        writeln!(out, "  Length            : 0x{:08x} ({})", length, length)?;
        writeln!(out, "  Version           : 0x{:02x} ({})", version, version)?;
        writeln!(out, "  OEM ID            : \"{}\"", ascii(&self.oem_id))?;
        writeln!(out, "  OEM Table ID      : \"{}\"", ascii(&self.oem_table_id))?;
        writeln!(out, "  Windows Flag      : \"{}\"", ascii(&self.product))?;
        writeln!(out, "  SLIC Version      : 0x{:04x}{:04x} ({}.{})", major, minor, major, minor)?;
        if verbose {
            writeln!(out, "  Signature:")?;
            hex_table(out, &self.signature)?;
        }
        writeln!(out)
    }
}

impl Slic {
    pub fn parse(table: &[u8]) -> Result<Self> {
        read_struct(table)
    }

    pub fn print(&self, out: &mut dyn fmt::Write, verbose: bool) -> fmt::Result {
        writeln!(out)?;
        self.header.print(out)?;
        self.public_key.print(out, verbose)?;
        self.marker.print(out, verbose)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::acpi::tests::table;
    use alloc::string::String;
    use alloc::vec::Vec;

    pub(crate) fn slic() -> Vec<u8> {
        let mut body = Vec::new();
        // Public key: type, length
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&156u32.to_le_bytes());
        // Key type, version, reserved
        body.extend_from_slice(&[0x06, 0x02, 0x00, 0x00]);
        // Algorithm
        body.extend_from_slice(&0x2400u32.to_le_bytes());
        body.extend_from_slice(b"RSA1");
        // Bit length, exponent
        body.extend_from_slice(&1024u32.to_le_bytes());
        body.extend_from_slice(&65537u32.to_le_bytes());
        body.extend((0..128).map(|i| i as u8));
        // Marker: type, length, version
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(&182u32.to_le_bytes());
        body.extend_from_slice(&0x0002_0000u32.to_le_bytes());
        body.extend_from_slice(b"LENOVO");
        body.extend_from_slice(b"TP-7V   ");
        body.extend_from_slice(b"WINDOWS ");
        // Minor, major
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(&[0xaa; 144]);
        table(SIGNATURE, 1, &body)
    }

    #[test]
    fn layout() {
        assert_eq!(mem::size_of::<OemPublicKey>(), 156);
        assert_eq!(mem::size_of::<WindowsMarker>(), 182);
        assert_eq!(SLIC_SIZE, 374);
    }

    #[test]
    fn print_summary() {
        let data = slic();
        let table = Slic::parse(&data).unwrap();
        let mut out = String::new();
        table.print(&mut out, false).unwrap();

        assert!(out.starts_with("\nACPI Standard Header\n"));
        assert!(out.contains("OEM Public Key\n  Type              : 0x00000000 (0)\n"));
        assert!(out.contains("  Magic             : \"RSA1\"\n"));
        assert!(out.contains("  Exponent          : 0x00010001 (65537)\n"));
        assert!(out.contains("  Windows Flag      : \"WINDOWS \"\n"));
        assert!(out.contains("  SLIC Version      : 0x00020001 (2.1)\n"));
        assert!(!out.contains("Modulus"));
        assert!(!out.contains("Signature:"));
    }

    #[test]
    fn print_verbose_dumps_key_material() {
        let data = slic();
        let mut out = String::new();
        Slic::parse(&data).unwrap().print(&mut out, true).unwrap();

        assert!(out.contains("  Modulus:\n  0x00 0x01 0x02"));
        assert!(out.contains("0x7e 0x7f \n\nWindows Marker"));
        assert!(out.contains("  Signature:\n  0xaa 0xaa"));
    }
}
