// SPDX-License-Identifier: GPL-3.0-only

//! TPM 2.0 ACPI table and its command response buffer control area.

use core::{fmt, mem};
use plain::Plain;

use super::SdtHeader;
use crate::{ascii, hex_bytes, read_struct, Result};

pub const SIGNATURE: &[u8; 4] = b"TPM2";

#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct Tpm2Table {
    pub header: SdtHeader,
    pub platform_class: u16,
    pub reserved: u16,
    pub control_area_address: u64,
    pub start_method: u32,
}

// EFI_TPM2_ACPI_CONTROL_AREA
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct ControlArea {
    pub reserved: u32,
    pub error: u32,
    pub cancel: u32,
    pub start: u32,
    pub interrupt_control: u64,
    pub command_size: u32,
    pub command: u64,
    pub response_size: u32,
    pub response: u64,
}

unsafe impl Plain for Tpm2Table {}
unsafe impl Plain for ControlArea {}

pub const TPM2_TABLE_SIZE: usize = mem::size_of::<Tpm2Table>();
pub const CONTROL_AREA_SIZE: usize = mem::size_of::<ControlArea>();

pub fn start_method_name(method: u32) -> &'static str {
    match method {
        0 => "Not allowed",
        1 | 3 | 4 | 5 => "Vendor specific legacy use",
        2 => "ACPI start method",
        6 => "Memory mapped I/O",
        7 => "Command response buffer interface",
        8 => "Command response buffer interface, ACPI start method",
        11 => "Command response buffer interface, ARM SMC",
        _ => "Reserved for future use",
    }
}

impl Tpm2Table {
    pub fn parse(table: &[u8]) -> Result<Self> {
        read_struct(table)
    }

    pub fn print_header(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let header = self.header;
        let length = header.length;
        let oem_revision = header.oem_revision;
        let creator_revision = header.creator_revision;
        let platform_class = self.platform_class;
        let control_area = self.control_area_address;

        writeln!(out, "                       Signature : {}", ascii(&header.signature))?;
        writeln!(out, "                          Length : 0x{:03x} ({})", length, length)?;
        writeln!(out, "                        Revision : {}", header.revision)?;
        writeln!(out, "                        Checksum : {}", header.checksum)?;
        writeln!(out, "                          Oem ID : {}", ascii(&header.oem_id))?;
        writeln!(out, "                    Oem Table ID : {}", ascii(&header.oem_table_id))?;
        writeln!(out, "                    Oem Revision : {}", oem_revision)?;
        writeln!(out, "                      Creator ID : {}", ascii(&header.creator_id))?;
        writeln!(out, "                Creator Revision : {}", creator_revision)?;
        writeln!(out, "                  Platform Class : {}", platform_class)?;
        writeln!(out, "       Control Area (CA) Address : 0x{:08x}", control_area)
    }

    /// Start method and the trailing platform specific parameters of `table`.
    pub fn print_start_method(&self, out: &mut dyn fmt::Write, table: &[u8]) -> fmt::Result {
        let start_method = self.start_method;
        let parameters = table.get(TPM2_TABLE_SIZE..).unwrap_or(&[]);

        writeln!(out, "                    Start Method : {} ({})", start_method, start_method_name(start_method))?;
        writeln!(out, "  Platform Specific Methods Size : {}", parameters.len())?;
        if !parameters.is_empty() {
            write!(out, "    Platform Specific Parameters : ")?;
            hex_bytes(out, parameters, " ")?;
            writeln!(out)?;
        }
        Ok(())
    }
}

impl ControlArea {
    pub fn parse(data: &[u8]) -> Result<Self> {
        read_struct(data)
    }

    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let error = self.error;
        let command_size = self.command_size;
        let command = self.command;
        let response_size = self.response_size;
        let response = self.response;

        writeln!(out, "                  CA Error Value : 0x{:04x} ({})", error, error)?;
        writeln!(out, "          CA Command Buffer Size : 0x{:04x} ({})", command_size, command_size)?;
        writeln!(out, "       CA Command Buffer Address : 0x{:08x}", command)?;
        writeln!(out, "         CA Response Buffer Size : 0x{:04x} ({})", response_size, response_size)?;
        writeln!(out, "      CA Response Buffer Address : 0x{:08x}", response)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::acpi::tests::table;
    use alloc::string::String;
    use alloc::vec::Vec;

    pub(crate) fn tpm2(control_area: u64, start_method: u32, parameters: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        // Platform class, reserved
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&control_area.to_le_bytes());
        body.extend_from_slice(&start_method.to_le_bytes());
        body.extend_from_slice(parameters);
        table(SIGNATURE, 4, &body)
    }

    pub(crate) fn control_area() -> Vec<u8> {
        let mut data = Vec::new();
        // Reserved, error, cancel, start
        data.extend_from_slice(&[0; 16]);
        // Interrupt control
        data.extend_from_slice(&[0; 8]);
        data.extend_from_slice(&0xf80u32.to_le_bytes());
        data.extend_from_slice(&0xfed4_0080u64.to_le_bytes());
        data.extend_from_slice(&0xf80u32.to_le_bytes());
        data.extend_from_slice(&0xfed4_0080u64.to_le_bytes());
        data
    }

    #[test]
    fn layout() {
        assert_eq!(TPM2_TABLE_SIZE, 52);
        assert_eq!(CONTROL_AREA_SIZE, 48);
    }

    #[test]
    fn start_methods() {
        assert_eq!(start_method_name(0), "Not allowed");
        assert_eq!(start_method_name(4), "Vendor specific legacy use");
        assert_eq!(start_method_name(7), "Command response buffer interface");
        assert_eq!(start_method_name(9), "Reserved for future use");
    }

    #[test]
    fn print_table() {
        let data = tpm2(0xfed4_0040, 7, &[]);
        let table = Tpm2Table::parse(&data).unwrap();
        let mut out = String::new();
        table.print_header(&mut out).unwrap();
        table.print_start_method(&mut out, &data).unwrap();

        assert!(out.contains("                       Signature : TPM2\n"));
        assert!(out.contains("                          Length : 0x034 (52)\n"));
        assert!(out.contains("       Control Area (CA) Address : 0xfed40040\n"));
        assert!(out.contains("                    Start Method : 7 (Command response buffer interface)\n"));
        assert!(out.ends_with("  Platform Specific Methods Size : 0\n"));
    }

    #[test]
    fn print_platform_parameters() {
        let data = tpm2(0, 2, &[0xde, 0xad, 0xbe, 0xef]);
        let table = Tpm2Table::parse(&data).unwrap();
        let mut out = String::new();
        table.print_start_method(&mut out, &data).unwrap();
        assert!(out.contains("  Platform Specific Methods Size : 4\n"));
        assert!(out.contains("    Platform Specific Parameters : de ad be ef \n"));
    }

    #[test]
    fn print_control_area() {
        let area = ControlArea::parse(&control_area()).unwrap();
        let mut out = String::new();
        area.print(&mut out).unwrap();
        assert!(out.starts_with("                  CA Error Value : 0x0000 (0)\n"));
        assert!(out.contains("          CA Command Buffer Size : 0x0f80 (3968)\n"));
        assert!(out.contains("      CA Response Buffer Address : 0xfed40080\n"));
    }
}
