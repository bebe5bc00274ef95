// SPDX-License-Identifier: GPL-3.0-only

//! TCG (TPM 1.2), TCG2 and TrEE boot service protocols.

use core::fmt;
use uefi::guid::Guid;
use uefi::status::{Error, Status};

use crate::runtime::{Protocol, Runtime};
use crate::status::check;
use crate::tpm::Transport;
use crate::{four_cc, Result as ToolResult, ToolError};

pub const TCG_PROTOCOL_GUID: Guid = Guid(0xf541_796d, 0xa62e, 0x4954, [0xa7, 0x75, 0x95, 0x84, 0xf6, 0x1b, 0x9c, 0xdd]);
/// TrEE is the pre-release name of TCG2 and shares its GUID.
pub const TCG2_PROTOCOL_GUID: Guid = Guid(0x607f_766c, 0x7455, 0x42be, [0x93, 0x0b, 0xe4, 0xd7, 0x6d, 0xb2, 0x72, 0x0f]);

pub const HASH_ALG_SHA1: u32 = 0x0000_0001;
pub const HASH_ALG_SHA256: u32 = 0x0000_0002;
pub const HASH_ALG_SHA384: u32 = 0x0000_0004;
pub const HASH_ALG_SHA512: u32 = 0x0000_0008;
pub const HASH_ALG_SM3_256: u32 = 0x0000_0010;

pub const EVENT_LOG_FORMAT_TCG_1_2: u32 = 0x0000_0001;
pub const EVENT_LOG_FORMAT_TCG_2: u32 = 0x0000_0002;

#[repr(C)]
pub struct TcgProtocol {
    pub status_check: usize,
    pub hash_all: usize,
    pub log_event: usize,
    pub pass_through_to_tpm: extern "efiapi" fn(&TcgProtocol, u32, *const u8, u32, *mut u8) -> Status,
    pub hash_log_extend_event: usize,
}

impl Protocol for TcgProtocol {
    const GUID: Guid = TCG_PROTOCOL_GUID;
}

impl Transport for TcgProtocol {
    fn transmit(&self, command: &[u8], response: &mut [u8]) -> Result<(), Error> {
        check((self.pass_through_to_tpm)(
            self,
            command.len() as u32,
            command.as_ptr(),
            response.len() as u32,
            response.as_mut_ptr(),
        ))
        .map(|_| ())
    }
}

#[repr(C)]
pub struct Tcg2Protocol {
    pub get_capability: extern "efiapi" fn(&Tcg2Protocol, &mut Tcg2Capability) -> Status,
    pub get_event_log: extern "efiapi" fn(&Tcg2Protocol, u32, &mut u64, &mut u64, &mut u8) -> Status,
    pub hash_log_extend_event: usize,
    pub submit_command: extern "efiapi" fn(&Tcg2Protocol, u32, *const u8, u32, *mut u8) -> Status,
    pub get_active_pcr_banks: usize,
    pub set_active_pcr_banks: usize,
    pub get_result_of_set_active_pcr_banks: usize,
}

impl Protocol for Tcg2Protocol {
    const GUID: Guid = TCG2_PROTOCOL_GUID;
}

impl Transport for Tcg2Protocol {
    fn transmit(&self, command: &[u8], response: &mut [u8]) -> Result<(), Error> {
        check((self.submit_command)(
            self,
            command.len() as u32,
            command.as_ptr(),
            response.len() as u32,
            response.as_mut_ptr(),
        ))
        .map(|_| ())
    }
}

#[repr(C)]
pub struct TreeProtocol {
    pub get_capability: extern "efiapi" fn(&TreeProtocol, &mut TreeCapability) -> Status,
    pub get_event_log: extern "efiapi" fn(&TreeProtocol, u32, &mut u64, &mut u64, &mut u8) -> Status,
    pub hash_log_extend_event: usize,
    pub submit_command: usize,
}

impl Protocol for TreeProtocol {
    const GUID: Guid = TCG2_PROTOCOL_GUID;
}

/// The TPM 1.2 interface, or why it is missing.
pub fn locate_tcg(rt: &Runtime) -> ToolResult<&'static TcgProtocol> {
    rt.locate_protocol::<TcgProtocol>().map_err(|err| {
        if rt.has_protocol::<Tcg2Protocol>() {
            ToolError::new(Error::Unsupported, "Platform configured for TPM 2.0, not TPM 1.2")
        } else {
            err.context("Failed to locate EFI_TCG_PROTOCOL")
        }
    })
}

/// The TPM 2.0 interface, or why it is missing.
pub fn locate_tcg2(rt: &Runtime) -> ToolResult<&'static Tcg2Protocol> {
    rt.locate_protocol::<Tcg2Protocol>().map_err(|err| {
        if rt.has_protocol::<TcgProtocol>() {
            ToolError::new(Error::Unsupported, "Platform configured for TPM 1.2, not TPM 2.0")
        } else {
            err.context("Failed to locate EFI_TCG2_PROTOCOL")
        }
    })
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// EFI_TCG2_BOOT_SERVICE_CAPABILITY
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct Tcg2Capability {
    pub size: u8,
    pub structure_version: Version,
    pub protocol_version: Version,
    pub hash_algorithm_bitmap: u32,
    pub supported_event_logs: u32,
    pub tpm_present_flag: u8,
    pub max_command_size: u16,
    pub max_response_size: u16,
    pub manufacturer_id: u32,
    pub number_of_pcr_banks: u32,
    pub active_pcr_banks: u32,
}

/// TREE_BOOT_SERVICE_CAPABILITY
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeCapability {
    pub size: u8,
    pub structure_version: Version,
    pub protocol_version: Version,
    pub hash_algorithm_bitmap: u32,
    pub supported_event_logs: u32,
    pub tree_present_flag: u8,
    pub max_command_size: u16,
    pub max_response_size: u16,
    pub manufacturer_id: u32,
}

const HASH_NAMES: &[(u32, &str)] = &[
    (HASH_ALG_SHA1, "SHA1"),
    (HASH_ALG_SHA256, "SHA256"),
    (HASH_ALG_SHA384, "SHA384"),
    (HASH_ALG_SHA512, "SHA512"),
    (HASH_ALG_SM3_256, "SM3_256"),
];

const LOG_NAMES: &[(u32, &str)] = &[
    (EVENT_LOG_FORMAT_TCG_1_2, "TCG_1.2"),
    (EVENT_LOG_FORMAT_TCG_2, "TCG_2"),
];

fn print_bits(out: &mut dyn fmt::Write, bitmap: u32, names: &[(u32, &str)]) -> fmt::Result {
    for &(bit, name) in names {
        if bitmap & bit != 0 {
            write!(out, "{} ", name)?;
        }
    }
    writeln!(out)
}

fn yes(flag: u8) -> &'static str {
    if flag != 0 {
        "True"
    } else {
        "False"
    }
}

impl Tcg2Capability {
    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "            Structure Version: {}", self.structure_version)?;
        writeln!(out, "             Protocol Version: {}", self.protocol_version)?;
        write!(out, "    Supported Hash Algorithms: ")?;
        print_bits(out, self.hash_algorithm_bitmap, HASH_NAMES)?;
        write!(out, "  Supported Event Log Formats: ")?;
        print_bits(out, self.supported_event_logs, LOG_NAMES)?;
        writeln!(out, "             TPM Present Flag: {}", yes(self.tpm_present_flag))?;
        writeln!(out, "         Maximum Command Size: 0x{:02x} ({})", self.max_command_size, self.max_command_size)?;
        writeln!(out, "        Maximum Response Size: 0x{:02x} ({})", self.max_response_size, self.max_response_size)?;
        writeln!(out, "                TCG Vendor ID: {}", four_cc(self.manufacturer_id))?;
        writeln!(out, "          Number of PCR Banks: {}", self.number_of_pcr_banks)?;
        writeln!(out, "             Active PCR Banks: {}", self.active_pcr_banks)?;
        writeln!(out)
    }
}

impl TreeCapability {
    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "            Structure version: {}", self.structure_version)?;
        writeln!(out, "             Protocol version: {}", self.protocol_version)?;
        write!(out, "    Supported Hash Algorithms: ")?;
        print_bits(out, self.hash_algorithm_bitmap, &HASH_NAMES[..4])?;
        writeln!(out, "            TrEE Present Flag: {}", yes(self.tree_present_flag))?;
        write!(out, "  Supported Event Log Formats: ")?;
        print_bits(out, self.supported_event_logs, &LOG_NAMES[..1])?;
        writeln!(out, "         Maximum Command Size: {}", self.max_command_size)?;
        writeln!(out, "        Maximum Response Size: {}", self.max_response_size)?;
        writeln!(out, "              Manufacturer ID: {}", four_cc(self.manufacturer_id))
    }
}

/// Where the firmware keeps an event log.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EventLogInfo {
    pub location: u64,
    pub last_entry: u64,
    pub truncated: bool,
}

pub trait Tcg2 {
    fn capability(&self) -> Result<Tcg2Capability, Error>;
}

impl Tcg2 for Tcg2Protocol {
    fn capability(&self) -> Result<Tcg2Capability, Error> {
        let mut capability = Tcg2Capability {
            size: core::mem::size_of::<Tcg2Capability>() as u8,
            ..Default::default()
        };
        check((self.get_capability)(self, &mut capability))?;
        Ok(capability)
    }
}

pub trait Tree {
    fn capability(&self) -> Result<TreeCapability, Error>;
    fn event_log(&self, format: u32) -> Result<EventLogInfo, Error>;
}

impl Tree for TreeProtocol {
    fn capability(&self) -> Result<TreeCapability, Error> {
        let mut capability = TreeCapability {
            size: core::mem::size_of::<TreeCapability>() as u8,
            ..Default::default()
        };
        check((self.get_capability)(self, &mut capability))?;
        Ok(capability)
    }

    fn event_log(&self, format: u32) -> Result<EventLogInfo, Error> {
        let mut info = EventLogInfo::default();
        let mut truncated = 0;
        check((self.get_event_log)(self, format, &mut info.location, &mut info.last_entry, &mut truncated))?;
        info.truncated = truncated != 0;
        Ok(info)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::string::String;
    use core::mem;

    pub(crate) fn tree_capability() -> TreeCapability {
        TreeCapability {
            size: mem::size_of::<TreeCapability>() as u8,
            structure_version: Version { major: 1, minor: 0 },
            protocol_version: Version { major: 1, minor: 0 },
            hash_algorithm_bitmap: HASH_ALG_SHA1 | HASH_ALG_SHA256,
            supported_event_logs: EVENT_LOG_FORMAT_TCG_1_2,
            tree_present_flag: 1,
            max_command_size: 0x1000,
            max_response_size: 0x1000,
            // "INTC"
            manufacturer_id: 0x494e_5443,
        }
    }

    /// A TrEE interface answering from fixed data.
    pub(crate) struct FakeTree {
        pub(crate) capability: TreeCapability,
        pub(crate) log: core::result::Result<EventLogInfo, Error>,
    }

    impl Tree for FakeTree {
        fn capability(&self) -> Result<TreeCapability, Error> {
            Ok(self.capability)
        }

        fn event_log(&self, format: u32) -> Result<EventLogInfo, Error> {
            assert_eq!(format, EVENT_LOG_FORMAT_TCG_1_2);
            match &self.log {
                Ok(info) => Ok(*info),
                Err(_) => Err(Error::Unsupported),
            }
        }
    }

    #[test]
    fn layouts() {
        assert_eq!(mem::size_of::<Tcg2Capability>(), 36);
        assert_eq!(mem::size_of::<TreeCapability>(), 28);
    }

    #[test]
    fn tcg2_report() {
        let capability = Tcg2Capability {
            size: 36,
            structure_version: Version { major: 1, minor: 1 },
            protocol_version: Version { major: 1, minor: 1 },
            hash_algorithm_bitmap: HASH_ALG_SHA1 | HASH_ALG_SHA256 | HASH_ALG_SM3_256,
            supported_event_logs: EVENT_LOG_FORMAT_TCG_1_2 | EVENT_LOG_FORMAT_TCG_2,
            tpm_present_flag: 1,
            max_command_size: 0x0f80,
            max_response_size: 0x0f80,
            manufacturer_id: 0x4946_5800,
            number_of_pcr_banks: 2,
            active_pcr_banks: 3,
        };
        let mut out = String::new();
        capability.print(&mut out).unwrap();
        assert!(out.contains("\n    Supported Hash Algorithms: SHA1 SHA256 SM3_256 \n"));
        assert!(out.contains("  Supported Event Log Formats: TCG_1.2 TCG_2 \n"));
        assert!(out.contains("             TPM Present Flag: True\n"));
        assert!(out.contains("         Maximum Command Size: 0xf80 (3968)\n"));
        assert!(out.contains("                TCG Vendor ID: IFX\n"));
        assert!(out.ends_with("             Active PCR Banks: 3\n\n"));
    }

    #[test]
    fn tree_report() {
        let mut capability = tree_capability();
        capability.hash_algorithm_bitmap |= HASH_ALG_SM3_256;
        capability.supported_event_logs |= EVENT_LOG_FORMAT_TCG_2;
        let mut out = String::new();
        capability.print(&mut out).unwrap();
        assert!(out.contains("    Supported Hash Algorithms: SHA1 SHA256 \n"));
        assert!(out.contains("  Supported Event Log Formats: TCG_1.2 \n"));
        assert!(out.ends_with("              Manufacturer ID: INTC\n"));
    }
}
