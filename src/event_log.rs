// SPDX-License-Identifier: GPL-3.0-only

//! TCG 1.2 format event log (TCG_PCR_EVENT records).

use alloc::vec::Vec;
use core::{fmt, mem};
use plain::Plain;
use uefi::status::Error;

use crate::mapper::Mapper;
use crate::tcg::EventLogInfo;
use crate::tpm::SHA1_DIGEST_SIZE;
use crate::{hex_bytes, read_struct, Result, ToolError};

pub const EV_PREBOOT_CERT: u32 = 0x0000_0000;
pub const EV_POST_CODE: u32 = 0x0000_0001;
pub const EV_NO_ACTION: u32 = 0x0000_0003;
pub const EV_SEPARATOR: u32 = 0x0000_0004;
pub const EV_ACTION: u32 = 0x0000_0005;
pub const EV_EVENT_TAG: u32 = 0x0000_0006;
pub const EV_S_CRTM_CONTENTS: u32 = 0x0000_0007;
pub const EV_S_CRTM_VERSION: u32 = 0x0000_0008;
pub const EV_CPU_MICROCODE: u32 = 0x0000_0009;
pub const EV_PLATFORM_CONFIG_FLAGS: u32 = 0x0000_000A;
pub const EV_TABLE_OF_DEVICES: u32 = 0x0000_000B;
pub const EV_COMPACT_HASH: u32 = 0x0000_000C;
pub const EV_IPL: u32 = 0x0000_000D;
pub const EV_IPL_PARTITION_DATA: u32 = 0x0000_000E;
pub const EV_NONHOST_CODE: u32 = 0x0000_000F;
pub const EV_NONHOST_CONFIG: u32 = 0x0000_0010;
pub const EV_NONHOST_INFO: u32 = 0x0000_0011;
pub const EV_OMIT_BOOT_DEVICE_EVENTS: u32 = 0x0000_0012;

pub const EV_EFI_EVENT_BASE: u32 = 0x8000_0000;
pub const EV_EFI_VARIABLE_DRIVER_CONFIG: u32 = EV_EFI_EVENT_BASE + 0x1;
pub const EV_EFI_VARIABLE_BOOT: u32 = EV_EFI_EVENT_BASE + 0x2;
pub const EV_EFI_BOOT_SERVICES_APPLICATION: u32 = EV_EFI_EVENT_BASE + 0x3;
pub const EV_EFI_BOOT_SERVICES_DRIVER: u32 = EV_EFI_EVENT_BASE + 0x4;
pub const EV_EFI_RUNTIME_SERVICES_DRIVER: u32 = EV_EFI_EVENT_BASE + 0x5;
pub const EV_EFI_GPT_EVENT: u32 = EV_EFI_EVENT_BASE + 0x6;
pub const EV_EFI_ACTION: u32 = EV_EFI_EVENT_BASE + 0x7;
pub const EV_EFI_PLATFORM_FIRMWARE_BLOB: u32 = EV_EFI_EVENT_BASE + 0x8;
pub const EV_EFI_HANDOFF_TABLES: u32 = EV_EFI_EVENT_BASE + 0x9;
pub const EV_EFI_VARIABLE_AUTHORITY: u32 = EV_EFI_EVENT_BASE + 0xE0;

pub fn event_type_name(event_type: u32) -> &'static str {
    match event_type {
        EV_PREBOOT_CERT => "Preboot Cert",
        EV_POST_CODE => "Post Code",
        EV_NO_ACTION => "No Action",
        EV_SEPARATOR => "Separator",
        EV_ACTION => "Action",
        EV_EVENT_TAG => "Event Tag",
        EV_S_CRTM_CONTENTS => "CRTM Contents",
        EV_S_CRTM_VERSION => "CRTM Version",
        EV_CPU_MICROCODE => "CPU Microcode",
        EV_PLATFORM_CONFIG_FLAGS => "Platform Config Flags",
        EV_TABLE_OF_DEVICES => "Table of Devices",
        EV_COMPACT_HASH => "Compact Hash",
        EV_IPL => "IPL",
        EV_IPL_PARTITION_DATA => "IPL Partition Data",
        EV_NONHOST_CODE => "Non-host Code",
        EV_NONHOST_CONFIG => "Non-host Config",
        EV_NONHOST_INFO => "Non-host Info",
        EV_OMIT_BOOT_DEVICE_EVENTS => "Omit Boot Device Events",
        EV_EFI_VARIABLE_DRIVER_CONFIG => "Variable Driver Config",
        EV_EFI_VARIABLE_BOOT => "Variable Boot",
        EV_EFI_BOOT_SERVICES_APPLICATION => "Boot Services Application",
        EV_EFI_BOOT_SERVICES_DRIVER => "Boot Services Driver",
        EV_EFI_RUNTIME_SERVICES_DRIVER => "Runtime Services Driver",
        EV_EFI_GPT_EVENT => "GPT Event",
        EV_EFI_ACTION => "Action",
        EV_EFI_PLATFORM_FIRMWARE_BLOB => "Platform Firmware Blob",
        EV_EFI_HANDOFF_TABLES => "Handoff Tables",
        EV_EFI_VARIABLE_AUTHORITY => "Variable Authority",
        _ => "Unknown Type",
    }
}

/// TCG_PCR_EVENT without the trailing event data
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct PcrEventHeader {
    pub pcr_index: u32,
    pub event_type: u32,
    pub digest: [u8; SHA1_DIGEST_SIZE],
    pub event_size: u32,
}

unsafe impl Plain for PcrEventHeader {}

pub const PCR_EVENT_HEADER_SIZE: usize = mem::size_of::<PcrEventHeader>();

/// Event data bytes per dump row
const DETAIL_ROW: usize = 48;

pub struct PcrEvent<'a> {
    pub header: PcrEventHeader,
    pub data: &'a [u8],
}

impl<'a> PcrEvent<'a> {
    pub fn read(mapper: &'a dyn Mapper, address: u64) -> Result<Self> {
        let header: PcrEventHeader = read_struct(mapper.map(address, PCR_EVENT_HEADER_SIZE)?)?;
        let size = header.event_size as usize;
        let data = mapper.map(address + PCR_EVENT_HEADER_SIZE as u64, size)?;
        Ok(Self { header, data })
    }

    /// Bytes this record occupies in the log.
    pub fn len(&self) -> u64 {
        (PCR_EVENT_HEADER_SIZE + self.data.len()) as u64
    }

    /// Labels are right aligned to `width` columns, the first line is
    /// labelled `index_label`.
    pub fn print(&self, out: &mut dyn fmt::Write, width: usize, index_label: &str, verbose: bool) -> fmt::Result {
        let pcr_index = self.header.pcr_index;
        let event_type = self.header.event_type;

        writeln!(out, "{:>w$}: {}", index_label, pcr_index, w = width)?;
        write!(out, "{:>w$}: ", "Event Type", w = width)?;
        if verbose {
            write!(out, "{:08x} ", event_type)?;
        }
        writeln!(out, "{}", event_type_name(event_type))?;
        write!(out, "{:>w$}: ", "SHA1 Digest", w = width)?;
        hex_bytes(out, &self.header.digest, "")?;
        writeln!(out)?;
        writeln!(out, "{:>w$}: {}", "Event Size", self.data.len(), w = width)?;
        if verbose {
            self.print_detail(out, width)?;
        }
        writeln!(out)
    }

    fn print_detail(&self, out: &mut dyn fmt::Write, width: usize) -> fmt::Result {
        write!(out, "{:>w$}: ", "Event Detail", w = width)?;
        for (row, chunk) in self.data.chunks(DETAIL_ROW).enumerate() {
            if row > 0 {
                write!(out, "\n{:w$}", "", w = width + 2)?;
            }
            write!(out, "{:08x}: ", row * DETAIL_ROW)?;
            for (i, byte) in chunk.iter().enumerate() {
                write!(out, "{:02x}", byte)?;
                if i == 15 || i == 31 {
                    write!(out, " ")?;
                }
            }
        }
        if self.data.is_empty() {
            write!(out, "{:08x}: ", 0)?;
        }
        writeln!(out)
    }
}

/// Every event from the first record up to and including the last one.
pub fn events<'a>(mapper: &'a dyn Mapper, info: &EventLogInfo) -> Result<Vec<PcrEvent<'a>>> {
    if info.location == 0 || info.last_entry == 0 {
        return Err(ToolError::new(Error::NotFound, "Event log is empty"));
    }
    if info.last_entry < info.location {
        return Err(ToolError::new(Error::VolumeCorrupted, "Event log last entry precedes its start"));
    }
    log::debug!("event log {:#x}..={:#x}", info.location, info.last_entry);

    let mut found = Vec::new();
    let mut address = info.location;
    loop {
        let event = PcrEvent::read(mapper, address)?;
        let next = address + event.len();
        found.push(event);
        if address >= info.last_entry {
            break;
        }
        if next > info.last_entry {
            return Err(ToolError::new(
                Error::VolumeCorrupted,
                format!("Event log record at {:#x} overruns the last entry", address),
            ));
        }
        address = next;
    }

    if info.truncated {
        log::warn!("event log truncated");
    }
    Ok(found)
}
