// SPDX-License-Identifier: GPL-3.0-only

//! ACPI root pointer and description table walk.

use alloc::vec::Vec;
use core::{fmt, mem};
use plain::Plain;
use uefi::guid::Guid;
use uefi::status::Error;

use crate::mapper::Mapper;
use crate::{ascii, read_struct, Result, ToolError};

pub mod bgrt;
pub mod slic;
pub mod tpm2;

pub const ACPI_20_TABLE_GUID: Guid = Guid(0x8868_e871, 0xe4f1, 0x11d3, [0xbc, 0x22, 0x00, 0x80, 0xc7, 0x3c, 0x88, 0x81]);
pub const ACPI_TABLE_GUID: Guid = Guid(0xeb9d_2d30, 0x2d88, 0x11d3, [0x9a, 0x16, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d]);

pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// ACPI 1.0 RSDP length, ending after `rsdt_address`.
pub const RSDP_V1_SIZE: usize = 20;

// EFI_ACPI_2_0_ROOT_SYSTEM_DESCRIPTION_POINTER
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct Rsdp {
    pub signature: [u8; 8],
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub revision: u8,
    pub rsdt_address: u32,
    pub length: u32,
    pub xsdt_address: u64,
    pub extended_checksum: u8,
    pub reserved: [u8; 3],
}

unsafe impl Plain for Rsdp {}

impl Rsdp {
    /// The 2.0 fields are only mapped when the revision carries them and
    /// read as zero otherwise.
    pub fn read(mapper: &dyn Mapper, address: u64) -> Result<Self> {
        let mut bytes = [0; mem::size_of::<Rsdp>()];
        bytes[..RSDP_V1_SIZE].copy_from_slice(mapper.map(address, RSDP_V1_SIZE)?);
        let rsdp: Rsdp = read_struct(&bytes)?;
        if rsdp.is_valid() && rsdp.revision >= 2 {
            return read_struct(mapper.map(address, mem::size_of::<Rsdp>())?);
        }
        Ok(rsdp)
    }

    pub fn is_valid(&self) -> bool {
        &self.signature == RSDP_SIGNATURE
    }

    /// Revision 2 and later carry the 64-bit XSDT address.
    pub fn has_xsdt(&self) -> bool {
        self.revision >= 2 && self.xsdt_address != 0
    }
}

// EFI_ACPI_DESCRIPTION_HEADER
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: [u8; 4],
    pub creator_revision: u32,
}

unsafe impl Plain for SdtHeader {}

pub const SDT_HEADER_SIZE: usize = mem::size_of::<SdtHeader>();

impl SdtHeader {
    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let length = self.length;
        let oem_revision = self.oem_revision;
        let creator_revision = self.creator_revision;

        writeln!(out, "ACPI Standard Header")?;
        writeln!(out, "  Signature         : \"{}\"", ascii(&self.signature))?;
        writeln!(out, "  Length            : 0x{:08x} ({})", length, length)?;
        writeln!(out, "  Revision          : 0x{:02x} ({})", self.revision, self.revision)?;
        writeln!(out, "  Checksum          : 0x{:02x} ({})", self.checksum, self.checksum)?;
        writeln!(out, "  OEM ID            : \"{}\"", ascii(&self.oem_id))?;
        writeln!(out, "  OEM Table ID      : \"{}\"", ascii(&self.oem_table_id))?;
        writeln!(out, "  OEM Revision      : 0x{:08x} ({})", oem_revision, oem_revision)?;
        writeln!(out, "  Creator ID        : \"{}\"", ascii(&self.creator_id))?;
        writeln!(out, "  Creator Revision  : 0x{:08x} ({})", creator_revision, creator_revision)?;
        writeln!(out)
    }
}

/// A table's bytes must sum to zero.
pub fn checksum_ok(table: &[u8]) -> bool {
    table.iter().fold(0u8, |sum, b| sum.wrapping_add(*b)) == 0
}

/// Root of the description tables, found through the EFI configuration table.
pub struct Acpi<'a> {
    mapper: &'a dyn Mapper,
    rsdp: Rsdp,
}

impl<'a> Acpi<'a> {
    /// Find the RSDP among `(vendor guid, address)` configuration entries.
    /// The ACPI 2.0 entry is preferred over the ACPI 1.0 one.
    pub fn new(mapper: &'a dyn Mapper, config_tables: &[(Guid, u64)]) -> Result<Self> {
        for guid in [ACPI_20_TABLE_GUID, ACPI_TABLE_GUID] {
            for &(vendor, address) in config_tables {
                if vendor != guid {
                    continue;
                }
                let rsdp = Rsdp::read(mapper, address)?;
                if rsdp.is_valid() {
                    log::debug!("RSDP at {:#x}, revision {}, OEM ID {}", address, rsdp.revision, ascii(&rsdp.oem_id));
                    return Ok(Self { mapper, rsdp });
                }
            }
        }
        Err(ToolError::new(Error::NotFound, "Could not find an ACPI RSDP table."))
    }

    pub fn rsdp(&self) -> &Rsdp {
        &self.rsdp
    }

    /// Addresses listed in the XSDT, or in the RSDT before ACPI 2.0.
    pub fn entries(&self) -> Result<Vec<u64>> {
        let (address, signature, entry_size) = if self.rsdp.has_xsdt() {
            (self.rsdp.xsdt_address, b"XSDT", mem::size_of::<u64>())
        } else {
            (u64::from(self.rsdp.rsdt_address), b"RSDT", mem::size_of::<u32>())
        };

        let root = self.table_at(address)?;
        if &root[..4] != signature {
            return Err(ToolError::new(Error::NotFound, format!("{} signature mismatch", ascii(signature))));
        }

        let count = (root.len() - SDT_HEADER_SIZE) / entry_size;
        log::debug!("{} OEM ID {}, {} entries", ascii(signature), ascii(&root[10..16]), count);

        Ok(root[SDT_HEADER_SIZE..]
            .chunks_exact(entry_size)
            .map(|entry| match entry_size {
                8 => u64::from_le_bytes([entry[0], entry[1], entry[2], entry[3], entry[4], entry[5], entry[6], entry[7]]),
                _ => u64::from(u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]])),
            })
            .collect())
    }

    /// Map a whole description table given its address.
    pub fn table_at(&self, address: u64) -> Result<&'a [u8]> {
        let header: SdtHeader = read_struct(self.mapper.map(address, SDT_HEADER_SIZE)?)?;
        let length = header.length as usize;
        if length < SDT_HEADER_SIZE {
            return Err(ToolError::new(Error::DeviceError, format!("{} table too short", ascii(&header.signature))));
        }
        self.mapper.map(address, length)
    }

    /// Every table with the given signature, in listing order.
    pub fn tables(&self, signature: &[u8; 4]) -> Result<Vec<&'a [u8]>> {
        let mut tables = Vec::new();
        for address in self.entries()? {
            if address == 0 {
                continue;
            }
            let header: SdtHeader = read_struct(self.mapper.map(address, SDT_HEADER_SIZE)?)?;
            if &header.signature != signature {
                continue;
            }
            let table = self.table_at(address)?;
            if !checksum_ok(table) {
                log::warn!("{} at {:#x} has a bad checksum", ascii(signature), address);
            }
            tables.push(table);
        }
        Ok(tables)
    }

    /// The first table with the given signature.
    pub fn find(&self, signature: &[u8; 4]) -> Result<&'a [u8]> {
        self.tables(signature)?
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::new(Error::NotFound, format!("{} table not found", ascii(signature))))
    }
}
