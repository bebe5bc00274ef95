// SPDX-License-Identifier: GPL-3.0-only

//! PCI configuration space through the root bridge I/O protocol.

use alloc::vec::Vec;
use core::{fmt, slice};
use uefi::guid::Guid;
use uefi::status::{Error, Status};

use crate::runtime::Protocol;
use crate::status::check;

pub const PCI_ROOT_BRIDGE_IO_PROTOCOL_GUID: Guid = Guid(0x2f70_7ebb, 0x4a1a, 0x11d4, [0x9a, 0x38, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d]);
pub const PCI_ENUMERATION_COMPLETE_GUID: Guid = Guid(0x30cf_e3e7, 0x3de1, 0x4586, [0xbe, 0x20, 0xde, 0xab, 0xa1, 0xb3, 0xb7, 0x93]);

pub const PCI_MAX_BUS: u16 = 255;
pub const PCI_MAX_DEVICE: u16 = 31;
pub const PCI_MAX_FUNC: u16 = 7;

const HEADER_TYPE_MULTI_FUNCTION: u8 = 0x80;

const ACPI_ADDRESS_SPACE_DESCRIPTOR: u8 = 0x8A;
const ACPI_END_TAG_DESCRIPTOR: u8 = 0x79;
const ACPI_ADDRESS_SPACE_TYPE_BUS: u8 = 2;

// Width of each access, EfiPciWidthUint8
const WIDTH_UINT8: u32 = 0;

pub fn address(bus: u16, device: u16, function: u16, register: u16) -> u64 {
    (u64::from(bus) << 24) | (u64::from(device) << 16) | (u64::from(function) << 8) | u64::from(register)
}

/// Bus number ranges from ACPI QWORD address space descriptors.
pub fn bus_ranges(descriptors: &[u8]) -> Vec<(u16, u16)> {
    let mut ranges = Vec::new();
    let mut i = 0;
    while i + 3 <= descriptors.len() && descriptors[i] != ACPI_END_TAG_DESCRIPTOR {
        let len = u16::from_le_bytes([descriptors[i + 1], descriptors[i + 2]]) as usize;
        let desc = &descriptors[i..descriptors.len().min(i + 3 + len)];
        if desc[0] == ACPI_ADDRESS_SPACE_DESCRIPTOR && desc.len() >= 30 && desc[3] == ACPI_ADDRESS_SPACE_TYPE_BUS {
            let min = u64::from_le_bytes([desc[14], desc[15], desc[16], desc[17], desc[18], desc[19], desc[20], desc[21]]);
            let max = u64::from_le_bytes([desc[22], desc[23], desc[24], desc[25], desc[26], desc[27], desc[28], desc[29]]);
            ranges.push((min as u16, max as u16));
        }
        i += 3 + len;
    }
    ranges
}

/// The identity of one PCI function.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PciFunction {
    pub bus: u16,
    pub device: u16,
    pub function: u16,
    pub vendor_id: u16,
    pub device_id: u16,
    pub header_type: u8,
    pub subsystem_vendor_id: u16,
    pub subsystem_id: u16,
}

impl fmt::Display for PciFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "   {:02}      {:04x}      {:04x}       {:04x}       {:04x}",
            self.bus, self.vendor_id, self.device_id, self.subsystem_vendor_id, self.subsystem_id
        )
    }
}

/// A PCI root bridge.
pub trait PciRootBridge {
    fn read_config(&self, address: u64, data: &mut [u8]) -> Result<(), Error>;

    /// Bus ranges decoded by this bridge. Unsupported means no resource
    /// information, so every bus may be scanned.
    fn bus_ranges(&self) -> Result<Vec<(u16, u16)>, Error>;

    fn read_u16(&self, address: u64) -> Result<u16, Error> {
        let mut data = [0; 2];
        self.read_config(address, &mut data)?;
        Ok(u16::from_le_bytes(data))
    }
}

/// Functions present on `bus`, in device and function order.
pub fn scan_bus(bridge: &dyn PciRootBridge, bus: u16) -> Result<Vec<PciFunction>, Error> {
    let mut found = Vec::new();
    for device in 0..=PCI_MAX_DEVICE {
        for function in 0..=PCI_MAX_FUNC {
            let addr = address(bus, device, function, 0);
            let vendor_id = bridge.read_u16(addr)?;
            if vendor_id == 0xffff {
                if function == 0 {
                    break;
                }
                continue;
            }

            let mut header = [0; 0x30];
            bridge.read_config(addr, &mut header)?;
            let word = |offset: usize| u16::from_le_bytes([header[offset], header[offset + 1]]);
            let pci = PciFunction {
                bus,
                device,
                function,
                vendor_id,
                device_id: word(0x02),
                header_type: header[0x0E],
                subsystem_vendor_id: word(0x2C),
                subsystem_id: word(0x2E),
            };
            found.push(pci);

            if function == 0 && pci.header_type & HEADER_TYPE_MULTI_FUNCTION == 0 {
                break;
            }
        }
    }
    Ok(found)
}

#[repr(C)]
pub struct PciRootBridgeIoAccess {
    pub read: extern "efiapi" fn(&PciRootBridgeIoProtocol, u32, u64, usize, *mut u8) -> Status,
    pub write: usize,
}

#[repr(C)]
pub struct PciRootBridgeIoProtocol {
    pub parent_handle: usize,
    pub poll_mem: usize,
    pub poll_io: usize,
    pub mem: PciRootBridgeIoAccess,
    pub io: PciRootBridgeIoAccess,
    pub pci: PciRootBridgeIoAccess,
    pub copy_mem: usize,
    pub map: usize,
    pub unmap: usize,
    pub allocate_buffer: usize,
    pub free_buffer: usize,
    pub flush: usize,
    pub get_attributes: usize,
    pub set_attributes: usize,
    pub configuration: extern "efiapi" fn(&PciRootBridgeIoProtocol, &mut *const u8) -> Status,
    pub segment_number: u32,
}

impl Protocol for PciRootBridgeIoProtocol {
    const GUID: Guid = PCI_ROOT_BRIDGE_IO_PROTOCOL_GUID;
}

// Marker protocol, no interface
pub struct PciEnumerationComplete;

impl Protocol for PciEnumerationComplete {
    const GUID: Guid = PCI_ENUMERATION_COMPLETE_GUID;
}

impl PciRootBridge for PciRootBridgeIoProtocol {
    fn read_config(&self, address: u64, data: &mut [u8]) -> Result<(), Error> {
        check((self.pci.read)(self, WIDTH_UINT8, address, data.len(), data.as_mut_ptr())).map(|_| ())
    }

    fn bus_ranges(&self) -> Result<Vec<(u16, u16)>, Error> {
        let mut descriptors = core::ptr::null();
        check((self.configuration)(self, &mut descriptors))?;
        if descriptors.is_null() {
            return Err(Error::Unsupported);
        }

        // Find the end tag to bound the descriptor list
        let mut len = 0;
        unsafe {
            while *descriptors.add(len) != ACPI_END_TAG_DESCRIPTOR && len < 4096 {
                let size = u16::from_le_bytes([*descriptors.add(len + 1), *descriptors.add(len + 2)]);
                len += 3 + size as usize;
            }
            Ok(bus_ranges(slice::from_raw_parts(descriptors, len + 2)))
        }
    }
}
