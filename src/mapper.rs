// SPDX-License-Identifier: GPL-3.0-only

use core::slice;
use uefi::status::Error;

use crate::{Result, ToolError};

/// Read access to physical memory, such as ACPI tables and the TCG event log.
pub trait Mapper {
    fn map(&self, address: u64, size: usize) -> Result<&[u8]>;
}

/// Boot services run identity mapped, so physical addresses are used directly.
pub struct PhysicalMapper(());

impl PhysicalMapper {
    /// Caller must ensure memory is identity mapped, as it is before ExitBootServices.
    pub unsafe fn new() -> Self {
        Self(())
    }
}

impl Mapper for PhysicalMapper {
    fn map(&self, address: u64, size: usize) -> Result<&[u8]> {
        if address == 0 {
            return Err(ToolError::new(Error::InvalidParameter, "null physical address"));
        }
        log::debug!("map {:#x} ({} bytes)", address, size);
        Ok(unsafe { slice::from_raw_parts(address as usize as *const u8, size) })
    }
}

#[cfg(test)]
pub(crate) use self::tests::RegionMapper;
