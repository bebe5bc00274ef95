// SPDX-License-Identifier: GPL-3.0-only

use alloc::vec::Vec;
use core::ptr;
use uefi::guid::Guid;
use uefi::status::Error;
use uefi::system::SystemTable;

use crate::status::check;

pub const GLOBAL_VARIABLE_GUID: Guid = Guid(0x8be4_df61, 0x93ca, 0x11d2, [0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c]);

pub const VARIABLE_NON_VOLATILE: u32 = 0x0000_0001;
pub const VARIABLE_BOOTSERVICE_ACCESS: u32 = 0x0000_0002;
pub const VARIABLE_RUNTIME_ACCESS: u32 = 0x0000_0004;

/// Access to UEFI variables.
pub trait Variables {
    /// Read a variable into `data`, returning its attributes and size.
    fn get(&self, name: &str, guid: &Guid, data: &mut [u8]) -> Result<(u32, usize), Error>;
    fn set(&self, name: &str, guid: &Guid, attributes: u32, data: &[u8]) -> Result<(), Error>;

    /// Read a 64-bit variable such as OsIndications.
    fn get_u64(&self, name: &str, guid: &Guid) -> Result<u64, Error> {
        let mut data = [0; 8];
        let (_, size) = self.get(name, guid, &mut data)?;
        if size != data.len() {
            log::warn!("{} is {} bytes", name, size);
        }
        Ok(u64::from_le_bytes(data))
    }

    fn set_u64(&self, name: &str, guid: &Guid, attributes: u32, value: u64) -> Result<(), Error> {
        self.set(name, guid, attributes, &value.to_le_bytes())
    }
}

fn ucs2_name(name: &str) -> Vec<u16> {
    name.encode_utf16().chain(Some(0)).collect()
}

/// Variables through the runtime services table.
pub struct RuntimeVariables {
    system_table: &'static SystemTable,
}

impl RuntimeVariables {
    pub fn new(system_table: &'static SystemTable) -> Self {
        Self { system_table }
    }
}

impl Variables for RuntimeVariables {
    fn get(&self, name: &str, guid: &Guid, data: &mut [u8]) -> Result<(u32, usize), Error> {
        let name = ucs2_name(name);
        let mut attributes = 0;
        let mut size = data.len();
        check((self.system_table.RuntimeServices.GetVariable)(
            name.as_ptr(),
            guid,
            &mut attributes,
            &mut size,
            data.as_mut_ptr(),
        ))?;
        Ok((attributes, size))
    }

    fn set(&self, name: &str, guid: &Guid, attributes: u32, data: &[u8]) -> Result<(), Error> {
        let name = ucs2_name(name);
        log::debug!("SetVariable attributes {:#x}, {} bytes", attributes, data.len());
        check((self.system_table.RuntimeServices.SetVariable)(
            name.as_ptr(),
            guid,
            attributes,
            data.len(),
            if data.is_empty() { ptr::null() } else { data.as_ptr() },
        ))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use self::tests::MemoryVariables;
