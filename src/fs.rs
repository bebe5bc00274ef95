// SPDX-License-Identifier: GPL-3.0-only

//! Simple File System access for reading images and saving the boot logo.

use alloc::vec::Vec;
use core::{mem, ptr};
use uefi::guid::Guid;
use uefi::status::{Error, Status};

use crate::error::Context;
use crate::runtime::Protocol;
use crate::status::check;
use crate::Result;

pub const SIMPLE_FILE_SYSTEM_PROTOCOL_GUID: Guid = Guid(0x964e_5b22, 0x6459, 0x11d2, [0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b]);

pub const FILE_MODE_READ: u64 = 0x0000_0000_0000_0001;
pub const FILE_MODE_WRITE: u64 = 0x0000_0000_0000_0002;
pub const FILE_MODE_CREATE: u64 = 0x8000_0000_0000_0000;

#[repr(C)]
pub struct SimpleFileSystemProtocol {
    pub revision: u64,
    pub open_volume: extern "efiapi" fn(&SimpleFileSystemProtocol, &mut *mut FileProtocol) -> Status,
}

impl Protocol for SimpleFileSystemProtocol {
    const GUID: Guid = SIMPLE_FILE_SYSTEM_PROTOCOL_GUID;
}

#[repr(C)]
pub struct FileProtocol {
    pub revision: u64,
    pub open: extern "efiapi" fn(&FileProtocol, &mut *mut FileProtocol, *const u16, u64, u64) -> Status,
    pub close: extern "efiapi" fn(&FileProtocol) -> Status,
    pub delete: extern "efiapi" fn(&FileProtocol) -> Status,
    pub read: extern "efiapi" fn(&FileProtocol, &mut usize, *mut u8) -> Status,
    pub write: extern "efiapi" fn(&FileProtocol, &mut usize, *const u8) -> Status,
}

/// Whole-file access on some volume.
pub trait FileStore {
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn write(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// Shell style path as a NUL terminated UCS-2 string with backslash separators.
pub fn ucs2_path(path: &str) -> Vec<u16> {
    path.encode_utf16()
        .map(|c| if c == u16::from(b'/') { u16::from(b'\\') } else { c })
        .chain(Some(0))
        .collect()
}

/// An open file, closed on drop.
struct File<'a>(&'a FileProtocol);

impl<'a> File<'a> {
    fn open(dir: &FileProtocol, path: &str, mode: u64) -> core::result::Result<Self, Error> {
        let name = ucs2_path(path);
        let mut file = ptr::null_mut();
        check((dir.open)(dir, &mut file, name.as_ptr(), mode, 0))?;
        unsafe { file.as_ref() }.map(File).ok_or(Error::NotFound)
    }

    fn read_to_end(&self) -> core::result::Result<Vec<u8>, Error> {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let mut size = chunk.len();
            check((self.0.read)(self.0, &mut size, chunk.as_mut_ptr()))?;
            if size == 0 {
                return Ok(data);
            }
            data.extend_from_slice(&chunk[..size]);
        }
    }

    fn write_all(&self, data: &[u8]) -> core::result::Result<(), Error> {
        let mut size = data.len();
        check((self.0.write)(self.0, &mut size, data.as_ptr()))?;
        if size != data.len() {
            return Err(Error::DeviceError);
        }
        Ok(())
    }

    /// Delete closes the handle, so skip drop.
    fn delete(self) {
        let status = (self.0.delete)(self.0);
        mem::forget(self);
        if check(status).is_err() {
            log::warn!("could not delete existing file");
        }
    }
}

impl<'a> Drop for File<'a> {
    fn drop(&mut self) {
        let _ = (self.0.close)(self.0);
    }
}

/// The root directory of a volume.
pub struct Volume<'a> {
    fs: &'a SimpleFileSystemProtocol,
}

impl<'a> Volume<'a> {
    pub fn new(fs: &'a SimpleFileSystemProtocol) -> Self {
        Self { fs }
    }

    fn root(&self) -> Result<File<'a>> {
        let mut root = ptr::null_mut();
        check((self.fs.open_volume)(self.fs, &mut root)).context("Volume open")?;
        unsafe { root.as_ref() }
            .map(File)
            .ok_or(Error::NotFound)
            .context("Volume open")
    }
}

impl<'a> FileStore for Volume<'a> {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let root = self.root()?;
        let file = File::open(root.0, path, FILE_MODE_READ).context("Could not open specified file")?;
        file.read_to_end().context("Could not read specified file")
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let root = self.root()?;
        // Replace rather than overwrite in place, which would keep a longer tail
        if let Ok(existing) = File::open(root.0, path, FILE_MODE_READ | FILE_MODE_WRITE) {
            existing.delete();
        }
        let file = File::open(root.0, path, FILE_MODE_READ | FILE_MODE_WRITE | FILE_MODE_CREATE)
            .context("File open")?;
        file.write_all(data).context("Saving image to file")?;
        log::debug!("wrote {} bytes to {}", data.len(), path);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use self::tests::MemoryStore;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolError;
    use alloc::collections::BTreeMap;
    use alloc::string::{String, ToString};
    use core::cell::RefCell;

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) files: RefCell<BTreeMap<String, Vec<u8>>>,
    }

    impl FileStore for MemoryStore {
        fn read(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| ToolError::new(Error::NotFound, "Could not open specified file"))
        }

        fn write(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.borrow_mut().insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn path_separators() {
        let path = ucs2_path("logos/boot.bmp");
        let expected: Vec<u16> = "logos\\boot.bmp\0".encode_utf16().collect();
        assert_eq!(path, expected);
    }
}
