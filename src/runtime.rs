// SPDX-License-Identifier: GPL-3.0-only

//! Glue between the firmware system table and the tools.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};
use core::sync::atomic::{AtomicUsize, Ordering};
use core::{mem, ptr, slice};
use uefi::boot::LocateSearchType;
use uefi::guid::Guid;
use uefi::status::{Error, Status};
use uefi::system::SystemTable;
use uefi::Handle;

use crate::mapper::PhysicalMapper;
use crate::shell;
use crate::status::{check, error_status};
use crate::variable::RuntimeVariables;
use crate::Result;

/// A firmware interface identified by GUID.
pub trait Protocol: Sized + 'static {
    const GUID: Guid;
}

pub const LOADED_IMAGE_PROTOCOL_GUID: Guid = Guid(0x5b1b_31a1, 0x9562, 0x11d2, [0x8e, 0x3f, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b]);
pub const SHELL_PARAMETERS_PROTOCOL_GUID: Guid = Guid(0x752f_3136, 0x4e16, 0x4fdc, [0xa2, 0x2a, 0xe5, 0xf4, 0x68, 0x12, 0xf4, 0xca]);
pub const DEVICE_PATH_PROTOCOL_GUID: Guid = Guid(0x0957_6e91, 0x6d3f, 0x11d2, [0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b]);

// EFI_LOADED_IMAGE_PROTOCOL, up to the load options
#[repr(C)]
pub struct LoadedImageProtocol {
    pub revision: u32,
    pub parent_handle: usize,
    pub system_table: usize,
    pub device_handle: Handle,
    pub file_path: usize,
    pub reserved: usize,
    pub load_options_size: u32,
    pub load_options: *const u16,
}

impl Protocol for LoadedImageProtocol {
    const GUID: Guid = LOADED_IMAGE_PROTOCOL_GUID;
}

#[repr(C)]
pub struct ShellParametersProtocol {
    pub argv: *const *const u16,
    pub argc: usize,
    pub std_in: usize,
    pub std_out: usize,
    pub std_err: usize,
}

impl Protocol for ShellParametersProtocol {
    const GUID: Guid = SHELL_PARAMETERS_PROTOCOL_GUID;
}

/// The three ways a protocol instance can be found: on the console output
/// handle, through LocateProtocol, and on every handle supporting it.
pub struct Probe<'a, P: ?Sized> {
    pub console: Option<&'a P>,
    pub located: Option<&'a P>,
    pub handles: Option<Vec<&'a P>>,
}

impl<'a, P: ?Sized> Probe<'a, P> {
    /// View every instance found through another type, usually a trait object.
    pub fn map<Q: ?Sized>(self, f: impl Fn(&'a P) -> &'a Q) -> Probe<'a, Q> {
        Probe {
            console: self.console.map(&f),
            located: self.located.map(&f),
            handles: self.handles.map(|found| found.into_iter().map(&f).collect()),
        }
    }
}

fn ucs2_str(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let len = (0..).take_while(|&i| unsafe { *ptr.add(i) } != 0).count();
    let units = unsafe { slice::from_raw_parts(ptr, len) };
    char::decode_utf16(units.iter().copied())
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// The running image and the system table it was started with.
pub struct Runtime {
    image: Handle,
    system_table: &'static SystemTable,
}

impl Runtime {
    /// `system_table` must be the table passed to the image entry point.
    pub unsafe fn new(image: Handle, system_table: &'static SystemTable) -> Self {
        Self { image, system_table }
    }

    pub fn image(&self) -> Handle {
        self.image
    }

    pub fn locate_protocol<P: Protocol>(&self) -> Result<&'static P> {
        let mut interface = 0;
        check((self.system_table.BootServices.LocateProtocol)(&P::GUID, 0, &mut interface))?;
        unsafe { (interface as *const P).as_ref() }.ok_or_else(|| Error::NotFound.into())
    }

    pub fn handle_protocol<P: Protocol>(&self, handle: Handle) -> Result<&'static P> {
        self.handle_interface(handle, &P::GUID)
            .and_then(|interface| unsafe { (interface as *const P).as_ref() }.ok_or_else(|| Error::NotFound.into()))
    }

    fn handle_interface(&self, handle: Handle, guid: &Guid) -> Result<usize> {
        let mut interface = 0;
        check((self.system_table.BootServices.HandleProtocol)(handle, guid, &mut interface))?;
        Ok(interface)
    }

    /// Whether any handle carries the protocol.
    pub fn has_protocol<P: Protocol>(&self) -> bool {
        self.locate_protocol::<P>().is_ok()
    }

    /// Every handle supporting the given protocol.
    pub fn locate_handles(&self, guid: &Guid) -> Result<Vec<Handle>> {
        let boot_services = &self.system_table.BootServices;
        let mut size = 0;
        let status = (boot_services.LocateHandle)(LocateSearchType::ByProtocol, guid, 0, &mut size, ptr::null_mut());
        match check(status) {
            Err(Error::BufferTooSmall) => (),
            Err(err) => return Err(err.into()),
            Ok(_) => return Ok(Vec::new()),
        }

        let count = size / mem::size_of::<Handle>();
        let mut handles: Vec<Handle> = Vec::with_capacity(count);
        check((boot_services.LocateHandle)(LocateSearchType::ByProtocol, guid, 0, &mut size, handles.as_mut_ptr()))?;
        unsafe { handles.set_len(size / mem::size_of::<Handle>()) };
        Ok(handles)
    }

    /// Instances of `P` on every handle supporting it.
    pub fn protocols<P: Protocol>(&self) -> Result<Vec<&'static P>> {
        Ok(self
            .locate_handles(&P::GUID)?
            .into_iter()
            .filter_map(|handle| self.handle_protocol::<P>(handle).ok())
            .collect())
    }

    pub fn probe<P: Protocol>(&self) -> Probe<'static, P> {
        Probe {
            console: self.handle_protocol::<P>(self.system_table.ConsoleOutHandle).ok(),
            located: self.locate_protocol::<P>().ok(),
            handles: self.protocols::<P>().ok().filter(|found| !found.is_empty()),
        }
    }

    /// Instances of `P` on handles that also carry a device path.
    pub fn physical_protocols<P: Protocol>(&self) -> Result<Vec<&'static P>> {
        Ok(self
            .locate_handles(&P::GUID)?
            .into_iter()
            .filter(|&handle| self.handle_interface(handle, &DEVICE_PATH_PROTOCOL_GUID).is_ok())
            .filter_map(|handle| self.handle_protocol::<P>(handle).ok())
            .collect())
    }

    /// `(vendor guid, address)` pairs of the EFI configuration table.
    pub fn config_tables(&self) -> Vec<(Guid, u64)> {
        self.system_table
            .config_tables()
            .iter()
            .map(|table| (table.VendorGuid, table.VendorTable as u64))
            .collect()
    }

    pub fn mapper(&self) -> PhysicalMapper {
        unsafe { PhysicalMapper::new() }
    }

    pub fn variables(&self) -> RuntimeVariables {
        RuntimeVariables::new(self.system_table)
    }

    pub fn console(&self) -> Console {
        Console { system_table: self.system_table }
    }

    pub fn loaded_image(&self) -> Result<&'static LoadedImageProtocol> {
        self.handle_protocol::<LoadedImageProtocol>(self.image)
    }

    /// Command line arguments, including the program name.
    pub fn args(&self) -> Vec<String> {
        if let Ok(params) = self.handle_protocol::<ShellParametersProtocol>(self.image) {
            if !params.argv.is_null() {
                return (0..params.argc)
                    .map(|i| ucs2_str(unsafe { *params.argv.add(i) }))
                    .collect();
            }
        }

        match self.loaded_image() {
            Ok(image) if !image.load_options.is_null() => {
                let len = image.load_options_size as usize / mem::size_of::<u16>();
                let options = unsafe { slice::from_raw_parts(image.load_options, len) };
                shell::split_command_line(options)
            }
            _ => Vec::new(),
        }
    }

    /// Block until a key is pressed and consume it.
    pub fn wait_for_key(&self) -> Result<()> {
        let boot_services = &self.system_table.BootServices;
        let console_in = &self.system_table.ConsoleIn;
        let mut index = 0;
        check((boot_services.WaitForEvent)(1, &console_in.WaitForKey, &mut index))?;
        let mut key = uefi::text::TextInputKey {
            ScanCode: 0,
            UnicodeChar: 0,
        };
        check((console_in.ReadKeyStroke)(console_in, &mut key))?;
        Ok(())
    }
}

/// Text output on the firmware console.
pub struct Console {
    system_table: &'static SystemTable,
}

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut buf: Vec<u16> = Vec::with_capacity(s.len() + 1);
        for c in s.encode_utf16() {
            if c == u16::from(b'\n') {
                buf.push(u16::from(b'\r'));
            }
            buf.push(c);
        }
        buf.push(0);
        let console_out = &self.system_table.ConsoleOut;
        check((console_out.OutputString)(console_out, buf.as_ptr())).map_err(|_| fmt::Error)?;
        Ok(())
    }
}

static LOGGER_TABLE: AtomicUsize = AtomicUsize::new(0);

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let table = LOGGER_TABLE.load(Ordering::Acquire) as *const SystemTable;
        if let Some(system_table) = unsafe { table.as_ref() } {
            let mut console = Console { system_table };
            let _ = writeln!(console, "{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(system_table: &'static SystemTable) {
    LOGGER_TABLE.store(system_table as *const SystemTable as usize, Ordering::Release);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        });
    }
}

/// A tool entry point: runtime, arguments (program name first) and console.
pub type Tool = fn(&Runtime, &[String], &mut dyn Write) -> Result<()>;

/// Run a tool from an application entry point and turn its result into a status.
pub fn launch(image: Handle, system_table: &'static SystemTable, tool: Tool) -> Status {
    init_logger(system_table);
    let runtime = unsafe { Runtime::new(image, system_table) };
    let args = runtime.args();
    let mut console = runtime.console();

    match tool(&runtime, &args, &mut console) {
        Ok(()) => Status(0),
        Err(err) => {
            let _ = writeln!(console, "ERROR: {}", err);
            log::debug!("exit status {:?}", err.status);
            error_status(err.status)
        }
    }
}
