// SPDX-License-Identifier: GPL-3.0-only

//! OS indication variables shared between the OS and the firmware.

use core::fmt;
use uefi::status::Error;

use crate::variable::{Variables, GLOBAL_VARIABLE_GUID};
use crate::{Result, ToolError};

pub const OS_INDICATIONS_SUPPORTED: &str = "OsIndicationsSupported";
pub const OS_INDICATIONS: &str = "OsIndications";

pub const BOOT_TO_FW_UI: u64 = 0x0000_0000_0000_0001;
pub const TIMESTAMP_REVOCATION: u64 = 0x0000_0000_0000_0002;
pub const FILE_CAPSULE_DELIVERY_SUPPORTED: u64 = 0x0000_0000_0000_0004;
pub const FMP_CAPSULE_SUPPORTED: u64 = 0x0000_0000_0000_0008;
pub const CAPSULE_RESULT_VAR_SUPPORTED: u64 = 0x0000_0000_0000_0010;
pub const START_OS_RECOVERY: u64 = 0x0000_0000_0000_0020;
pub const START_PLATFORM_RECOVERY: u64 = 0x0000_0000_0000_0040;

pub const FEATURES: &[(u64, &str)] = &[
    (BOOT_TO_FW_UI, "Boot to Firmware UI"),
    (TIMESTAMP_REVOCATION, "Timestamp Revocation"),
    (FILE_CAPSULE_DELIVERY_SUPPORTED, "File Capsule Delivery Support"),
    (FMP_CAPSULE_SUPPORTED, "FMP Capsule Support"),
    (CAPSULE_RESULT_VAR_SUPPORTED, "Capsule Result Variable Support"),
    (START_OS_RECOVERY, "Start OS Recovery"),
    (START_PLATFORM_RECOVERY, "Start Platform Recovery"),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OsIndications {
    pub supported: u64,
    pub current: u64,
}

/// Read OsIndications, which firmware may not create until the OS sets it.
pub fn read_current(vars: &dyn Variables) -> Result<u64> {
    match vars.get_u64(OS_INDICATIONS, &GLOBAL_VARIABLE_GUID) {
        Ok(value) => Ok(value),
        Err(Error::NotFound) => {
            log::debug!("{} not set, using 0", OS_INDICATIONS);
            Ok(0)
        }
        Err(err) => Err(ToolError::new(err, "Could not read OsIndications variable.")),
    }
}

impl OsIndications {
    pub fn read(vars: &dyn Variables) -> Result<Self> {
        let supported = match vars.get_u64(OS_INDICATIONS_SUPPORTED, &GLOBAL_VARIABLE_GUID) {
            Ok(value) => value,
            Err(Error::NotFound) => {
                return Err(ToolError::new(Error::NotFound, "OsIndicationsSupported variable not found."));
            }
            Err(err) => return Err(ToolError::new(err, "Could not read OsIndicationsSupported variable.")),
        };
        let current = read_current(vars)?;
        Ok(Self { supported, current })
    }

    pub fn is_supported(&self, bit: u64) -> bool {
        self.supported & bit != 0
    }

    pub fn is_set(&self, bit: u64) -> bool {
        self.current & bit != 0
    }

    /// Raw values, as shown in verbose mode.
    pub fn print_raw(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "    OsIndicationsSupported Variable: 0x{:016x}", self.supported)?;
        writeln!(out, "             OsIndications Variable: 0x{:016x}", self.current)
    }

    /// One line per feature with its support and current state.
    pub fn print_features(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for &(bit, name) in FEATURES {
            writeln!(
                out,
                "{:>35}: {:<11} [{}]",
                name,
                if self.is_supported(bit) { "Supported" } else { "Unsupported" },
                if self.is_set(bit) { "Set" } else { "Unset" },
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::MemoryVariables;
    use alloc::string::String;

    #[test]
    fn missing_supported_variable() {
        let vars = MemoryVariables::default();
        let err = OsIndications::read(&vars).unwrap_err();
        assert!(matches!(err.status, Error::NotFound));
        assert_eq!(err.message, "OsIndicationsSupported variable not found.");
    }

    #[test]
    fn missing_current_is_zero() {
        let vars = MemoryVariables::default().with_u64(OS_INDICATIONS_SUPPORTED, 0x5f);
        let ind = OsIndications::read(&vars).unwrap();
        assert_eq!(ind, OsIndications { supported: 0x5f, current: 0 });
        assert!(ind.is_supported(START_PLATFORM_RECOVERY));
        assert!(!ind.is_supported(START_OS_RECOVERY));
    }

    #[test]
    fn feature_lines_line_up() {
        let ind = OsIndications {
            supported: BOOT_TO_FW_UI | FMP_CAPSULE_SUPPORTED,
            current: BOOT_TO_FW_UI,
        };
        let mut out = String::new();
        ind.print_features(&mut out).unwrap();
        let lines: alloc::vec::Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), FEATURES.len());
        assert_eq!(lines[0], "                Boot to Firmware UI: Supported   [Set]");
        assert_eq!(lines[1], "               Timestamp Revocation: Unsupported [Unset]");
        assert_eq!(lines[3], "                FMP Capsule Support: Supported   [Unset]");
        assert_eq!(lines[4], "    Capsule Result Variable Support: Unsupported [Unset]");
        assert!(lines.iter().all(|line| line.find(':') == Some(35)));
    }

    #[test]
    fn raw_values() {
        let ind = OsIndications { supported: 0x41, current: 1 };
        let mut out = String::new();
        ind.print_raw(&mut out).unwrap();
        assert_eq!(
            out,
            "    OsIndicationsSupported Variable: 0x0000000000000041\n\
             \x20            OsIndications Variable: 0x0000000000000001\n"
        );
    }
}
