// SPDX-License-Identifier: GPL-3.0-only

//! Conversion between raw UEFI status codes and `uefi::status::Error`.

use uefi::status::{Error, Status};

const ERROR_BIT: usize = 1 << (usize::BITS - 1);

/// Check a raw status returned by a firmware call.
pub fn check(status: Status) -> Result<usize, Error> {
    if status.0 & ERROR_BIT == 0 {
        return Ok(status.0);
    }
    Err(match status.0 & !ERROR_BIT {
        2 => Error::InvalidParameter,
        3 => Error::Unsupported,
        5 => Error::BufferTooSmall,
        7 => Error::DeviceError,
        9 => Error::OutOfResources,
        14 => Error::NotFound,
        15 => Error::AccessDenied,
        19 => Error::NotStarted,
        _ => Error::Unknown,
    })
}

/// The status returned to the shell for an error.
pub fn error_status(err: Error) -> Status {
    let code = match err {
        Error::InvalidParameter => 2,
        Error::Unsupported => 3,
        Error::BufferTooSmall => 5,
        Error::DeviceError => 7,
        Error::OutOfResources => 9,
        Error::NotFound => 14,
        Error::AccessDenied => 15,
        Error::NotStarted => 19,
        // EFI_LOAD_ERROR
        _ => 1,
    };
    Status(ERROR_BIT | code)
}
