// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::{String, ToString};
use core::fmt;
use uefi::status::Error;

pub type Result<T> = core::result::Result<T, ToolError>;

/// A firmware error paired with the line shown to the user.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    pub status: Error,
    pub message: String,
}

impl ToolError {
    pub fn new(status: Error, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Replace the message, keeping the status.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::new(self.status, message)
    }
}

impl From<Error> for ToolError {
    fn from(status: Error) -> Self {
        Self::new(status, format!("{:?}", status))
    }
}

impl From<plain::Error> for ToolError {
    fn from(err: plain::Error) -> Self {
        let message = match err {
            plain::Error::TooShort => "structure truncated",
            plain::Error::BadAlignment => "structure misaligned",
        };
        Self::new(Error::BufferTooSmall, message.to_string())
    }
}

impl From<fmt::Error> for ToolError {
    fn from(_: fmt::Error) -> Self {
        Self::new(Error::DeviceError, "console write failed")
    }
}

/// Attach a message to a firmware result.
pub trait Context<T> {
    fn context(self, message: &str) -> Result<T>;
}

impl<T> Context<T> for core::result::Result<T, Error> {
    fn context(self, message: &str) -> Result<T> {
        self.map_err(|status| ToolError::new(status, message))
    }
}

impl<T> Context<T> for Result<T> {
    fn context(self, message: &str) -> Result<T> {
        self.map_err(|err| err.context(message))
    }
}
