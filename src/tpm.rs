// SPDX-License-Identifier: GPL-3.0-only

//! TPM 1.2 command encoding. All fields are big endian.

use alloc::vec::Vec;
use uefi::status::Error;

use crate::{Result, ToolError};

pub const TPM_TAG_RQU_COMMAND: u16 = 0x00C1;
pub const TPM_TAG_RSP_COMMAND: u16 = 0x00C4;

pub const TPM_ORD_PCR_READ: u32 = 0x0000_0015;
pub const TPM_ORD_GET_RANDOM: u32 = 0x0000_0046;

pub const TPM_NUM_PCR: u32 = 24;
pub const SHA1_DIGEST_SIZE: usize = 20;

/// Tag, parameter size and ordinal or return code.
pub const HEADER_SIZE: usize = 10;

/// Something that can carry a raw command to a TPM and return its response.
pub trait Transport {
    /// Send `command`, filling `response`.
    fn transmit(&self, command: &[u8], response: &mut [u8]) -> core::result::Result<(), Error>;
}

fn command(ordinal: u32, params: &[u8]) -> Vec<u8> {
    let size = (HEADER_SIZE + params.len()) as u32;
    let mut cmd = Vec::with_capacity(size as usize);
    cmd.extend_from_slice(&TPM_TAG_RQU_COMMAND.to_be_bytes());
    cmd.extend_from_slice(&size.to_be_bytes());
    cmd.extend_from_slice(&ordinal.to_be_bytes());
    cmd.extend_from_slice(params);
    cmd
}

pub fn pcr_read_command(index: u32) -> Vec<u8> {
    command(TPM_ORD_PCR_READ, &index.to_be_bytes())
}

pub fn get_random_command(bytes: u32) -> Vec<u8> {
    command(TPM_ORD_GET_RANDOM, &bytes.to_be_bytes())
}

pub(crate) fn be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn truncated() -> ToolError {
    ToolError::new(Error::DeviceError, "TPM response truncated")
}

/// Check a response header and return the output parameters.
pub fn response(rsp: &[u8]) -> Result<&[u8]> {
    let tag = be_u16(rsp, 0).ok_or_else(truncated)?;
    let size = be_u32(rsp, 2).ok_or_else(truncated)? as usize;
    let code = be_u32(rsp, 6).ok_or_else(truncated)?;
    if tag != TPM_TAG_RSP_COMMAND || code != 0 {
        return Err(ToolError::new(Error::DeviceError, format!("TPM command result [{}]", code)));
    }
    rsp.get(HEADER_SIZE..size).ok_or_else(truncated)
}

pub fn parse_pcr_read(rsp: &[u8]) -> Result<[u8; SHA1_DIGEST_SIZE]> {
    let params = response(rsp)?;
    let mut digest = [0; SHA1_DIGEST_SIZE];
    digest.copy_from_slice(params.get(..SHA1_DIGEST_SIZE).ok_or_else(truncated)?);
    Ok(digest)
}

pub fn parse_get_random(rsp: &[u8]) -> Result<Vec<u8>> {
    let params = response(rsp)?;
    let size = be_u32(params, 0).ok_or_else(truncated)? as usize;
    Ok(params.get(4..4 + size).ok_or_else(truncated)?.to_vec())
}

fn transmit(tpm: &dyn Transport, cmd: &[u8], rsp: &mut [u8]) -> Result<()> {
    log::debug!("TPM command {} bytes", cmd.len());
    tpm.transmit(cmd, rsp)
        .map_err(|err| ToolError::new(err, "PassThroughToTpm failed"))
}

/// Read the SHA1 value of one PCR.
pub fn pcr_read(tpm: &dyn Transport, index: u32) -> Result<[u8; SHA1_DIGEST_SIZE]> {
    let mut rsp = [0; 64];
    transmit(tpm, &pcr_read_command(index), &mut rsp)?;
    parse_pcr_read(&rsp)
}

/// Ask the TPM for `count` random bytes. It may return fewer.
pub fn get_random(tpm: &dyn Transport, count: u32) -> Result<Vec<u8>> {
    let mut rsp = vec![0; HEADER_SIZE + 4 + count as usize];
    transmit(tpm, &get_random_command(count), &mut rsp)?;
    parse_get_random(&rsp)
}

#[cfg(test)]
pub(crate) use self::tests::ScriptedTpm;
