// SPDX-License-Identifier: GPL-3.0-only

//! TPM 2.0 PCR reads. All fields are big endian.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use uefi::status::Error;

use crate::tpm::{be_u16, be_u32, Transport};
use crate::{Result, ToolError};

pub const TPM_ST_NO_SESSIONS: u16 = 0x8001;
pub const TPM_CC_PCR_READ: u32 = 0x0000_017E;

pub const TPM_ALG_SHA1: u16 = 0x0004;
pub const TPM_ALG_SHA256: u16 = 0x000B;
pub const TPM_ALG_SHA384: u16 = 0x000C;
pub const TPM_ALG_SHA512: u16 = 0x000D;
pub const TPM_ALG_SM3_256: u16 = 0x0012;

pub const MAX_PCR: usize = 24;
pub const HEADER_SIZE: usize = 10;

/// PCR select bytes needed for `MAX_PCR` registers.
const SIZE_OF_SELECT: usize = MAX_PCR / 8;

pub const ALGORITHMS: &[(u16, &str)] = &[
    (TPM_ALG_SHA1, "TPM_ALG_SHA1"),
    (TPM_ALG_SHA256, "TPM_ALG_SHA256"),
    (TPM_ALG_SHA384, "TPM_ALG_SHA384"),
    (TPM_ALG_SHA512, "TPM_ALG_SHA512"),
    (TPM_ALG_SM3_256, "TPM_ALG_SM3_256"),
];

pub fn algorithm_name(alg: u16) -> &'static str {
    ALGORITHMS
        .iter()
        .find(|&&(id, _)| id == alg)
        .map_or("TPM_ALG_UNKNOWN", |&(_, name)| name)
}

/// Bank names accepted on the command line, upper or lower case.
pub fn parse_algorithm(arg: &str) -> Option<u16> {
    match arg {
        "SHA1" | "sha1" => Some(TPM_ALG_SHA1),
        "SHA256" | "sha256" => Some(TPM_ALG_SHA256),
        "SHA384" | "sha384" => Some(TPM_ALG_SHA384),
        "SHA512" | "sha512" => Some(TPM_ALG_SHA512),
        "SM3" | "sm3" => Some(TPM_ALG_SM3_256),
        _ => None,
    }
}

/// TPMS_PCR_SELECTION
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PcrSelection {
    pub hash: u16,
    pub select: Vec<u8>,
}

impl PcrSelection {
    /// Every PCR of a bank.
    pub fn all(hash: u16) -> Self {
        Self {
            hash,
            select: vec![0xff; SIZE_OF_SELECT],
        }
    }

    pub fn is_set(&self, pcr: usize) -> bool {
        self.select
            .get(pcr / 8)
            .map_or(false, |byte| byte & (1 << (pcr % 8)) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.select.iter().all(|&byte| byte == 0)
    }

    /// Drop the registers another selection of the same bank covers.
    pub fn clear(&mut self, other: &PcrSelection) {
        if other.hash != self.hash {
            return;
        }
        for (byte, done) in self.select.iter_mut().zip(other.select.iter()) {
            *byte &= !done;
        }
    }
}

#[derive(Debug)]
pub struct PcrReadResponse {
    pub update_counter: u32,
    pub selection: Vec<PcrSelection>,
    pub digests: Vec<Vec<u8>>,
}

pub fn pcr_read_command(selection: &[PcrSelection]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(selection.len() as u32).to_be_bytes());
    for s in selection {
        body.extend_from_slice(&s.hash.to_be_bytes());
        body.push(s.select.len() as u8);
        body.extend_from_slice(&s.select);
    }

    let size = (HEADER_SIZE + body.len()) as u32;
    let mut cmd = Vec::with_capacity(size as usize);
    cmd.extend_from_slice(&TPM_ST_NO_SESSIONS.to_be_bytes());
    cmd.extend_from_slice(&size.to_be_bytes());
    cmd.extend_from_slice(&TPM_CC_PCR_READ.to_be_bytes());
    cmd.extend_from_slice(&body);
    cmd
}

/// A cursor over a big endian response buffer.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn truncated() -> ToolError {
        ToolError::new(Error::DeviceError, "TPM2 response truncated")
    }

    fn u8(&mut self) -> Result<u8> {
        let value = *self.data.get(self.offset).ok_or_else(Self::truncated)?;
        self.offset += 1;
        Ok(value)
    }

    fn u16(&mut self) -> Result<u16> {
        let value = be_u16(self.data, self.offset).ok_or_else(Self::truncated)?;
        self.offset += 2;
        Ok(value)
    }

    fn u32(&mut self) -> Result<u32> {
        let value = be_u32(self.data, self.offset).ok_or_else(Self::truncated)?;
        self.offset += 4;
        Ok(value)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let value = self
            .data
            .get(self.offset..self.offset + len)
            .ok_or_else(Self::truncated)?;
        self.offset += len;
        Ok(value)
    }
}

pub fn parse_pcr_read(rsp: &[u8]) -> Result<PcrReadResponse> {
    let mut reader = Reader { data: rsp, offset: 0 };
    let _tag = reader.u16()?;
    let _size = reader.u32()?;
    let code = reader.u32()?;
    if code != 0 {
        return Err(ToolError::new(Error::NotFound, format!("Tpm2 ResponseCode [0x{:x}]", code)));
    }

    let update_counter = reader.u32()?;

    let count = reader.u32()?;
    let mut selection = Vec::new();
    for _ in 0..count {
        let hash = reader.u16()?;
        let size = reader.u8()? as usize;
        let select = reader.bytes(size)?.to_vec();
        selection.push(PcrSelection { hash, select });
    }

    let count = reader.u32()?;
    let mut digests = Vec::new();
    for _ in 0..count {
        let size = reader.u16()? as usize;
        digests.push(reader.bytes(size)?.to_vec());
    }

    Ok(PcrReadResponse {
        update_counter,
        selection,
        digests,
    })
}

/// Read every PCR of a bank, resubmitting until the TPM has reported all
/// of them. Digests come back in register order.
pub fn read_bank(tpm: &dyn Transport, hash: u16) -> Result<Vec<Vec<u8>>> {
    let mut remaining = PcrSelection::all(hash);
    let mut digests = Vec::new();

    for _ in 0..MAX_PCR {
        let cmd = pcr_read_command(core::slice::from_ref(&remaining));
        log::debug!("TPM2_PCR_Read {} bytes", cmd.len());
        let mut rsp = [0; 4096];
        tpm.transmit(&cmd, &mut rsp)
            .map_err(|err| ToolError::new(err, "SubmitCommand failed"))?;

        let response = parse_pcr_read(&rsp)?;
        if response.digests.is_empty() {
            // A bank the TPM does not allocate reports an empty selection.
            log::debug!("no digests returned for 0x{:04x}", hash);
            break;
        }
        digests.extend(response.digests);
        for done in &response.selection {
            remaining.clear(done);
        }
        if remaining.is_empty() {
            return Ok(digests);
        }
    }

    if remaining.is_empty() {
        Ok(digests)
    } else if digests.is_empty() {
        Err(ToolError::new(Error::NotFound, format!("{} bank not available", algorithm_name(hash))))
    } else {
        Err(ToolError::new(Error::DeviceError, "Reading PCRs. Too many PCRs found"))
    }
}

/// Print one bank, one line per register.
pub fn print_bank(out: &mut dyn fmt::Write, hash: u16, digests: &[Vec<u8>]) -> Result<()> {
    write!(out, "\nBank (Algorithm): {} (0x{:04x})\n\n", algorithm_name(hash), hash)?;
    let selection = PcrSelection::all(hash);
    let mut values = digests.iter();
    for pcr in (0..MAX_PCR).filter(|&pcr| selection.is_set(pcr)) {
        let digest = values.next().ok_or_else(|| {
            ToolError::new(Error::DeviceError, "Trying to output PCR values but nothing more to output")
        })?;
        let mut line = format!("[{:02}] ", pcr);
        for byte in digest {
            line.push_str(&format!(" {:02x}", byte));
        }
        writeln!(out, "{}", line)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Usage lines listing the banks a TPM may offer.
pub fn algorithm_usage() -> String {
    let mut usage = String::from("\nPossibly supported algorithms:\n");
    for &(id, name) in ALGORITHMS {
        if id == TPM_ALG_SHA1 {
            usage.push_str(&format!("  {} (default)\n", name));
        } else {
            usage.push_str(&format!("  {}\n", name));
        }
    }
    usage
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tpm::ScriptedTpm;

    /// A TPM2_PCR_Read response for one bank.
    pub(crate) fn rsp(hash: u16, select: [u8; 3], digests: &[Vec<u8>]) -> Vec<u8> {
        let mut body = Vec::new();
        // pcrUpdateCounter
        body.extend_from_slice(&7u32.to_be_bytes());
        // pcrSelectionOut
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&hash.to_be_bytes());
        body.push(3);
        body.extend_from_slice(&select);
        // pcrValues
        body.extend_from_slice(&(digests.len() as u32).to_be_bytes());
        for digest in digests {
            body.extend_from_slice(&(digest.len() as u16).to_be_bytes());
            body.extend_from_slice(digest);
        }

        let mut rsp = Vec::new();
        rsp.extend_from_slice(&TPM_ST_NO_SESSIONS.to_be_bytes());
        rsp.extend_from_slice(&((HEADER_SIZE + body.len()) as u32).to_be_bytes());
        rsp.extend_from_slice(&0u32.to_be_bytes());
        rsp.extend_from_slice(&body);
        rsp
    }

    #[test]
    fn command_encoding() {
        assert_eq!(
            pcr_read_command(&[PcrSelection::all(TPM_ALG_SHA256)]),
            [
                // TPM_ST_NO_SESSIONS
                0x80, 0x01,
                // commandSize
                0x00, 0x00, 0x00, 0x14,
                // TPM_CC_PCR_Read
                0x00, 0x00, 0x01, 0x7E,
                // count
                0x00, 0x00, 0x00, 0x01,
                // hash
                0x00, 0x0B,
                // sizeofSelect, pcrSelect
                0x03, 0xff, 0xff, 0xff,
            ]
        );
    }

    #[test]
    fn algorithms() {
        assert_eq!(parse_algorithm("sha384"), Some(TPM_ALG_SHA384));
        assert_eq!(parse_algorithm("SM3"), Some(TPM_ALG_SM3_256));
        assert_eq!(parse_algorithm("Sha1"), None);
        assert_eq!(algorithm_name(TPM_ALG_SM3_256), "TPM_ALG_SM3_256");
        assert_eq!(algorithm_name(0x0010), "TPM_ALG_UNKNOWN");
    }

    #[test]
    fn selection_clear() {
        let mut s = PcrSelection::all(TPM_ALG_SHA1);
        s.clear(&PcrSelection {
            hash: TPM_ALG_SHA1,
            select: vec![0xff, 0x01, 0x00],
        });
        assert!(!s.is_set(8));
        assert!(s.is_set(9));
        s.clear(&PcrSelection::all(TPM_ALG_SHA256));
        assert!(s.is_set(9));
        s.clear(&PcrSelection::all(TPM_ALG_SHA1));
        assert!(s.is_empty());
    }

    #[test]
    fn read_loop() {
        let first: Vec<Vec<u8>> = (0..8).map(|i| vec![i; 20]).collect();
        let second: Vec<Vec<u8>> = (8..24).map(|i| vec![i; 20]).collect();
        let tpm = ScriptedTpm::new(vec![
            rsp(TPM_ALG_SHA1, [0xff, 0x00, 0x00], &first),
            rsp(TPM_ALG_SHA1, [0x00, 0xff, 0xff], &second),
        ]);

        let digests = read_bank(&tpm, TPM_ALG_SHA1).unwrap();
        assert_eq!(digests.len(), 24);
        assert_eq!(digests[23], vec![23; 20]);

        let commands = tpm.commands.borrow();
        assert_eq!(commands.len(), 2);
        // Second request only asks for PCRs 8..24
        assert_eq!(&commands[1][17..], &[0x00, 0xff, 0xff]);
    }

    #[test]
    fn response_code() {
        let mut bad = rsp(TPM_ALG_SHA1, [0; 3], &[]);
        bad[9] = 0x84;
        let err = parse_pcr_read(&bad).unwrap_err();
        assert!(matches!(err.status, Error::NotFound));
        assert_eq!(err.message, "Tpm2 ResponseCode [0x84]");
        assert!(parse_pcr_read(&bad[..12]).is_err());
    }

    #[test]
    fn report() {
        let digests: Vec<Vec<u8>> = (0..24).map(|i| vec![i, 0xaa]).collect();
        let mut out = String::new();
        print_bank(&mut out, TPM_ALG_SHA1, &digests).unwrap();
        assert!(out.starts_with("\nBank (Algorithm): TPM_ALG_SHA1 (0x0004)\n\n[00]  00 aa\n[01]  01 aa\n"));
        assert!(out.ends_with("[23]  17 aa\n\n"));

        let err = print_bank(&mut String::new(), TPM_ALG_SHA1, &digests[..3]).unwrap_err();
        assert_eq!(err.message, "Trying to output PCR values but nothing more to output");
    }
}
