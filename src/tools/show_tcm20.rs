// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::error::Context;
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::tcg::{locate_tcg2, Tcg2};
use crate::Result;

pub const USAGE: &str = "Usage: ShowTCM20 [-V | --version]\n";

pub fn parse(args: &[String]) -> Command<()> {
    single_flag(args, (), &[])
}

pub fn run(tcg2: &dyn Tcg2, out: &mut dyn Write) -> Result<()> {
    let capability = tcg2.capability().context("Tcg2Protocol GetCapability")?;
    capability.print(out)?;
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    if parse(args).options(out, USAGE)?.is_none() {
        return Ok(());
    }
    run(locate_tcg2(rt)?, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcg::{Tcg2Capability, Version, HASH_ALG_SHA256};
    use uefi::status::Error;

    struct FakeTcg2(Option<Tcg2Capability>);

    impl Tcg2 for FakeTcg2 {
        fn capability(&self) -> core::result::Result<Tcg2Capability, Error> {
            self.0.ok_or(Error::DeviceError)
        }
    }

    #[test]
    fn capability_report() {
        let tcg2 = FakeTcg2(Some(Tcg2Capability {
            size: 36,
            structure_version: Version { major: 1, minor: 1 },
            protocol_version: Version { major: 1, minor: 1 },
            hash_algorithm_bitmap: HASH_ALG_SHA256,
            // "NTC"
            manufacturer_id: 0x4e54_4300,
            number_of_pcr_banks: 1,
            active_pcr_banks: 2,
            ..Default::default()
        }));
        let mut out = String::new();
        run(&tcg2, &mut out).unwrap();
        assert!(out.starts_with("\n            Structure Version: 1.1\n"));
        assert!(out.contains("             TPM Present Flag: False\n"));
        assert!(out.contains("                TCG Vendor ID: NTC\n"));
        assert!(out.contains("          Number of PCR Banks: 1\n"));
    }

    #[test]
    fn capability_failure() {
        let mut out = String::new();
        let err = run(&FakeTcg2(None), &mut out).unwrap_err();
        assert!(matches!(err.status, Error::DeviceError));
        assert_eq!(err.message, "Tcg2Protocol GetCapability");
        assert!(out.is_empty());
    }

    #[test]
    fn options() {
        assert_eq!(parse(&["ShowTCM20".into()]), Command::Run(()));
        assert_eq!(parse(&["ShowTCM20".into(), "-v".into()]), Command::Invalid);
    }
}
