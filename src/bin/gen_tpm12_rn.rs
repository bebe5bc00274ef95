// SPDX-License-Identifier: GPL-3.0-only

#![no_std]
#![no_main]
#![allow(non_snake_case)]

extern crate uefi_std as std;

use uefi::status::Status;
use uefi_platform_tools::{runtime, tools::gen_tpm12_rn};

#[no_mangle]
pub extern "C" fn main() -> Status {
    runtime::launch(std::handle(), std::system_table(), gen_tpm12_rn::main)
}
