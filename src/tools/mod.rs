// SPDX-License-Identifier: GPL-3.0-only

//! One module per shell utility. Each exposes `main`, the entry handed to
//! [`crate::runtime::launch`], and a `run` that only sees firmware through
//! the library's traits.

pub mod boot_fw_ui;
pub mod display_bmp;
pub mod gen_tpm12_rn;
pub mod graphic_modes;
pub mod show_bgrt;
pub mod show_os_indications;
pub mod show_pci;
pub mod show_pcr12;
pub mod show_pcr20;
pub mod show_slic;
pub mod show_tcm20;
pub mod show_tpm2;
pub mod show_tree;
pub mod show_tree_log;
