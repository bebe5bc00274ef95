// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::osind::{read_current, OsIndications, BOOT_TO_FW_UI, OS_INDICATIONS};
use crate::runtime::Runtime;
use crate::shell::{single_flag, Command};
use crate::variable::{
    Variables, GLOBAL_VARIABLE_GUID, VARIABLE_BOOTSERVICE_ACCESS, VARIABLE_NON_VOLATILE, VARIABLE_RUNTIME_ACCESS,
};
use crate::{Result, ToolError};

pub const USAGE: &str = "Usage: BootFWUI [-s | --set]\n                [-u | --unset]\n                [-V | --version]\n";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Show,
    Set,
    Unset,
}

pub fn parse(args: &[String]) -> Command<Action> {
    single_flag(
        args,
        Action::Show,
        &[("-s", "--set", Action::Set), ("-u", "--unset", Action::Unset)],
    )
}

fn print_status(out: &mut dyn Write, indications: &OsIndications) -> Result<()> {
    writeln!(
        out,
        "  Boot to Firmware UI: {}. Current value is {}.",
        if indications.is_supported(BOOT_TO_FW_UI) { "Supported" } else { "Unsupported" },
        if indications.is_set(BOOT_TO_FW_UI) { "SET" } else { "UNSET" },
    )?;
    Ok(())
}

pub fn run(vars: &dyn Variables, action: Action, out: &mut dyn Write) -> Result<()> {
    let mut indications = OsIndications::read(vars)?;

    let value = match action {
        Action::Show => return print_status(out, &indications),
        Action::Set => indications.current | BOOT_TO_FW_UI,
        Action::Unset => indications.current & !BOOT_TO_FW_UI,
    };

    log::debug!("{} {:#x} -> {:#x}", OS_INDICATIONS, indications.current, value);
    vars.set_u64(
        OS_INDICATIONS,
        &GLOBAL_VARIABLE_GUID,
        VARIABLE_NON_VOLATILE | VARIABLE_BOOTSERVICE_ACCESS | VARIABLE_RUNTIME_ACCESS,
        value,
    )
    .map_err(|err| {
        let message = format!("SetVariable failed [{:?}]", err);
        ToolError::new(err, message)
    })?;

    indications.current = read_current(vars)?;
    print_status(out, &indications)
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    match parse(args).options(out, USAGE)? {
        Some(action) => run(&rt.variables(), action, out),
        None => Ok(()),
    }
}
