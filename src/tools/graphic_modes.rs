// SPDX-License-Identifier: GPL-3.0-only

use alloc::string::String;
use core::fmt::Write;

use crate::graphics::{
    ConsoleControl, ConsoleControlProtocol, Graphics, GraphicsOutputProtocol, ScreenMode, UgaDraw, UgaDrawProtocol,
};
use crate::runtime::{Probe, Runtime};
use crate::shell::{single_flag, Command};
use crate::Result;

pub const USAGE: &str = "Usage: GraphicModes [ -v | --verbose ]\n       GraphicModes [ -V | --version ]\n";

pub fn parse(args: &[String]) -> Command<bool> {
    single_flag(args, false, &[("-v", "--verbose", true)])
}

/// Every console control, UGA and GOP instance the firmware exposes.
pub struct Adapters<'a> {
    pub ccp: Probe<'a, dyn ConsoleControl + 'a>,
    pub uga: Probe<'a, dyn UgaDraw + 'a>,
    pub gop: Probe<'a, dyn Graphics + 'a>,
}

/// Walk the three probes in order, printing each instance found. Without
/// `verbose` the first instance is the only one reported.
fn report<P: ?Sized>(
    out: &mut dyn Write,
    name: &str,
    probe: &Probe<P>,
    verbose: bool,
    print: impl Fn(&mut dyn Write, &P) -> Result<()>,
) -> Result<bool> {
    let mut found = false;

    match probe.console {
        Some(instance) => {
            if verbose {
                writeln!(out, "{} handle found via HandleProtocol", name)?;
            }
            print(out, instance)?;
            found = true;
            if !verbose {
                return Ok(found);
            }
        }
        None if verbose => writeln!(out, "No {} handle found via HandleProtocol", name)?,
        None => (),
    }

    match probe.located {
        Some(instance) => {
            if verbose {
                writeln!(out, "Found {} handle via LocateProtocol", name)?;
            }
            print(out, instance)?;
            found = true;
            if !verbose {
                return Ok(found);
            }
        }
        None if verbose => writeln!(out, "No {} handle found via LocateProtocol", name)?,
        None => (),
    }

    match &probe.handles {
        Some(instances) => {
            if verbose {
                writeln!(out, "Found {} {} handle(s) via LocateHandleBuffer", instances.len(), name)?;
            }
            for &instance in instances {
                print(out, instance)?;
                found = true;
                if !verbose {
                    break;
                }
            }
        }
        None if verbose => writeln!(out, "No {} handles found via LocateHandleBuffer", name)?,
        None => (),
    }

    Ok(found)
}

fn print_ccp(out: &mut dyn Write, ccp: &(dyn ConsoleControl + '_)) -> Result<()> {
    let (mode, graphics) = match ccp.mode() {
        Ok(mode) => mode,
        Err(err) => {
            writeln!(out, "ERROR: ConsoleControl GetMode failed [{:?}]", err)?;
            return Ok(());
        }
    };
    let mode = match mode {
        ScreenMode::Text => "Text",
        ScreenMode::Graphics => "Graphics",
        ScreenMode::MaxValue => "MaxValue",
    };
    writeln!(out, "  CCP: Current screen mode: {}", mode)?;
    writeln!(out, "       Graphics support available: {}", if graphics { "Yes" } else { "No" })?;
    Ok(())
}

fn print_uga(out: &mut dyn Write, uga: &(dyn UgaDraw + '_)) -> Result<()> {
    match uga.mode() {
        Ok(mode) => {
            writeln!(out, "  UGA Horizontal Resolution: {}", mode.horizontal_resolution)?;
            writeln!(out, "      Vertical Resolution: {}", mode.vertical_resolution)?;
            writeln!(out, "      Color Depth: {}", mode.color_depth)?;
            writeln!(out, "      Refresh Rate: {}", mode.refresh_rate)?;
            writeln!(out)?;
        }
        Err(err) => writeln!(out, "ERROR: UGA GetMode failed [{:?}]", err)?,
    }
    Ok(())
}

fn print_gop(out: &mut dyn Write, gop: &(dyn Graphics + '_)) -> Result<()> {
    let max_mode = gop.max_mode();
    writeln!(out, "  GOP: {} supported graphic modes", max_mode)?;
    for mode in 0..max_mode {
        match gop.query_mode_started(mode) {
            Ok(info) => {
                let current = if mode == gop.current_mode() { '*' } else { ' ' };
                writeln!(out, "       {}{}: {}", current, mode, info)?;
            }
            Err(err) => writeln!(out, "ERROR: Bad response from QueryMode: {:?}", err)?,
        }
    }
    Ok(())
}

pub fn run(adapters: &Adapters, verbose: bool, out: &mut dyn Write) -> Result<()> {
    writeln!(out)?;
    report(out, "ConsoleControl", &adapters.ccp, verbose, print_ccp)?;
    writeln!(out)?;
    if !report(out, "UGA", &adapters.uga, verbose, print_uga)? {
        writeln!(out, "  UGA: No support found for this protocol")?;
    }
    writeln!(out)?;
    report(out, "GOP", &adapters.gop, verbose, print_gop)?;
    writeln!(out)?;
    Ok(())
}

pub fn main(rt: &Runtime, args: &[String], out: &mut dyn Write) -> Result<()> {
    let verbose = match parse(args).options(out, USAGE)? {
        Some(verbose) => verbose,
        None => return Ok(()),
    };
    let adapters = Adapters {
        ccp: rt
            .probe::<ConsoleControlProtocol>()
            .map(|ccp| ccp as &dyn ConsoleControl),
        uga: rt.probe::<UgaDrawProtocol>().map(|uga| uga as &dyn UgaDraw),
        gop: rt
            .probe::<GraphicsOutputProtocol>()
            .map(|gop| gop as &dyn Graphics),
    };
    run(&adapters, verbose, out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graphics::{BltPixel, ModeInfo, UgaMode, PIXEL_BGR_RESERVED};
    use crate::shell::tests::args;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};
    use uefi::status::Error;

    struct FakeCcp(ScreenMode);

    impl ConsoleControl for FakeCcp {
        fn mode(&self) -> core::result::Result<(ScreenMode, bool), Error> {
            Ok((self.0, true))
        }
    }

    struct FakeUga;

    impl UgaDraw for FakeUga {
        fn mode(&self) -> core::result::Result<UgaMode, Error> {
            Err(Error::Unsupported)
        }
    }

    /// An adapter with a fixed mode list that records what is drawn.
    pub(crate) struct FakeGop {
        pub(crate) modes: Vec<ModeInfo>,
        pub(crate) current: Cell<u32>,
        pub(crate) started: Cell<bool>,
        pub(crate) switches: RefCell<Vec<u32>>,
        pub(crate) drawn: RefCell<Vec<(usize, usize, usize, usize, Vec<BltPixel>)>>,
    }

    impl FakeGop {
        pub(crate) fn new(resolutions: &[(u32, u32, u32)]) -> Self {
            let modes = resolutions
                .iter()
                .map(|&(width, height, scan_line)| ModeInfo {
                    horizontal_resolution: width,
                    vertical_resolution: height,
                    pixel_format: PIXEL_BGR_RESERVED,
                    pixels_per_scan_line: scan_line,
                    ..Default::default()
                })
                .collect();
            Self {
                modes,
                current: Cell::new(0),
                started: Cell::new(true),
                switches: RefCell::default(),
                drawn: RefCell::default(),
            }
        }
    }

    impl Graphics for FakeGop {
        fn max_mode(&self) -> u32 {
            self.modes.len() as u32
        }

        fn current_mode(&self) -> u32 {
            self.current.get()
        }

        fn current_info(&self) -> Option<ModeInfo> {
            self.modes.get(self.current.get() as usize).copied()
        }

        fn query_mode(&self, mode: u32) -> core::result::Result<ModeInfo, Error> {
            if !self.started.get() {
                return Err(Error::NotStarted);
            }
            self.modes.get(mode as usize).copied().ok_or(Error::InvalidParameter)
        }

        fn set_mode(&self, mode: u32) -> core::result::Result<(), Error> {
            self.started.set(true);
            self.current.set(mode);
            self.switches.borrow_mut().push(mode);
            Ok(())
        }

        fn blt(&self, pixels: &[BltPixel], x: usize, y: usize, width: usize, height: usize) -> core::result::Result<(), Error> {
            self.drawn.borrow_mut().push((x, y, width, height, pixels.to_vec()));
            Ok(())
        }
    }

    fn none<'a, P: ?Sized>() -> Probe<'a, P> {
        Probe {
            console: None,
            located: None,
            handles: None,
        }
    }

    #[test]
    fn first_instances() {
        let ccp = FakeCcp(ScreenMode::Text);
        let gop = FakeGop::new(&[(800, 600, 800), (1024, 768, 1024)]);
        gop.current.set(1);
        let adapters = Adapters {
            ccp: Probe {
                console: Some(&ccp as &dyn ConsoleControl),
                located: Some(&ccp as &dyn ConsoleControl),
                handles: None,
            },
            uga: none(),
            gop: Probe {
                console: None,
                located: Some(&gop as &dyn Graphics),
                handles: Some(vec![&gop as &dyn Graphics]),
            },
        };
        let mut out = String::new();
        run(&adapters, false, &mut out).unwrap();
        assert_eq!(
            out,
            "\n\
             \x20 CCP: Current screen mode: Text\n\
             \x20      Graphics support available: Yes\n\
             \n\
             \x20 UGA: No support found for this protocol\n\
             \n\
             \x20 GOP: 2 supported graphic modes\n\
             \x20       0: 800x600 BGRReserved Pixels 800\n\
             \x20      *1: 1024x768 BGRReserved Pixels 1024\n\
             \n"
        );
    }

    #[test]
    fn verbose_probes() {
        let uga = FakeUga;
        let gop = FakeGop::new(&[(640, 480, 640)]);
        gop.started.set(false);
        let adapters = Adapters {
            ccp: none(),
            uga: Probe {
                console: Some(&uga as &dyn UgaDraw),
                located: None,
                handles: None,
            },
            gop: Probe {
                console: None,
                located: None,
                handles: Some(vec![&gop as &dyn Graphics, &gop as &dyn Graphics]),
            },
        };
        let mut out = String::new();
        run(&adapters, true, &mut out).unwrap();

        assert!(out.contains("No ConsoleControl handle found via HandleProtocol\n"));
        assert!(out.contains("No ConsoleControl handles found via LocateHandleBuffer\n"));
        assert!(out.contains("UGA handle found via HandleProtocol\nERROR: UGA GetMode failed [Unsupported]\n"));
        // A UGA instance exists even though it could not report a mode
        assert!(!out.contains("No support found"));
        assert!(out.contains("Found 2 GOP handle(s) via LocateHandleBuffer\n"));
        assert_eq!(out.matches("*0: 640x480").count(), 2);
        // The adapter was started once before the first query
        assert_eq!(*gop.switches.borrow(), [0]);
    }

    #[test]
    fn options() {
        assert_eq!(parse(&args("GraphicModes")), Command::Run(false));
        assert_eq!(parse(&args("GraphicModes --verbose")), Command::Run(true));
        assert_eq!(parse(&args("GraphicModes -x")), Command::Invalid);
    }
}
