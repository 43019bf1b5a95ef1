/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Common snapshot utilities and the machine state interface the loaders write into.
use core::fmt;
use bitflags::bitflags;

use espectrum_core::clock::FTs;
use espectrum_core::memory::MemoryError;
use espectrum_core::model::Arch;
use espectrum_core::video::BorderColor;
use espectrum_core::z80emu::Z80NMOS;

bitflags! {
    /// Peripherals attached to the snapshot's machine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Extensions: u8 {
        const IF1      = 0b0000_0001;
        const PLUS_D   = 0b0000_0010;
        const DISCIPLE = 0b0000_0100;
        const SAM_RAM  = 0b0000_1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoystickModel {
    Kempston,
    Sinclair1,
    Sinclair2,
    Cursor,
}

/// The kind of the AY-3-891x sound processor the snapshot's registers should be restored into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ay3_891xDevice {
    /// The device attached to one of the 128k/+2/+3 models.
    Ay128k,
    /// The device attached to one of the 16k/48k models with the same port mappings as 128k version.
    Melodik,
    /// The Fuller Box port mapped AY chipset.
    FullerBox,
}

/// Snapshot settings that are not part of the CPU or the memory, echoed into the machine state.
///
/// The loader does not interpret these, it's up to the machine to decide what to make of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotFeatures {
    pub extensions: Extensions,
    pub joystick: Option<JoystickModel>,
    /// The keyboard issue 2 emulation is requested.
    pub issue2: bool,
    /// The interrupts should be generated twice per frame.
    pub double_interrupt: bool,
    /// The Interface 1 ROM is paged in.
    pub if1_rom_paged: bool,
    /// The R register emulation is turned on.
    pub r_emulation: bool,
    /// The LDIR emulation is turned on.
    pub ldir_emulation: bool,
}

/// Implement this trait to be able to load snapshots into an emulated machine.
///
/// All methods are called only after the snapshot header has been fully parsed and its model
/// resolved. The [MachineState::request_profile] method, if called at all, is always being
/// called last.
pub trait MachineState {
    /// The error type returned by the [MachineState::request_profile] method.
    type Error: Into<Box<(dyn std::error::Error + Send + Sync + 'static)>>;
    /// Should replace the CPU registers with the given `cpu`.
    ///
    /// This method should not fail.
    fn assign_cpu(&mut self, cpu: Z80NMOS);
    /// Should replace the whole content of the physical RAM `bank` with `data`.
    ///
    /// The bank must not be modified if an error is returned.
    fn write_bank(&mut self, bank: usize, data: &[u8]) -> Result<(), MemoryError>;
    /// Should emulate sending the `data` to the given `port` of the main chipset.
    ///
    /// This method should not fail.
    fn write_port(&mut self, port: u16, data: u8);
    /// Should set the border to the given `color`.
    fn set_border_color(&mut self, color: BorderColor);
    /// Should set the frame T-states clock to the value given in `tstates`.
    ///
    /// Default implementation does nothing.
    fn set_clock(&mut self, _tstates: FTs) {}
    /// Should store the snapshot's additional settings.
    ///
    /// Default implementation does nothing.
    fn set_features(&mut self, _features: &SnapshotFeatures) {}
    /// Should initialize the AY-3-891x sound processor of the given kind, if one is available.
    ///
    /// Default implementation does nothing.
    fn setup_ay(&mut self, _choice: Ay3_891xDevice, _reg_selected: u8, _reg_values: &[u8;16]) {}
    /// Should switch the running machine to the given `arch`.
    ///
    /// Called once, after all the memory and registers have been restored, and only if the
    /// snapshot's model differs from the currently running one.
    fn request_profile(&mut self, arch: Arch) -> Result<(), Self::Error>;
}

impl fmt::Display for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intersects(Extensions::IF1) {
            f.write_str(" + IF1")?;
        }
        if self.intersects(Extensions::PLUS_D) {
            f.write_str(" + MGT+D")?;
        }
        if self.intersects(Extensions::DISCIPLE) {
            f.write_str(" + DISCiPLE")?;
        }
        if self.intersects(Extensions::SAM_RAM) {
            f.write_str(" + SamRam")?;
        }
        Ok(())
    }
}

impl From<JoystickModel> for &str {
    fn from(joy: JoystickModel) -> Self {
        match joy {
            JoystickModel::Kempston  => "Kempston",
            JoystickModel::Sinclair1 => "Sinclair #1",
            JoystickModel::Sinclair2 => "Sinclair #2",
            JoystickModel::Cursor    => "Cursor",
        }
    }
}

impl fmt::Display for JoystickModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(<&str>::from(*self))
    }
}
