/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! The emulated machine state.
use core::fmt;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use espectrum_core::clock::FTs;
use espectrum_core::memory::{MemoryError, RamBanks, BankArray};
use espectrum_core::model::{Arch, HardwareConfig, MachineSettings};
use espectrum_core::video::BorderColor;
use espectrum_core::z80emu::Z80NMOS;
use espectrum_formats::snapshot::{
    MachineState, SnapshotFeatures, Extensions, Ay3_891xDevice
};

/// The memory paging port of the 128k models.
pub const MEM_PORT: u16 = 0x7ffd;
/// The additional memory paging port of the +2A/+3 models.
pub const PLUS3_PORT: u16 = 0x1ffd;

/// Returned when the machine can't switch to the requested model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwitchError {
    pub arch: Arch,
    pub ram_banks: usize,
}

impl std::error::Error for SwitchError {}

impl fmt::Display for SwitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires {} RAM banks, the hardware provides only {}",
                self.arch, self.arch.ram_banks(), self.ram_banks)
    }
}

/// The state of the AY-3-891x sound processor registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AyState {
    pub device: Ay3_891xDevice,
    pub selected: u8,
    pub regs: [u8;16],
}

/// The state of the emulated ZX Spectrum.
///
/// The instruction execution and the peripherals are driven by the host firmware, this struct
/// only holds what they operate on.
#[derive(Clone, Debug)]
pub struct Spectrum {
    pub cpu: Z80NMOS,
    memory: RamBanks,
    arch: Arch,
    hardware: HardwareConfig,
    border: BorderColor,
    mem_port: u8,
    plus3_port: u8,
    tstates: FTs,
    features: SnapshotFeatures,
    ay: Option<AyState>,
}

impl Spectrum {
    /// Creates a machine in its power-on state from the given `settings`.
    pub fn new(settings: &MachineSettings) -> Self {
        Spectrum {
            cpu: Z80NMOS::default(),
            memory: RamBanks::new(),
            arch: settings.arch,
            hardware: settings.hardware,
            border: BorderColor::WHITE,
            mem_port: 0,
            plus3_port: 0,
            tstates: 0,
            features: SnapshotFeatures::default(),
            ay: None
        }
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn hardware(&self) -> &HardwareConfig {
        &self.hardware
    }

    pub fn memory_ref(&self) -> &RamBanks {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut RamBanks {
        &mut self.memory
    }
    /// Returns a reference to the RAM bank with the given index.
    pub fn bank_ref(&self, bank: usize) -> Result<&BankArray, MemoryError> {
        self.memory.bank_ref(bank)
    }

    pub fn border_color(&self) -> BorderColor {
        self.border
    }
    /// Returns the last value written to the `0x7FFD` port.
    pub fn mem_port_value(&self) -> u8 {
        self.mem_port
    }
    /// Returns the last value written to the `0x1FFD` port.
    pub fn plus3_port_value(&self) -> u8 {
        self.plus3_port
    }
    /// Returns the RAM bank paged in at `0xC000`.
    pub fn paged_bank(&self) -> usize {
        if self.arch.is_banked() {
            (self.mem_port & 0b111) as usize
        }
        else {
            0
        }
    }

    pub fn current_tstate(&self) -> FTs {
        self.tstates
    }

    pub fn features(&self) -> &SnapshotFeatures {
        &self.features
    }

    pub fn ay_state(&self) -> Option<&AyState> {
        self.ay.as_ref()
    }
}

impl MachineState for Spectrum {
    type Error = SwitchError;

    fn assign_cpu(&mut self, cpu: Z80NMOS) {
        self.cpu = cpu;
    }

    fn write_bank(&mut self, bank: usize, data: &[u8]) -> Result<(), MemoryError> {
        self.memory.write_bank(bank, data)
    }

    fn write_port(&mut self, port: u16, data: u8) {
        match port {
            MEM_PORT => self.mem_port = data,
            PLUS3_PORT => self.plus3_port = data,
            _ => warn!("port: {:04x} is not emulated, ignoring: {:02x}", port, data)
        }
    }

    fn set_border_color(&mut self, color: BorderColor) {
        self.border = color;
    }

    fn set_clock(&mut self, tstates: FTs) {
        self.tstates = tstates;
    }

    fn set_features(&mut self, features: &SnapshotFeatures) {
        if !features.extensions.is_empty() {
            warn!("The extensions:{} are not supported\n\
                    this may result in an undefined behaviour of the emulated computer",
                    features.extensions);
        }
        if features.extensions.intersects(Extensions::IF1) && features.if1_rom_paged {
            warn!("Interface 1 ROM is paged in, but there is no Interface 1");
        }
        self.features = *features;
    }

    fn setup_ay(&mut self, device: Ay3_891xDevice, selected: u8, regs: &[u8;16]) {
        debug!("AY {:?} selected: {}", device, selected);
        self.ay = Some(AyState { device, selected, regs: *regs });
    }

    fn request_profile(&mut self, arch: Arch) -> Result<(), SwitchError> {
        if !self.hardware.supports(arch) {
            return Err(SwitchError { arch, ram_banks: self.hardware.ram_banks })
        }
        info!("machine switched: {} -> {}", self.arch, arch);
        self.arch = arch;
        Ok(())
    }
}
