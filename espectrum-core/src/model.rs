/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Emulated machine models and host machine settings.
use core::fmt;
use core::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::clock::FTs;
use crate::memory::RAM_BANKS_MAX;

/// An enum of the machine architectures the emulator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "16K")]
    Spectrum16,
    #[serde(rename = "48K")]
    Spectrum48,
    #[serde(rename = "128K")]
    Spectrum128,
    #[serde(rename = "+2")]
    SpectrumPlus2,
    #[serde(rename = "+2A")]
    SpectrumPlus2A,
    #[serde(rename = "+3")]
    SpectrumPlus3,
}

/// Describes what the host hardware is able to provide for the emulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// The number of 16 KiB RAM banks the host can back with real memory.
    pub ram_banks: usize,
}

/// The machine-wide settings, usually read from the boot configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// The currently running machine architecture.
    pub arch: Arch,
    /// The name of the ROM set to be used with `arch`.
    pub romset: String,
    pub hardware: HardwareConfig,
}

impl Default for Arch {
    fn default() -> Self {
        Arch::Spectrum128
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig { ram_banks: RAM_BANKS_MAX }
    }
}

impl Default for MachineSettings {
    fn default() -> Self {
        MachineSettings {
            arch: Arch::default(),
            romset: String::from("SINCLAIR"),
            hardware: HardwareConfig::default()
        }
    }
}

impl HardwareConfig {
    /// Returns the configuration of a host without external RAM, able to run 48k models only.
    pub fn without_extra_ram() -> Self {
        HardwareConfig { ram_banks: Arch::Spectrum48.ram_banks() }
    }
    /// Returns `true` if the host can provide enough memory to run the `arch`.
    pub fn supports(&self, arch: Arch) -> bool {
        arch.ram_banks() <= self.ram_banks
    }
}

impl MachineSettings {
    pub fn new(arch: Arch, hardware: HardwareConfig) -> Self {
        MachineSettings { arch, hardware, ..MachineSettings::default() }
    }
}

impl Arch {
    /// Returns the number of RAM banks present in the model.
    pub fn ram_banks(self) -> usize {
        use Arch::*;
        match self {
            Spectrum16 => 1,
            Spectrum48 => 3,
            Spectrum128|SpectrumPlus2|
            SpectrumPlus2A|SpectrumPlus3 => 8
        }
    }
    /// Returns `true` if the model has a memory paging register at port `0x7FFD`.
    pub fn is_banked(self) -> bool {
        !matches!(self, Arch::Spectrum16|Arch::Spectrum48)
    }
    /// Returns `true` if the model has an additional paging register at port `0x1FFD`.
    pub fn has_plus3_paging(self) -> bool {
        matches!(self, Arch::SpectrumPlus2A|Arch::SpectrumPlus3)
    }
    /// Returns `true` if the model has a built-in AY-3-8912 sound processor.
    pub fn has_ay(self) -> bool {
        self.is_banked()
    }
    /// Returns the number of T-states per single frame.
    pub fn frame_tstates(self) -> FTs {
        if self.is_banked() {
            70908
        }
        else {
            69888
        }
    }
    /// Returns the name of the model as used in the settings.
    pub fn config_name(self) -> &'static str {
        use Arch::*;
        match self {
            Spectrum16     => "16K",
            Spectrum48     => "48K",
            Spectrum128    => "128K",
            SpectrumPlus2  => "+2",
            SpectrumPlus2A => "+2A",
            SpectrumPlus3  => "+3",
        }
    }
}

impl From<Arch> for &str {
    fn from(arch: Arch) -> Self {
        use Arch::*;
        match arch {
            Spectrum16     => "ZX Spectrum 16k",
            Spectrum48     => "ZX Spectrum 48k",
            Spectrum128    => "ZX Spectrum 128k",
            SpectrumPlus2  => "ZX Spectrum +2",
            SpectrumPlus2A => "ZX Spectrum +2A",
            SpectrumPlus3  => "ZX Spectrum +3",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(<&str>::from(*self))
    }
}

impl FromStr for Arch {
    type Err = &'static str;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        use Arch::*;
        Ok(match name.trim() {
            "16K"|"16k"   => Spectrum16,
            "48K"|"48k"   => Spectrum48,
            "128K"|"128k" => Spectrum128,
            "+2"          => SpectrumPlus2,
            "+2A"|"+2a"   => SpectrumPlus2A,
            "+3"          => SpectrumPlus3,
            _ => return Err("Unrecognized machine architecture")
        })
    }
}
