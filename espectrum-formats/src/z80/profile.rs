/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::fmt;

use espectrum_core::memory::PAGE_SIZE;
use espectrum_core::model::{Arch, MachineSettings};

use crate::error::{Result, SnapshotError};
use crate::snapshot::Extensions;

use super::header::{HeaderEx, Z80Header, Z80Version};

// (page id, RAM bank)
const PAGES_16K: &[(u8, usize)] = &[(8, 5)];
const PAGES_48K: &[(u8, usize)] = &[(8, 5), (4, 2), (5, 0)];
const PAGES_128K: &[(u8, usize)] = &[
    (3, 0), (4, 1), (5, 2), (6, 3), (7, 4), (8, 5), (9, 6), (10, 7)
];
// ROM images and the RAM of peripherals the emulator does not have
const ABSENT_16K: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7, 11];
const ABSENT_48K: &[u8] = &[0, 1, 2, 3, 6, 7, 11];
const ABSENT_128K: &[u8] = &[0, 1, 2, 11];

/// Where the memory block of a page id should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    /// Into the RAM bank with the given index.
    Bank(usize),
    /// The page is valid for the format but the hardware class has no such memory, so it's skipped.
    Absent,
}

/// The memory layout of the snapshot's machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineProfile {
    arch: Arch,
}

/// The outcome of the model resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub profile: MachineProfile,
    pub extensions: Extensions,
    /// The snapshot's model differs from the running one.
    pub switch_required: bool,
}

impl MachineProfile {
    /// The size of every memory page.
    pub const PAGE_SIZE: usize = PAGE_SIZE;

    pub fn new(arch: Arch) -> Self {
        MachineProfile { arch }
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn name(&self) -> &'static str {
        self.arch.config_name()
    }
    /// Returns the number of RAM pages of the model.
    pub fn page_count(&self) -> usize {
        self.arch.ram_banks()
    }
    /// Returns the page id to the RAM bank mapping in the order the pages are laid out in the
    /// 16k/48k address space, or in the order of banks for the banked models.
    pub fn page_map(&self) -> &'static [(u8, usize)] {
        match self.arch {
            Arch::Spectrum16 => PAGES_16K,
            Arch::Spectrum48 => PAGES_48K,
            Arch::Spectrum128|Arch::SpectrumPlus2|
            Arch::SpectrumPlus2A|Arch::SpectrumPlus3 => PAGES_128K
        }
    }
    /// Returns page ids that are skipped by the loader.
    pub fn absent_pages(&self) -> &'static [u8] {
        match self.arch {
            Arch::Spectrum16 => ABSENT_16K,
            Arch::Spectrum48 => ABSENT_48K,
            Arch::Spectrum128|Arch::SpectrumPlus2|
            Arch::SpectrumPlus2A|Arch::SpectrumPlus3 => ABSENT_128K
        }
    }
    /// Looks up the `page` id. Returns `None` if the page id is not valid for the model.
    pub fn page_slot(&self, page: u8) -> Option<PageSlot> {
        if let Some(&(_, bank)) = self.page_map().iter().find(|&&(id, _)| id == page) {
            Some(PageSlot::Bank(bank))
        }
        else if self.absent_pages().contains(&page) {
            Some(PageSlot::Absent)
        }
        else {
            None
        }
    }
}

impl fmt::Display for MachineProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.arch, f)
    }
}

// If bit 7 of byte 37 is set, the hardware types are modified slightly: any 48K machine becomes a 16K machine,
// any 128K machines becomes a +2 and any +3 machine becomes a +2A.
fn select_hw_model(version: Z80Version, head_ex: &HeaderEx) -> Option<(Arch, Extensions)> {
    let hw_mode = head_ex.hw_mode;
    let alt_hw = head_ex.flags3.is_alt_hw_mode();
    let mgt_type = head_ex.mgt_type;
    use Arch::*;
    use Z80Version::*;
    Some(match (hw_mode, version) {
        (0, _) if alt_hw => (Spectrum16, Extensions::empty()),
        (0, _) => (Spectrum48, Extensions::empty()),
        (1, _) if alt_hw => (Spectrum16, Extensions::IF1),
        (1, _) => (Spectrum48, Extensions::IF1),
        (2, _) => (Spectrum48, Extensions::SAM_RAM),
        (3, V2)|(4, V3) if alt_hw => (SpectrumPlus2, Extensions::empty()),
        (3, V2)|(4, V3) => (Spectrum128, Extensions::empty()),
        (3, V3) if alt_hw && mgt_type == 16 => (Spectrum16, Extensions::PLUS_D),
        (3, V3) if alt_hw && mgt_type <= 1 => (Spectrum16, Extensions::DISCIPLE),
        (3, V3) if mgt_type == 16 => (Spectrum48, Extensions::PLUS_D),
        (3, V3) if mgt_type <= 1 => (Spectrum48, Extensions::DISCIPLE),
        (4, V2)|(5, V3) => (Spectrum128, Extensions::IF1),
        (6, V3) if mgt_type == 16 => (Spectrum128, Extensions::PLUS_D),
        (6, V3) if mgt_type <= 1 => (Spectrum128, Extensions::DISCIPLE),
        (7, _)|(8, _) if alt_hw => (SpectrumPlus2A, Extensions::empty()),
        (7, _)|(8, _) => (SpectrumPlus3, Extensions::empty()),
        (12, _) => (SpectrumPlus2, Extensions::empty()),
        (13, _) => (SpectrumPlus2A, Extensions::empty()),
        _ => return None
    })
}

/// Resolves the machine profile of the snapshot from its headers.
///
/// Fails with [SnapshotError::UnsupportedModel] if the hardware mode is unknown and with
/// [SnapshotError::InsufficientMemory] if the host hardware can't provide enough RAM banks.
pub fn resolve(header: &Z80Header, settings: &MachineSettings) -> Result<Resolution> {
    let (arch, extensions) = match header.header_ex {
        Some(ref head_ex) => select_hw_model(header.version, head_ex).ok_or(
            SnapshotError::UnsupportedModel { version: header.version, hw_mode: head_ex.hw_mode }
        )?,
        None => (Arch::Spectrum48, Extensions::empty())
    };
    let profile = MachineProfile::new(arch);
    let required = profile.page_count();
    let available = settings.hardware.ram_banks;
    if required > available {
        return Err(SnapshotError::InsufficientMemory { arch, required, available })
    }
    Ok(Resolution {
        profile,
        extensions,
        switch_required: arch != settings.arch
    })
}
