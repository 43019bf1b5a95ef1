/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Memory API.
//!
//! The RAM of every supported model is an arena of 16 KiB banks addressed by the physical bank
//! index. The 16k/48k models use banks 5, 2 and 0 of the same arena, which is the layout they
//! would have when mapped at `0x4000`, `0x8000` and `0xC000` of a 128k machine with paging
//! register set to `0`.
use core::fmt;
use std::io::{self, Read};

pub const MEM16K_SIZE : usize = 0x4000;
pub const MEM48K_SIZE : usize = 3 * MEM16K_SIZE;
pub const MEM128K_SIZE: usize = 8 * MEM16K_SIZE;

/// The size of a single memory bank.
pub const PAGE_SIZE: usize = MEM16K_SIZE;
/// The number of RAM banks in the arena.
pub const RAM_BANKS_MAX: usize = MEM128K_SIZE / PAGE_SIZE;

/// A single RAM bank.
pub type BankArray = [u8;PAGE_SIZE];

#[non_exhaustive]
#[derive(Debug)]
pub enum MemoryError {
    InvalidBankIndex(usize),
    InvalidBankSize(usize),
    Io(io::Error)
}

impl std::error::Error for MemoryError {}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::InvalidBankIndex(bank) => write!(f, "Memory bank index {} is out of range", bank),
            MemoryError::InvalidBankSize(size) => write!(f,
                "Memory bank data size {} does not match the bank size {}", size, PAGE_SIZE),
            MemoryError::Io(err) => fmt::Display::fmt(err, f)
        }
    }
}

impl From<MemoryError> for io::Error {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Io(err) => err,
            e => io::Error::new(io::ErrorKind::InvalidInput, e)
        }
    }
}

/// A type returned by some of [RamBanks] methods.
pub type Result<T> = core::result::Result<T, MemoryError>;

/// An arena of fixed-size RAM banks indexed by the physical bank number.
#[derive(Clone)]
pub struct RamBanks {
    banks: Box<[BankArray]>
}

impl Default for RamBanks {
    fn default() -> Self {
        RamBanks::new()
    }
}

impl fmt::Debug for RamBanks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RamBanks")
         .field("banks", &self.banks.len())
         .finish()
    }
}

impl RamBanks {
    /// Creates an arena of [RAM_BANKS_MAX] zeroed banks.
    pub fn new() -> Self {
        let banks = vec![[0u8;PAGE_SIZE];RAM_BANKS_MAX].into_boxed_slice();
        RamBanks { banks }
    }
    /// Returns the number of banks in the arena.
    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    pub fn bank_ref(&self, bank: usize) -> Result<&BankArray> {
        self.banks.get(bank).ok_or(MemoryError::InvalidBankIndex(bank))
    }

    pub fn bank_mut(&mut self, bank: usize) -> Result<&mut BankArray> {
        self.banks.get_mut(bank).ok_or(MemoryError::InvalidBankIndex(bank))
    }
    /// Replaces the whole content of the `bank` with `data`.
    ///
    /// The `data` must be exactly [PAGE_SIZE] bytes long, otherwise the bank is left untouched
    /// and an error is returned.
    pub fn write_bank(&mut self, bank: usize, data: &[u8]) -> Result<()> {
        if data.len() != PAGE_SIZE {
            return Err(MemoryError::InvalidBankSize(data.len()))
        }
        self.bank_mut(bank)?.copy_from_slice(data);
        Ok(())
    }
    /// Reads exactly [PAGE_SIZE] bytes from `rd` into the `bank`.
    ///
    /// The bank is only modified if the whole page could be read.
    pub fn load_into_bank<R: Read>(&mut self, bank: usize, mut rd: R) -> Result<()> {
        let mut page = [0u8;PAGE_SIZE];
        rd.read_exact(&mut page).map_err(MemoryError::Io)?;
        *self.bank_mut(bank)? = page;
        Ok(())
    }
    /// Fills all banks with the data produced by the closure `f`.
    ///
    /// Usefull to fill RAM with random bytes.
    pub fn fill_with<F: FnMut() -> u8>(&mut self, mut f: F) {
        for p in self.banks.iter_mut().flat_map(|bank| bank.iter_mut()) {
            *p = f()
        }
    }
    /// Iterates over all banks in the order of bank indexes.
    pub fn iter(&self) -> impl Iterator<Item=&BankArray> {
        self.banks.iter()
    }
}
