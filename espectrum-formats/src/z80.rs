/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! **Z80** snapshot format utilities.
//!
//! A snapshot is loaded in a single pass:
//!
//! * the classic header and, if the program counter found there is `0`, the extended header
//!   are read and decoded,
//! * the machine profile is resolved from the hardware mode and the header version,
//! * memory blocks are decompressed one page at a time and written into the RAM banks,
//! * the registers, border, paging and the remaining settings are applied last.
//!
//! See [load_z80].
mod decompress;
mod header;
mod loader;
mod profile;
#[cfg(test)]
pub(crate) mod compress;

pub use decompress::*;
pub use header::*;
pub use loader::*;
pub use profile::*;
