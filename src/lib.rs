/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    ESPECTRUM is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    ESPECTRUM is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
//! ESPECTRUM restores the state of an emulated ZX Spectrum from **Z80** snapshot files.
//!
//! The library is split into the following crates re-exported here:
//!
//! * `espectrum-core` with memory banks, machine models and byte sources, see [memory], [model]
//!   and [source],
//! * `espectrum-formats` as [formats] with the snapshot parser and loader.
//!
//! This crate adds the [Spectrum][machine::Spectrum] machine state, which the snapshots are
//! loaded into, and the [session] functions that wrap a single load with input suspension and
//! error reporting.
//!
//! ```no_run
//! use espectrum::machine::Spectrum;
//! use espectrum::model::MachineSettings;
//! use espectrum::session::{load_snapshot_file, NoInput};
//!
//! let mut settings = MachineSettings::default();
//! let mut spectrum = Spectrum::new(&settings);
//! let res = load_snapshot_file("games/manic.z80", &mut settings, &mut spectrum, &mut NoInput)
//!           .expect("a valid snapshot");
//! println!("loaded: {}", res.profile);
//! ```
pub mod machine;
pub mod session;

pub use espectrum_formats as formats;

pub use espectrum_core::{clock, memory, model, source, video};
pub use espectrum_core::z80emu;
