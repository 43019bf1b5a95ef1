/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Frame clock types.

/// A linear T-state timestamp type, counted from the beginning of a video frame.
pub type FTs = i32;
