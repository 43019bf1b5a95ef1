/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Video related types.
use core::convert::TryFrom;
use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Bitflags defining ZX Spectrum's border colors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BorderColor: u8 {
        const BLACK   = 0b000;
        const BLUE    = 0b001;
        const RED     = 0b010;
        const MAGENTA = 0b011;
        const GREEN   = 0b100;
        const CYAN    = 0b101;
        const YELLOW  = 0b110;
        const WHITE   = 0b111;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryFromU8BorderColorError(pub u8);

impl std::error::Error for TryFromU8BorderColorError {}

impl fmt::Display for TryFromU8BorderColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converted integer ({}) out of range for `BorderColor`", self.0)
    }
}

impl TryFrom<u8> for BorderColor {
    type Error = TryFromU8BorderColorError;
    fn try_from(color: u8) -> core::result::Result<Self, Self::Error> {
        BorderColor::from_bits(color).ok_or(TryFromU8BorderColorError(color))
    }
}

impl From<BorderColor> for u8 {
    #[inline]
    fn from(color: BorderColor) -> u8 {
        color.bits()
    }
}
