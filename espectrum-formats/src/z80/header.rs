/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::convert::TryFrom;
use std::io::Read;

use bitflags::bitflags;
use nom::bytes::complete::take;
use nom::combinator::{map, opt};
use nom::number::complete::{le_u16, le_u8};
use nom::sequence::tuple;
use nom::IResult;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use espectrum_core::clock::FTs;
use espectrum_core::model::Arch;
use espectrum_core::source::{ByteSource, SourceReader};
use espectrum_core::video::BorderColor;
use espectrum_core::z80emu::InterruptMode;

use crate::error::{Result, SnapshotError};
use crate::snapshot::JoystickModel;

/// The size of the classic header.
pub const HEADER_SIZE: usize = 30;
/// The extended header length of version 2 snapshots.
pub const HEADER_EX_V2_SIZE: u16 = 23;
/// The extended header length of version 3 snapshots.
pub const HEADER_EX_V3_SIZE: u16 = 54;
/// The extended header length of version 3 snapshots with the `0x1FFD` port value.
pub const HEADER_EX_V3_PORT2_SIZE: u16 = 55;
/// The end marker of the compressed memory block of version 1 snapshots.
pub const MEMORY_V1_TERM: &[u8] = &[0, 0xED, 0xED, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Z80Version { V1, V2, V3 }

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags1: u8 {
        const R_HIGH_BIT     = 0b0000_0001;
        const BORDER_COLOR   = 0b0000_1110;
        const BASIC_SAMROM   = 0b0001_0000;
        const MEM_COMPRESSED = 0b0010_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags2: u8 {
        const INTR_MODE_MASK   = 0b0000_0011;
        const ISSUE2_EMULATION = 0b0000_0100;
        const DOUBLE_INTERRUPT = 0b0000_1000;
        const VIDEO_SYNC       = 0b0011_0000;
        const JOYSTICK_MODEL   = 0b1100_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags3: u8 {
        const REG_R_EMU     = 0b0000_0001;
        const LDIR_EMU      = 0b0000_0010;
        const AY_SOUND_EMU  = 0b0000_0100;
        const AY_FULLER_BOX = 0b0100_0000;
        const ALT_HW_MODE   = 0b1000_0000;
    }
}

/// The classic 30 bytes header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub a: u8,
    pub f: u8,
    pub bc: u16,
    pub hl: u16,
    /// `0` indicates the extended header follows.
    pub pc: u16,
    pub sp: u16,
    pub i: u8,
    /// Bits 0-6 of the R register, bit 7 is in [Flags1].
    pub r7: u8,
    pub flags1: Flags1,
    pub de: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,
    pub a_alt: u8,
    pub f_alt: u8,
    pub iy: u16,
    pub ix: u16,
    pub iff1: u8,
    pub iff2: u8,
    pub flags2: Flags2,
}

/// The extended header of version 2 and 3 snapshots.
///
/// Fields of version 3 are `0` when loaded from version 2 headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderEx {
    // version 2,3
    pub pc: u16,
    pub hw_mode: u8,
    /// The last value written to the `0x7FFD` port.
    pub port1: u8,
    /// `0xFF` if the Interface 1 ROM is paged in.
    pub ifrom: u8,
    pub flags3: Flags3,
    pub ay_sel_reg: u8,
    pub ay_regs: [u8;16],
    // version 3
    pub ts_lo: u16,
    pub ts_hi: u8,
    pub flags4: u8,
    pub mgt_rom: u8,
    pub mf_rom: u8,
    pub low_rom: u8,
    pub high_rom: u8,
    pub joy_bindings: [u8;10],
    pub joy_ascii: [u8;10],
    pub mgt_type: u8,
    pub disciple1: u8,
    pub disciple2: u8,
    /// The last value written to the `0x1FFD` port, only present in 55 bytes long headers.
    pub port2: u8,
}

/// Both headers of a snapshot together with the detected format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Z80Header {
    pub version: Z80Version,
    pub header: Header,
    pub header_ex: Option<HeaderEx>,
}

impl From<u8> for Flags1 {
    fn from(mut byte: u8) -> Self {
        // some old snapshot writers stored 255 here
        if byte == u8::MAX {
            byte = 1;
        }
        Flags1::from_bits_truncate(byte)
    }
}

impl Flags1 {
    pub fn border_color(self) -> BorderColor {
        BorderColor::from_bits_truncate((self & Flags1::BORDER_COLOR).bits() >> 1)
    }

    pub fn is_mem_compressed(self) -> bool {
        self.intersects(Flags1::MEM_COMPRESSED)
    }

    pub fn mix_r(self, r: u8) -> u8 {
        (r & 0x7F) | ((self & Flags1::R_HIGH_BIT).bits() << 7)
    }
}

impl From<u8> for Flags2 {
    fn from(byte: u8) -> Self {
        Flags2::from_bits_truncate(byte)
    }
}

impl Flags2 {
    pub fn interrupt_mode(self) -> Result<InterruptMode> {
        InterruptMode::try_from((self & Flags2::INTR_MODE_MASK).bits())
        .map_err(|_| SnapshotError::MalformedHeader("invalid interrupt mode"))
    }

    pub fn is_issue2_emulation(self) -> bool {
        self.intersects(Flags2::ISSUE2_EMULATION)
    }

    pub fn is_double_interrupt(self) -> bool {
        self.intersects(Flags2::DOUBLE_INTERRUPT)
    }

    pub fn joystick_model(self) -> JoystickModel {
        match (self & Flags2::JOYSTICK_MODEL).bits() >> 6 {
            0 => JoystickModel::Cursor,
            1 => JoystickModel::Kempston,
            2 => JoystickModel::Sinclair2,
            _ => JoystickModel::Sinclair1,
        }
    }
}

impl From<u8> for Flags3 {
    fn from(byte: u8) -> Self {
        Flags3::from_bits_truncate(byte)
    }
}

impl Flags3 {
    pub fn is_ay_melodik(self) -> bool {
        self & (Flags3::AY_SOUND_EMU|Flags3::AY_FULLER_BOX) == Flags3::AY_SOUND_EMU
    }

    pub fn is_ay_fuller_box(self) -> bool {
        self.contains(Flags3::AY_SOUND_EMU|Flags3::AY_FULLER_BOX)
    }

    pub fn is_alt_hw_mode(self) -> bool {
        self.intersects(Flags3::ALT_HW_MODE)
    }
}

fn copy_array<const N: usize>(slice: &[u8]) -> [u8;N] {
    let mut array = [0u8;N];
    array.copy_from_slice(slice);
    array
}

impl Header {
    /// Decodes the classic header from the beginning of `inp`.
    pub fn parse(inp: &[u8]) -> IResult<&[u8], Header> {
        let (inp, (a, f, bc, hl, pc, sp, i, r7, flags1)) = tuple((
            le_u8, le_u8, le_u16, le_u16, le_u16, le_u16, le_u8, le_u8, map(le_u8, Flags1::from)
        ))(inp)?;
        let (inp, (de, bc_alt, de_alt, hl_alt, a_alt, f_alt)) = tuple((
            le_u16, le_u16, le_u16, le_u16, le_u8, le_u8
        ))(inp)?;
        let (inp, (iy, ix, iff1, iff2, flags2)) = tuple((
            le_u16, le_u16, le_u8, le_u8, map(le_u8, Flags2::from)
        ))(inp)?;
        Ok((inp, Header {
            a, f, bc, hl, pc, sp, i, r7, flags1,
            de, bc_alt, de_alt, hl_alt, a_alt, f_alt,
            iy, ix, iff1, iff2, flags2
        }))
    }
}

impl HeaderEx {
    /// Decodes the extended header from `inp`, which should contain exactly the number of bytes
    /// declared by the extended header length.
    pub fn parse(inp: &[u8]) -> IResult<&[u8], HeaderEx> {
        let (inp, (pc, hw_mode, port1, ifrom, flags3, ay_sel_reg, ay_regs)) = tuple((
            le_u16, le_u8, le_u8, le_u8, map(le_u8, Flags3::from), le_u8, map(take(16usize), copy_array::<16>)
        ))(inp)?;
        let mut header_ex = HeaderEx {
            pc, hw_mode, port1, ifrom, flags3, ay_sel_reg, ay_regs,
            ..HeaderEx::default()
        };
        if inp.is_empty() {
            return Ok((inp, header_ex))
        }
        let (inp, (ts_lo, ts_hi, flags4, mgt_rom, mf_rom, low_rom, high_rom)) = tuple((
            le_u16, le_u8, le_u8, le_u8, le_u8, le_u8, le_u8
        ))(inp)?;
        let (inp, (joy_bindings, joy_ascii, mgt_type, disciple1, disciple2, port2)) = tuple((
            map(take(10usize), copy_array::<10>), map(take(10usize), copy_array::<10>),
            le_u8, le_u8, le_u8, opt(le_u8)
        ))(inp)?;
        header_ex.ts_lo = ts_lo;
        header_ex.ts_hi = ts_hi;
        header_ex.flags4 = flags4;
        header_ex.mgt_rom = mgt_rom;
        header_ex.mf_rom = mf_rom;
        header_ex.low_rom = low_rom;
        header_ex.high_rom = high_rom;
        header_ex.joy_bindings = joy_bindings;
        header_ex.joy_ascii = joy_ascii;
        header_ex.mgt_type = mgt_type;
        header_ex.disciple1 = disciple1;
        header_ex.disciple2 = disciple2;
        header_ex.port2 = port2.unwrap_or(0);
        Ok((inp, header_ex))
    }
}

impl Z80Header {
    /// Returns the actual program counter.
    pub fn pc(&self) -> u16 {
        match self.header_ex {
            Some(ref header_ex) => header_ex.pc,
            None => self.header.pc
        }
    }
}

/// Converts the T-state counter of version 3 headers into the frame T-state of the given model.
pub fn z80_to_cycles(ts_lo: u16, ts_hi: u8, arch: Arch) -> FTs {
    let total_ts = arch.frame_tstates();
    let qts = total_ts / 4;
    let qcountdown = ts_lo as FTs;
    (((ts_hi.wrapping_add(1)) % 4 + 1) as FTs * qts - (qcountdown + 1))
    .rem_euclid(total_ts)
}

/// Reads the classic header and the extended header if one is present.
///
/// Only the header bytes are consumed from the source.
pub fn read_header<S: ByteSource + ?Sized>(rd: &mut SourceReader<'_, S>) -> Result<Z80Header> {
    let mut buf = [0u8;HEADER_SIZE];
    rd.read_exact(&mut buf).map_err(|e|
        SnapshotError::from_header_read(e, "source shorter than the header")
    )?;
    let (_, header) = Header::parse(&buf).map_err(|_|
        SnapshotError::MalformedHeader("invalid header")
    )?;
    if header.pc != 0 {
        return Ok(Z80Header { version: Z80Version::V1, header, header_ex: None })
    }

    let mut length = [0u8;2];
    rd.read_exact(&mut length).map_err(|e|
        SnapshotError::from_header_read(e, "missing extended header length")
    )?;
    let length = u16::from_le_bytes(length);
    let version = match length {
        HEADER_EX_V2_SIZE => Z80Version::V2,
        HEADER_EX_V3_SIZE|HEADER_EX_V3_PORT2_SIZE => Z80Version::V3,
        _ => return Err(SnapshotError::MalformedHeader("invalid extended header length"))
    };
    if u64::from(length) > rd.remaining() {
        return Err(SnapshotError::MalformedHeader("extended header exceeds the source size"))
    }
    let mut buf = vec![0u8;length as usize];
    rd.read_exact(&mut buf).map_err(|e|
        SnapshotError::from_header_read(e, "truncated extended header")
    )?;
    let (_, header_ex) = HeaderEx::parse(&buf).map_err(|_|
        SnapshotError::MalformedHeader("invalid extended header")
    )?;
    trace!("z80 {:?} extended header: {:?}", version, header_ex);
    Ok(Z80Header { version, header, header_ex: Some(header_ex) })
}

#[cfg(test)]
pub(crate) fn cycles_to_z80(ts: FTs, arch: Arch) -> (u16, u8) {
    let total_ts = arch.frame_tstates();
    let qts = total_ts / 4;
    let ts_lo = (qts - (ts.rem_euclid(qts)) - 1) as u16;
    let ts_hi = (ts.rem_euclid(total_ts) / qts - 1).rem_euclid(4) as u8;
    (ts_lo, ts_hi)
}
