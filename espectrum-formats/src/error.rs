/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::fmt;
use std::error::Error;
use std::io;

use espectrum_core::memory::MemoryError;
use espectrum_core::model::Arch;

use crate::z80::Z80Version;

/// A type returned by the snapshot loaders.
pub type Result<T> = core::result::Result<T, SnapshotError>;

/// The reason of a failed snapshot load.
///
/// Every error is fatal to the load in progress. Once an error is returned the state of
/// the machine that the snapshot was being loaded into is unspecified.
#[non_exhaustive]
#[derive(Debug)]
pub enum SnapshotError {
    /// The source is shorter than the header or the header is inconsistent.
    MalformedHeader(&'static str),
    /// The hardware model byte is not known for the given format version.
    UnsupportedModel { version: Z80Version, hw_mode: u8 },
    /// The snapshot requires more RAM banks than the host hardware can provide.
    InsufficientMemory { arch: Arch, required: usize, available: usize },
    /// A memory block ended before a whole page could be decoded.
    ///
    /// `page` is `None` for the single memory block of version 1 snapshots.
    TruncatedBlock { page: Option<u8> },
    /// A memory block decodes to more than a page of data.
    OverrunBlock { page: Option<u8> },
    /// A memory block's page id is not valid for the machine.
    InvalidPageId { page: u8, arch: Arch },
    /// The machine refused to switch to the snapshot's architecture.
    ProfileSwitchFailed(Box<dyn Error + Send + Sync>),
    /// The machine rejected a memory bank write.
    Memory(MemoryError),
    /// Reading from the source failed.
    Io(io::Error)
}

struct BlockName(Option<u8>);

impl fmt::Display for BlockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(page) => write!(f, "memory block of page {}", page),
            None => f.write_str("48k memory block")
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SnapshotError::ProfileSwitchFailed(err) => Some(err.as_ref()),
            SnapshotError::Memory(err) => Some(err),
            SnapshotError::Io(err) => Some(err),
            _ => None
        }
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SnapshotError::*;
        match self {
            MalformedHeader(reason) => write!(f, "malformed header: {}", reason),
            UnsupportedModel { version, hw_mode } => write!(f,
                "unsupported model: hardware mode {} in a {:?} snapshot", hw_mode, version),
            InsufficientMemory { arch, required, available } => write!(f,
                "insufficient memory: {} requires {} RAM banks, only {} available",
                arch, required, available),
            TruncatedBlock { page } => write!(f, "truncated {}", BlockName(*page)),
            OverrunBlock { page } => write!(f, "{} exceeds the page size", BlockName(*page)),
            InvalidPageId { page, arch } => write!(f, "invalid memory page {} for {}", page, arch),
            ProfileSwitchFailed(err) => write!(f, "machine switch failed: {}", err),
            Memory(err) => fmt::Display::fmt(err, f),
            Io(err) => fmt::Display::fmt(err, f)
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(err: io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl From<MemoryError> for SnapshotError {
    fn from(err: MemoryError) -> Self {
        SnapshotError::Memory(err)
    }
}

impl From<SnapshotError> for io::Error {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Io(err) => err,
            e => io::Error::new(io::ErrorKind::InvalidData, e)
        }
    }
}

impl SnapshotError {
    /// Maps a failed header read, an early end of the source means a malformed header.
    pub(crate) fn from_header_read(err: io::Error, reason: &'static str) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => SnapshotError::MalformedHeader(reason),
            _ => SnapshotError::Io(err)
        }
    }
    /// Maps a failed memory block read, an early end of the source means a truncated block.
    pub(crate) fn from_block_read(err: io::Error, page: Option<u8>) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => SnapshotError::TruncatedBlock { page },
            _ => SnapshotError::Io(err)
        }
    }
}
