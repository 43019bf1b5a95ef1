/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
use core::fmt;
use std::io::Read;

use memchr::memchr;

use crate::ReadExactEx;
use crate::error::{Result, SnapshotError};

use super::header::MEMORY_V1_TERM;

/// The block length indicating the block data is not compressed.
pub const BLOCK_UNCOMPRESSED: u16 = u16::MAX;

/// The reason of a failed decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressError {
    /// The compressed data ended before the output buffer has been filled.
    Truncated,
    /// The compressed data expands past the end of the output buffer.
    Overrun,
}

impl std::error::Error for DecompressError {}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecompressError::Truncated => "compressed data too short",
            DecompressError::Overrun => "compressed data too long"
        })
    }
}

impl DecompressError {
    pub fn into_snapshot_error(self, page: Option<u8>) -> SnapshotError {
        match self {
            DecompressError::Truncated => SnapshotError::TruncatedBlock { page },
            DecompressError::Overrun => SnapshotError::OverrunBlock { page },
        }
    }
}

// Returns the length of the literal data at the beginning of `data` up to the
// first `ED ED` pair. `data` must not start with `ED ED`.
fn literal_span(data: &[u8]) -> usize {
    let mut index = 0;
    loop {
        match memchr(0xED, &data[index..]) {
            Some(found) => {
                let pos = index + found;
                if let Some(0xED) = data.get(pos + 1) {
                    return pos
                }
                index = pos + 1;
            }
            None => return data.len()
        }
    }
}

/// Expands the run-length encoded `src` into `dst`.
///
/// `ED ED nn bb` expands to `nn` bytes of `bb`, any other byte is copied as is.
/// The whole `src` must be consumed and `dst` must be filled exactly.
///
/// An `ED ED` pair at the very end of `src` without its count and fill bytes is reported as
/// [DecompressError::Truncated].
pub fn decompress_into(mut src: &[u8], dst: &mut [u8]) -> core::result::Result<(), DecompressError> {
    let mut index = 0;
    while !src.is_empty() {
        match src {
            [0xED, 0xED, count, fill, rest @ ..] => {
                let end = index + *count as usize;
                let target = dst.get_mut(index..end).ok_or(DecompressError::Overrun)?;
                for p in target.iter_mut() {
                    *p = *fill;
                }
                index = end;
                src = rest;
            }
            [0xED, 0xED, ..] => return Err(DecompressError::Truncated),
            _ => {
                let len = literal_span(src);
                let end = index + len;
                let target = dst.get_mut(index..end).ok_or(DecompressError::Overrun)?;
                target.copy_from_slice(&src[..len]);
                index = end;
                src = &src[len..];
            }
        }
    }
    if index == dst.len() {
        Ok(())
    }
    else {
        Err(DecompressError::Truncated)
    }
}

/// Reads a memory block header and returns `(length, page)`, or `None` if the source is
/// exhausted.
pub fn read_block_header<R: Read>(mut rd: R) -> Result<Option<(u16, u8)>> {
    let mut header = [0u8;3];
    match rd.read_exact_or_none(&mut header) {
        Ok(true) => Ok(Some((u16::from_le_bytes([header[0], header[1]]), header[2]))),
        Ok(false) => Ok(None),
        Err(e) => Err(SnapshotError::from_block_read(e, None))
    }
}

/// Reads the data of a memory block with the given header fields and decodes it into `page_buf`.
///
/// `packed` is used as a scratch buffer for the compressed data.
/// On error the content of `page_buf` is unspecified.
pub fn read_block_data<R: Read>(
        mut rd: R,
        length: u16,
        page: u8,
        packed: &mut Vec<u8>,
        page_buf: &mut [u8]
    ) -> Result<()>
{
    if length == BLOCK_UNCOMPRESSED {
        rd.read_exact(page_buf).map_err(|e| SnapshotError::from_block_read(e, Some(page)))
    }
    else {
        packed.resize(length as usize, 0);
        rd.read_exact(packed).map_err(|e| SnapshotError::from_block_read(e, Some(page)))?;
        decompress_into(packed, page_buf).map_err(|e| e.into_snapshot_error(Some(page)))
    }
}

/// Reads the next memory block of a version 2 or 3 snapshot and decodes it into `page_buf`.
///
/// Returns the page id of the block or `None` if there are no more blocks.
pub fn read_block<R: Read>(
        mut rd: R,
        packed: &mut Vec<u8>,
        page_buf: &mut [u8]
    ) -> Result<Option<u8>>
{
    match read_block_header(rd.by_ref())? {
        Some((length, page)) => {
            read_block_data(rd, length, page, packed, page_buf)?;
            Ok(Some(page))
        }
        None => Ok(None)
    }
}

/// Reads the single memory block of a version 1 snapshot into `mem_buf`.
///
/// The compressed data spans to the end of the source and may end with the `00 ED ED 00` marker.
pub fn read_v1_block<R: Read>(
        mut rd: R,
        compressed: bool,
        mem_buf: &mut [u8]
    ) -> Result<()>
{
    if compressed {
        let mut packed = Vec::new();
        rd.read_to_end(&mut packed)?;
        let packed = match packed.len().checked_sub(MEMORY_V1_TERM.len()) {
            Some(end) if &packed[end..] == MEMORY_V1_TERM => &packed[..end],
            _ => &packed[..]
        };
        decompress_into(packed, mem_buf).map_err(|e| e.into_snapshot_error(None))
    }
    else {
        rd.read_exact(mem_buf).map_err(|e| SnapshotError::from_block_read(e, None))
    }
}
