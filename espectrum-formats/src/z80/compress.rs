/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! A run-length compressor used to produce snapshot test data.
use std::io::{Write, Result};

/// Compresses `data` with the snapshot memory block encoding and writes it to `wr`.
///
/// Runs of 5 or more bytes and runs of 2 or more `ED` bytes are encoded as `ED ED nn bb`.
/// A byte directly following a single literal `ED` is never the start of a run.
pub fn compress_write_all<W: Write>(data: &[u8], mut wr: W) -> Result<()> {
    let mut pos = 0;
    let mut after_lone_ed = false;
    while let Some(&byte) = data.get(pos) {
        let count = data[pos..].iter()
                               .take(u8::MAX as usize)
                               .take_while(|&&b| b == byte)
                               .count();
        let is_run = count >= 5 || (byte == 0xED && count >= 2);
        if is_run && !after_lone_ed {
            wr.write_all(&[0xED, 0xED, count as u8, byte])?;
            pos += count;
            after_lone_ed = false;
        }
        else {
            wr.write_all(&[byte])?;
            pos += 1;
            after_lone_ed = byte == 0xED && !after_lone_ed;
        }
    }
    Ok(())
}

pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len());
    // writing to a Vec never fails
    compress_write_all(data, &mut buf).unwrap();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::SmallRng;
    use espectrum_core::memory::PAGE_SIZE;
    use crate::z80::decompress_into;

    fn round_trip(page: &[u8]) -> Vec<u8> {
        let packed = compress(page);
        let mut out = vec![!page[0];page.len()];
        decompress_into(&packed, &mut out).unwrap();
        out
    }

    #[test]
    fn compress_works() {
        assert!(compress(&[]).is_empty());
        assert_eq!(compress(&[42]), [42]);
        assert_eq!(compress(&[0xED]), [0xED]);
        assert_eq!(compress(&[1,2,3,42,77]), [1,2,3,42,77]);
        assert_eq!(compress(&[42,42,42,42]), [42,42,42,42]);
        assert_eq!(compress(&[42,42,42,42,42]), [0xED,0xED,5,42]);
        assert_eq!(compress(&[0xED,0xED]), [0xED,0xED,2,0xED]);
        assert_eq!(compress(&[69,0xED,0xED]), [69,0xED,0xED,2,0xED]);
        assert_eq!(compress(&[0xED,69,0xED]), [0xED,69,0xED]);
        assert_eq!(compress(&[0xED,0,0,0,0,0,0]), [0xED,0,0xED,0xED,5,0]);
        assert_eq!(compress(&[0xED,0xED,0xED,0,0,0,0,0]), [0xED,0xED,3,0xED,0xED,0xED,5,0]);
        let mut expect = vec![0xED,0xED,255,7];
        expect.extend_from_slice(&[7;4]);
        assert_eq!(compress(&[7;259]), expect);
    }

    #[test]
    fn round_trip_without_runs() {
        let page: Vec<u8> = (0..PAGE_SIZE).map(|n| (n % 251) as u8).collect();
        let packed = compress(&page);
        assert_eq!(packed.len(), PAGE_SIZE);
        assert_eq!(round_trip(&page), page);
    }

    #[test]
    fn round_trip_single_run() {
        for &fill in &[0u8, 0xED, 0xFF] {
            let page = vec![fill;PAGE_SIZE];
            let packed = compress(&page);
            assert!(packed.len() < 300);
            assert_eq!(round_trip(&page), page);
        }
    }

    #[test]
    fn round_trip_with_escape_bytes() {
        let mut page = vec![0u8;PAGE_SIZE];
        for (n, p) in page.iter_mut().enumerate() {
            *p = match n % 7 {
                0|3 => 0xED,
                1 => n as u8,
                _ => 0
            };
        }
        page[100..110].copy_from_slice(&[0xED;10]);
        page[200..206].copy_from_slice(&[0xED,1,1,1,1,1]);
        page[PAGE_SIZE - 1] = 0xED;
        assert_eq!(round_trip(&page), page);

        let mut rng = SmallRng::seed_from_u64(0x2080);
        for _ in 0..100 {
            for p in page.iter_mut() {
                *p = match rng.gen_range(0..4) {
                    0 => 0xED,
                    1 => 0,
                    _ => rng.gen()
                };
            }
            let start = rng.gen_range(0..PAGE_SIZE - 300);
            let len = rng.gen_range(0..300);
            let fill = page[start];
            for p in page[start..start + len].iter_mut() {
                *p = fill;
            }
            assert_eq!(round_trip(&page), page);
        }
    }
}
