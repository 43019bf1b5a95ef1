/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Byte sources the snapshot data is being read from.
//!
//! Whichever storage backend is active (internal flash, SD card, a host file or an in-memory
//! buffer) it is exposed to the loaders through the single [ByteSource] interface.
use core::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

/// A sequential byte source with a known total length.
///
/// A source must be positioned at its first byte when handed to a loader.
pub trait ByteSource: Read {
    /// Returns the total number of bytes in the source.
    fn size(&self) -> u64;
    /// Releases the underlying resources. Reading after `close` should return an error or `Ok(0)`.
    ///
    /// Default implementation does nothing.
    fn close(&mut self) {}
}

impl<T: AsRef<[u8]>> ByteSource for io::Cursor<T> {
    fn size(&self) -> u64 {
        self.get_ref().as_ref().len() as u64
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// A [ByteSource] backed by a host file.
pub struct FileSource {
    file: Option<File>,
    size: u64
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSource")
         .field("open", &self.file.is_some())
         .field("size", &self.size)
         .finish()
    }
}

impl FileSource {
    /// Opens a file at the given `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        FileSource::from_file(file)
    }

    pub fn from_file(file: File) -> io::Result<Self> {
        let size = file.metadata()?.len();
        Ok(FileSource { file: Some(file), size })
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "the file has been closed"))
        }
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            trace!("file source closed");
        }
    }
}

/// A reading cursor over a borrowed [ByteSource] that counts consumed bytes.
///
/// The source is closed when the reader goes out of scope, regardless of the outcome of the
/// operation it's been used for.
pub struct SourceReader<'a, S: ByteSource + ?Sized> {
    source: &'a mut S,
    size: u64,
    consumed: u64
}

impl<'a, S: ByteSource + ?Sized> SourceReader<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        let size = source.size();
        SourceReader { source, size, consumed: 0 }
    }
    /// Returns the total size of the source.
    pub fn size(&self) -> u64 {
        self.size
    }
    /// Returns the number of bytes read so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
    /// Returns the number of bytes left to be read according to the declared source size.
    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.consumed)
    }
}

impl<'a, S: ByteSource + ?Sized> Read for SourceReader<'a, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.source.read(buf)?;
        self.consumed += len as u64;
        Ok(len)
    }
}

impl<'a, S: ByteSource + ?Sized> Drop for SourceReader<'a, S> {
    fn drop(&mut self) {
        self.source.close();
    }
}
