/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Snapshot load sessions.
//!
//! A session suspends the input polling for the duration of the load and resumes it afterwards,
//! whatever the outcome. The machine can't run while the load holds an exclusive reference to it.
use std::path::Path;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use espectrum_core::model::MachineSettings;
use espectrum_core::source::{ByteSource, FileSource};
use espectrum_formats::snapshot::MachineState;
use espectrum_formats::z80::{load_z80, Resolution};
use espectrum_formats::{Result, SnapshotError};

/// An interface to the peripheral input polling, e.g. the keyboard and mouse drivers.
pub trait InputControl {
    fn suspend_input(&mut self);
    fn resume_input(&mut self);
}

/// The facility invoked when the session can't continue.
pub trait FatalReporter {
    /// Should report the `message` and stop the emulator. Never returns.
    fn halt(&mut self, message: &str) -> !;
}

/// An [InputControl] for hosts without input devices.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInput;

impl InputControl for NoInput {
    fn suspend_input(&mut self) {}
    fn resume_input(&mut self) {}
}

/// A [FatalReporter] that panics with the message.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicReporter;

impl FatalReporter for PanicReporter {
    fn halt(&mut self, message: &str) -> ! {
        panic!("{}", message)
    }
}

struct InputSuspended<'a, I: InputControl + ?Sized>(&'a mut I);

impl<'a, I: InputControl + ?Sized> InputSuspended<'a, I> {
    fn new(input: &'a mut I) -> Self {
        input.suspend_input();
        InputSuspended(input)
    }
}

impl<'a, I: InputControl + ?Sized> Drop for InputSuspended<'a, I> {
    fn drop(&mut self) {
        self.0.resume_input();
    }
}

/// Loads a **Z80** snapshot from the `source` into the `machine`.
///
/// The input is suspended for the duration of the load. On success `settings.arch` is updated
/// with the snapshot's model. The `source` is always closed.
pub fn load_snapshot<S, M, I>(
        source: &mut S,
        settings: &mut MachineSettings,
        machine: &mut M,
        input: &mut I
    ) -> Result<Resolution>
    where S: ByteSource + ?Sized,
          M: MachineState,
          I: InputControl + ?Sized
{
    let _suspended = InputSuspended::new(input);
    let res = load_z80(source, settings, machine)?;
    settings.arch = res.profile.arch();
    Ok(res)
}

/// Opens the file at `path` and loads the **Z80** snapshot from it into the `machine`.
///
/// See [load_snapshot].
pub fn load_snapshot_file<P, M, I>(
        path: P,
        settings: &mut MachineSettings,
        machine: &mut M,
        input: &mut I
    ) -> Result<Resolution>
    where P: AsRef<Path>,
          M: MachineState,
          I: InputControl + ?Sized
{
    let mut source = FileSource::open(path).map_err(SnapshotError::Io)?;
    load_snapshot(&mut source, settings, machine, input)
}

/// Loads a **Z80** snapshot like [load_snapshot] does, but any failure halts the session via
/// the `reporter` with a message naming the snapshot `name` and the reason.
pub fn load_snapshot_or_halt<S, M, I, F>(
        name: &str,
        source: &mut S,
        settings: &mut MachineSettings,
        machine: &mut M,
        input: &mut I,
        reporter: &mut F
    ) -> Resolution
    where S: ByteSource + ?Sized,
          M: MachineState,
          I: InputControl + ?Sized,
          F: FatalReporter + ?Sized
{
    match load_snapshot(source, settings, machine, input) {
        Ok(res) => res,
        Err(err) => {
            let message = format!("{}: {}", name, err);
            error!("{}", message);
            reporter.halt(&message)
        }
    }
}
