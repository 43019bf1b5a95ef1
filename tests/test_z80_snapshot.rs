//! Loading Z80 snapshots into the Spectrum machine state.
use std::convert::TryFrom;
use std::io::Cursor;
use rand::prelude::*;
use rand::rngs::SmallRng;
use espectrum::machine::Spectrum;
use espectrum::memory::{MemoryError, PAGE_SIZE, MEM48K_SIZE};
use espectrum::model::{Arch, HardwareConfig, MachineSettings};
use espectrum::source::{ByteSource, FileSource};
use espectrum::video::BorderColor;
use espectrum::clock::FTs;
use espectrum::formats::SnapshotError;
use espectrum::formats::snapshot::*;
use espectrum::formats::z80::*;
use espectrum::session::*;
use espectrum::z80emu::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Regs {
    af: u16, bc: u16, de: u16, hl: u16,
    af_alt: u16, bc_alt: u16, de_alt: u16, hl_alt: u16,
    ix: u16, iy: u16, sp: u16, pc: u16,
    i: u8, r: u8, iffs: (bool, bool), im: u8, border: u8
}

const REGS: Regs = Regs {
    af: 0x1234, bc: 0x2345, de: 0x3456, hl: 0x4567,
    af_alt: 0x5678, bc_alt: 0x6789, de_alt: 0x789A, hl_alt: 0x89AB,
    ix: 0x9ABC, iy: 0x5C3A, sp: 0xFF4A, pc: 0x8765,
    i: 0x3F, r: 0xC2, iffs: (true, true), im: 1, border: 4
};

fn classic_header(regs: &Regs, pc: u16, compressed: bool) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&regs.af.to_be_bytes());
    data.extend_from_slice(&regs.bc.to_le_bytes());
    data.extend_from_slice(&regs.hl.to_le_bytes());
    data.extend_from_slice(&pc.to_le_bytes());
    data.extend_from_slice(&regs.sp.to_le_bytes());
    data.push(regs.i);
    data.push(regs.r & 0x7F);
    data.push((regs.r >> 7) | (regs.border << 1) | if compressed { 0x20 } else { 0 });
    data.extend_from_slice(&regs.de.to_le_bytes());
    data.extend_from_slice(&regs.bc_alt.to_le_bytes());
    data.extend_from_slice(&regs.de_alt.to_le_bytes());
    data.extend_from_slice(&regs.hl_alt.to_le_bytes());
    data.extend_from_slice(&regs.af_alt.to_be_bytes());
    data.extend_from_slice(&regs.iy.to_le_bytes());
    data.extend_from_slice(&regs.ix.to_le_bytes());
    data.push(regs.iffs.0 as u8);
    data.push(regs.iffs.1 as u8);
    data.push(regs.im | 0b0100_0000);
    assert_eq!(data.len(), 30);
    data
}

fn extended_header(regs: &Regs, hw_mode: u8, port1: u8, port2: u8) -> Vec<u8> {
    let mut data = classic_header(regs, 0, false);
    data.extend_from_slice(&55u16.to_le_bytes());
    data.extend_from_slice(&regs.pc.to_le_bytes());
    data.extend_from_slice(&[hw_mode, port1, 0, 0, 0]);
    data.extend_from_slice(&[0u8;16]);
    data.extend_from_slice(&[0u8;31]);
    data.push(port2);
    assert_eq!(data.len(), 30 + 2 + 55);
    data
}

/// Encodes a page consisting of the literal `prefix` followed by the `fill` bytes.
fn compress_dominant(prefix: &[u8], fill: u8) -> Vec<u8> {
    assert!(!prefix.contains(&0xED));
    let mut packed = prefix.to_vec();
    let mut left = PAGE_SIZE - prefix.len();
    while left > 0 {
        let count = left.min(255);
        packed.extend_from_slice(&[0xED, 0xED, count as u8, fill]);
        left -= count;
    }
    packed
}

fn push_block(data: &mut Vec<u8>, page: u8, packed: &[u8]) {
    data.extend_from_slice(&(packed.len() as u16).to_le_bytes());
    data.push(page);
    data.extend_from_slice(packed);
}

fn random_spectrum(settings: &MachineSettings, seed: u64) -> Spectrum {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut spectrum = Spectrum::new(settings);
    spectrum.memory_mut().fill_with(|| rng.gen());
    spectrum
}

fn assert_registers(cpu: &Z80NMOS, regs: &Regs) {
    assert_eq!(cpu.get_pc(), regs.pc);
    assert_eq!(cpu.get_sp(), regs.sp);
    let (a, f) = cpu.get_reg2(StkReg16::AF);
    assert_eq!(u16::from_be_bytes([a, f]), regs.af);
    assert_eq!(cpu.get_reg16(StkReg16::BC), regs.bc);
    assert_eq!(cpu.get_reg16(StkReg16::DE), regs.de);
    assert_eq!(cpu.get_reg16(StkReg16::HL), regs.hl);
    let (a, f) = cpu.get_alt_reg2(StkReg16::AF);
    assert_eq!(u16::from_be_bytes([a, f]), regs.af_alt);
    assert_eq!(cpu.get_alt_reg16(StkReg16::BC), regs.bc_alt);
    assert_eq!(cpu.get_alt_reg16(StkReg16::DE), regs.de_alt);
    assert_eq!(cpu.get_alt_reg16(StkReg16::HL), regs.hl_alt);
    assert_eq!(cpu.get_index16(Prefix::Xdd), regs.ix);
    assert_eq!(cpu.get_index16(Prefix::Yfd), regs.iy);
    assert_eq!(cpu.get_i(), regs.i);
    assert_eq!(cpu.get_r(), regs.r);
    assert_eq!(cpu.get_iffs(), regs.iffs);
    assert_eq!(cpu.get_im(), InterruptMode::try_from(regs.im).unwrap());
}

/// Delegates to the Spectrum counting the bytes written into the memory banks.
struct Counting<'a> {
    spectrum: &'a mut Spectrum,
    written: usize,
    banks: Vec<usize>
}

impl MachineState for Counting<'_> {
    type Error = <Spectrum as MachineState>::Error;

    fn assign_cpu(&mut self, cpu: Z80NMOS) {
        self.spectrum.assign_cpu(cpu)
    }

    fn write_bank(&mut self, bank: usize, data: &[u8]) -> Result<(), MemoryError> {
        self.spectrum.write_bank(bank, data)?;
        self.written += data.len();
        self.banks.push(bank);
        Ok(())
    }

    fn write_port(&mut self, port: u16, data: u8) {
        self.spectrum.write_port(port, data)
    }

    fn set_border_color(&mut self, color: BorderColor) {
        self.spectrum.set_border_color(color)
    }

    fn set_clock(&mut self, tstates: FTs) {
        self.spectrum.set_clock(tstates)
    }

    fn set_features(&mut self, features: &SnapshotFeatures) {
        self.spectrum.set_features(features)
    }

    fn setup_ay(&mut self, choice: Ay3_891xDevice, selected: u8, regs: &[u8;16]) {
        self.spectrum.setup_ay(choice, selected, regs)
    }

    fn request_profile(&mut self, arch: Arch) -> Result<(), Self::Error> {
        self.spectrum.request_profile(arch)
    }
}

#[test]
fn classic_uncompressed_48k_loads_verbatim() {
    init_logger();
    let mut rng = SmallRng::seed_from_u64(48);
    let mut memory = vec![0u8;MEM48K_SIZE];
    rng.fill_bytes(&mut memory);
    let mut data = classic_header(&REGS, REGS.pc, false);
    data.extend_from_slice(&memory);

    let mut settings = MachineSettings::new(Arch::Spectrum48, HardwareConfig::without_extra_ram());
    let mut spectrum = random_spectrum(&settings, 1);
    let res = load_snapshot(&mut Cursor::new(data), &mut settings, &mut spectrum, &mut NoInput).unwrap();
    assert_eq!(res.profile.arch(), Arch::Spectrum48);
    assert_eq!(res.extensions, Extensions::empty());
    assert!(!res.switch_required);
    assert_eq!(settings.arch, Arch::Spectrum48);

    assert_registers(&spectrum.cpu, &REGS);
    assert_eq!(spectrum.border_color(), BorderColor::GREEN);
    assert_eq!(spectrum.features().joystick, Some(JoystickModel::Kempston));
    assert_eq!(&spectrum.bank_ref(5).unwrap()[..], &memory[..PAGE_SIZE]);
    assert_eq!(&spectrum.bank_ref(2).unwrap()[..], &memory[PAGE_SIZE..2*PAGE_SIZE]);
    assert_eq!(&spectrum.bank_ref(0).unwrap()[..], &memory[2*PAGE_SIZE..]);
}

#[test]
fn extended_128k_compressed_pages_load() {
    init_logger();
    let mut data = extended_header(&REGS, 4, 0x11, 0);
    let pages = [(4u8, 1usize, 0xAAu8), (5, 2, 0x00), (8, 5, 0xED)];
    for &(page, _, fill) in &pages {
        push_block(&mut data, page, &compress_dominant(&[page, 1, 2, 3], fill));
    }

    let mut settings = MachineSettings::default();
    let mut spectrum = random_spectrum(&settings, 2);
    let before = spectrum.clone();
    let mut counting = Counting { spectrum: &mut spectrum, written: 0, banks: Vec::new() };
    let res = load_snapshot(&mut Cursor::new(data), &mut settings, &mut counting, &mut NoInput).unwrap();
    assert_eq!(counting.written, PAGE_SIZE * pages.len());
    assert_eq!(counting.banks, [1, 2, 5]);
    assert_eq!(res.profile.arch(), Arch::Spectrum128);
    assert!(!res.switch_required);

    for &(page, bank, fill) in &pages {
        let content = spectrum.bank_ref(bank).unwrap();
        assert_eq!(&content[..4], &[page, 1, 2, 3]);
        assert!(content[4..].iter().all(|&b| b == fill));
    }
    for bank in [0, 3, 4, 6, 7].iter().copied() {
        assert_eq!(&spectrum.bank_ref(bank).unwrap()[..], &before.bank_ref(bank).unwrap()[..]);
    }
    assert_registers(&spectrum.cpu, &REGS);
    assert_eq!(spectrum.mem_port_value(), 0x11);
    assert_eq!(spectrum.paged_bank(), 1);
    assert_eq!(spectrum.ay_state().map(|ay| ay.device), Some(Ay3_891xDevice::Ay128k));
}

#[test]
fn unknown_page_id_fails() {
    init_logger();
    let mut data = extended_header(&REGS, 4, 0, 0);
    push_block(&mut data, 3, &compress_dominant(&[], 0x33));
    push_block(&mut data, 99, &compress_dominant(&[], 0x99));
    push_block(&mut data, 4, &compress_dominant(&[], 0x44));

    let mut settings = MachineSettings::default();
    let mut spectrum = random_spectrum(&settings, 3);
    let before = spectrum.clone();
    match load_snapshot(&mut Cursor::new(data), &mut settings, &mut spectrum, &mut NoInput) {
        Err(SnapshotError::InvalidPageId { page: 99, arch: Arch::Spectrum128 }) => {}
        res => panic!("unexpected result: {:?}", res)
    }
    assert!(spectrum.bank_ref(0).unwrap().iter().all(|&b| b == 0x33));
    assert_eq!(&spectrum.bank_ref(1).unwrap()[..], &before.bank_ref(1).unwrap()[..]);
}

#[test]
fn unknown_model_fails_without_side_effects() {
    init_logger();
    let mut data = extended_header(&REGS, 200, 0x07, 0x04);
    push_block(&mut data, 8, &compress_dominant(&[], 0));

    let mut settings = MachineSettings::default();
    let mut spectrum = random_spectrum(&settings, 4);
    let before = spectrum.clone();
    match load_snapshot(&mut Cursor::new(data), &mut settings, &mut spectrum, &mut NoInput) {
        Err(SnapshotError::UnsupportedModel { version: Z80Version::V3, hw_mode: 200 }) => {}
        res => panic!("unexpected result: {:?}", res)
    }
    assert!(spectrum.memory_ref().iter().eq(before.memory_ref().iter()));
    assert_eq!(spectrum.cpu, before.cpu);
    assert_eq!(spectrum.mem_port_value(), before.mem_port_value());
    assert_eq!(spectrum.border_color(), before.border_color());
    assert_eq!(settings.arch, Arch::Spectrum128);
}

#[test]
fn model_switch_is_requested() {
    init_logger();
    let mut data = extended_header(&REGS, 13, 0x03, 0x05);
    push_block(&mut data, 10, &compress_dominant(&[], 7));

    let mut settings = MachineSettings::default();
    let mut spectrum = Spectrum::new(&settings);
    let res = load_snapshot(&mut Cursor::new(data), &mut settings, &mut spectrum, &mut NoInput).unwrap();
    assert!(res.switch_required);
    assert_eq!(spectrum.arch(), Arch::SpectrumPlus2A);
    assert_eq!(settings.arch, Arch::SpectrumPlus2A);
    assert_eq!(spectrum.mem_port_value(), 0x03);
    assert_eq!(spectrum.plus3_port_value(), 0x05);
    assert!(spectrum.bank_ref(7).unwrap().iter().all(|&b| b == 7));

    let data = extended_header(&REGS, 0, 0, 0);
    let mut spectrum = Spectrum::new(&settings);
    load_snapshot(&mut Cursor::new(data), &mut settings, &mut spectrum, &mut NoInput).unwrap();
    assert_eq!(spectrum.arch(), Arch::Spectrum48);
    assert_eq!(settings.arch, Arch::Spectrum48);
    // 48k has no paging ports
    assert_eq!(spectrum.mem_port_value(), 0);
}

#[test]
fn insufficient_hardware_fails() {
    init_logger();
    let data = extended_header(&REGS, 7, 0, 0);
    let mut settings: MachineSettings = serde_json::from_str(
        r#"{"arch":"48K","hardware":{"ram_banks":3}}"#).unwrap();
    assert_eq!(settings.hardware, HardwareConfig::without_extra_ram());
    let mut spectrum = Spectrum::new(&settings);
    match load_snapshot(&mut Cursor::new(data), &mut settings, &mut spectrum, &mut NoInput) {
        Err(SnapshotError::InsufficientMemory { arch: Arch::SpectrumPlus3, required: 8, available: 3 }) => {}
        res => panic!("unexpected result: {:?}", res)
    }
    assert_eq!(settings.arch, Arch::Spectrum48);
}

#[test]
fn file_source_is_closed() {
    init_logger();
    let path = std::env::temp_dir().join(format!("espectrum-test-{}.z80", std::process::id()));
    let mut data = classic_header(&REGS, REGS.pc, false);
    data.extend_from_slice(&[0u8;MEM48K_SIZE]);
    std::fs::write(&path, &data).unwrap();

    let mut settings = MachineSettings::default();
    let mut spectrum = Spectrum::new(&settings);
    let mut source = FileSource::open(&path).unwrap();
    assert_eq!(source.size(), data.len() as u64);
    load_snapshot(&mut source, &mut settings, &mut spectrum, &mut NoInput).unwrap();
    assert!(!source.is_open());

    std::fs::write(&path, &data[..100]).unwrap();
    let mut source = FileSource::open(&path).unwrap();
    match load_snapshot(&mut source, &mut settings, &mut spectrum, &mut NoInput) {
        Err(SnapshotError::TruncatedBlock { page: None }) => {}
        res => panic!("unexpected result: {:?}", res)
    }
    assert!(!source.is_open());
    std::fs::remove_file(&path).unwrap();
}

#[test]
#[should_panic(expected = "snap.z80: invalid memory page 99 for ZX Spectrum 128k")]
fn failed_load_halts() {
    init_logger();
    let mut data = extended_header(&REGS, 4, 0, 0);
    push_block(&mut data, 99, &compress_dominant(&[], 0));
    let mut settings = MachineSettings::default();
    let mut spectrum = Spectrum::new(&settings);
    load_snapshot_or_halt("snap.z80", &mut Cursor::new(data),
        &mut settings, &mut spectrum, &mut NoInput, &mut PanicReporter);
}
