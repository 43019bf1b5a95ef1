/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ESPECTRUM, a snapshot engine for ZX Spectrum emulators.

    For the full copyright notice, see the lib.rs file.
*/
#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use espectrum_core::memory::{PAGE_SIZE, MEM48K_SIZE};
use espectrum_core::model::{Arch, MachineSettings};
use espectrum_core::source::{ByteSource, SourceReader};
use espectrum_core::z80emu::{CpuFlags, Z80NMOS, StkReg16, Prefix, Cpu};

use crate::error::{Result, SnapshotError};
use crate::snapshot::*;

use super::decompress::*;
use super::header::*;
use super::profile::*;

fn select_ay_model(arch: Arch, flags3: Flags3) -> Option<Ay3_891xDevice> {
    match arch {
        _ if arch.has_ay() => Some(Ay3_891xDevice::Ay128k),
        _ if flags3.is_ay_fuller_box() => Some(Ay3_891xDevice::FullerBox),
        _ if flags3.is_ay_melodik() => Some(Ay3_891xDevice::Melodik),
        _ => None
    }
}

fn create_cpu(z80: &Z80Header) -> Result<Z80NMOS> {
    let head = &z80.header;
    let mut cpu = Z80NMOS::default();
    cpu.reset();
    cpu.set_i(head.i);
    cpu.set_reg16(StkReg16::HL, head.hl_alt);
    cpu.set_reg16(StkReg16::DE, head.de_alt);
    cpu.set_reg16(StkReg16::BC, head.bc_alt);
    cpu.exx();
    cpu.set_acc(head.a_alt);
    cpu.set_flags(CpuFlags::from_bits_truncate(head.f_alt));
    cpu.ex_af_af();
    cpu.set_reg16(StkReg16::HL, head.hl);
    cpu.set_reg16(StkReg16::DE, head.de);
    cpu.set_reg16(StkReg16::BC, head.bc);
    cpu.set_index16(Prefix::Yfd, head.iy);
    cpu.set_index16(Prefix::Xdd, head.ix);
    cpu.set_iffs(head.iff1 != 0, head.iff2 != 0);
    cpu.set_r(head.flags1.mix_r(head.r7));
    cpu.set_acc(head.a);
    cpu.set_flags(CpuFlags::from_bits_truncate(head.f));
    cpu.set_sp(head.sp);
    cpu.set_im(head.flags2.interrupt_mode()?);
    cpu.set_pc(z80.pc());
    Ok(cpu)
}

fn load_v1_memory<S: ByteSource + ?Sized, M: MachineState>(
        rd: &mut SourceReader<'_, S>,
        z80: &Z80Header,
        profile: &MachineProfile,
        machine: &mut M
    ) -> Result<()>
{
    let compressed = z80.header.flags1.is_mem_compressed();
    let mut mem = vec![0u8;MEM48K_SIZE];
    read_v1_block(rd, compressed, &mut mem)?;
    for (chunk, &(page, bank)) in mem.chunks(PAGE_SIZE).zip(profile.page_map()) {
        debug!("z80 page: {} -> bank: {}", page, bank);
        machine.write_bank(bank, chunk)?;
    }
    Ok(())
}

fn load_memory_blocks<S: ByteSource + ?Sized, M: MachineState>(
        rd: &mut SourceReader<'_, S>,
        profile: &MachineProfile,
        machine: &mut M
    ) -> Result<()>
{
    let mut packed = Vec::new();
    let mut page_buf = vec![0u8;PAGE_SIZE];
    let mut loaded_banks = 0u32;
    while let Some((length, page)) = read_block_header(&mut *rd)? {
        let slot = profile.page_slot(page).ok_or(
            SnapshotError::InvalidPageId { page, arch: profile.arch() }
        )?;
        read_block_data(&mut *rd, length, page, &mut packed, &mut page_buf)?;
        match slot {
            PageSlot::Bank(bank) => {
                let mask = 1 << bank;
                if loaded_banks & mask != 0 {
                    warn!("z80 page: {} is repeated", page);
                    return Err(SnapshotError::InvalidPageId { page, arch: profile.arch() })
                }
                loaded_banks |= mask;
                debug!("z80 page: {} -> bank: {} ({} bytes)", page, bank,
                    if length == BLOCK_UNCOMPRESSED { PAGE_SIZE } else { length as usize });
                machine.write_bank(bank, &page_buf)?;
            }
            PageSlot::Absent => {
                warn!("z80 page: {} not present in {}, skipping", page, profile);
            }
        }
    }
    Ok(())
}

fn apply_state<M: MachineState>(
        z80: &Z80Header,
        resolution: &Resolution,
        cpu: Z80NMOS,
        machine: &mut M
    )
{
    let arch = resolution.profile.arch();
    let head = &z80.header;
    machine.assign_cpu(cpu);
    machine.set_border_color(head.flags1.border_color());

    let mut features = SnapshotFeatures {
        extensions: resolution.extensions,
        joystick: Some(head.flags2.joystick_model()),
        issue2: head.flags2.is_issue2_emulation(),
        double_interrupt: head.flags2.is_double_interrupt(),
        ..SnapshotFeatures::default()
    };

    if let Some(ref head_ex) = z80.header_ex {
        features.if1_rom_paged = head_ex.ifrom == 0xff
                                 && resolution.extensions.intersects(Extensions::IF1);
        features.r_emulation = head_ex.flags3.intersects(Flags3::REG_R_EMU);
        features.ldir_emulation = head_ex.flags3.intersects(Flags3::LDIR_EMU);

        if let Some(choice) = select_ay_model(arch, head_ex.flags3) {
            machine.setup_ay(choice, head_ex.ay_sel_reg, &head_ex.ay_regs);
        }

        if z80.version == Z80Version::V3 {
            let ts = z80_to_cycles(head_ex.ts_lo, head_ex.ts_hi, arch);
            machine.set_clock(ts);
            let data = head_ex.port2;
            if data != 0 && arch.has_plus3_paging() {
                machine.write_port(0x1ffd, data);
            }
        }

        if arch.is_banked() {
            machine.write_port(0x7ffd, head_ex.port1);
        }
    }
    machine.set_features(&features);
}

/// Loads a **Z80** snapshot from the `source` into the `machine`.
///
/// The snapshot's model is resolved against the given `settings` before anything is written
/// into the `machine`. If the model differs from `settings.arch`, [MachineState::request_profile]
/// is called as the last step.
///
/// The `source` is closed when this function returns, regardless of the outcome.
///
/// On error the state of the `machine` is unspecified.
pub fn load_z80<S: ByteSource + ?Sized, M: MachineState>(
        source: &mut S,
        settings: &MachineSettings,
        machine: &mut M
    ) -> Result<Resolution>
{
    let mut rd = SourceReader::new(source);
    let z80 = read_header(&mut rd)?;
    let resolution = resolve(&z80, settings)?;
    let profile = resolution.profile;
    info!("z80 {:?} snapshot: {}{}, {} bytes", z80.version, profile, resolution.extensions, rd.size());

    let cpu = create_cpu(&z80)?;

    if z80.version == Z80Version::V1 {
        load_v1_memory(&mut rd, &z80, &profile, machine)?;
    }
    else {
        load_memory_blocks(&mut rd, &profile, machine)?;
    }

    apply_state(&z80, &resolution, cpu, machine);

    if resolution.switch_required {
        info!("z80 switching machine: {} -> {}", settings.arch, profile.arch());
        machine.request_profile(profile.arch())
               .map_err(|e| SnapshotError::ProfileSwitchFailed(e.into()))?;
    }
    Ok(resolution)
}
