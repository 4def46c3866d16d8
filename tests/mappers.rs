mod common;

use nesgym::cartridge::mapper::Mirroring;
use nesgym::cpu::bus::CpuBus;
use nesgym::ppu::DOTS_PER_FRAME;
use nesgym::{Config, Console, Error};

use common::Rom;

// (id, 16KB PRG banks, 8KB CHR banks)
const BOARDS: [(u16, usize, usize); 8] = [
    (0, 2, 1),
    (1, 8, 2),
    (2, 8, 0),
    (3, 2, 4),
    (4, 8, 8),
    (7, 8, 0),
    (11, 4, 2),
    (66, 4, 2),
];

#[test]
fn every_board_keeps_frame_timing() {
    for &(id, prg, chr) in BOARDS.iter() {
        let rom = Rom::new(id, prg, chr).program(&common::RENDER, &[0x40]);
        let mut console = common::console(&rom);
        console.run_frames(2).unwrap();
        assert!(console.bus.ppu.rendering(), "mapper {}", id);

        let mut short = 0;
        for _ in 0..4 {
            let start = console.dots();
            let cycles = console.cycles();
            console.step_frame().unwrap();
            let dots = console.dots() - start;
            assert!(dots == DOTS_PER_FRAME || dots == DOTS_PER_FRAME - 1, "mapper {}: {}", id, dots);
            if dots == DOTS_PER_FRAME - 1 {
                short += 1;
            }
            // One CPU cycle every three dots, give or take the phase.
            let cycles = console.cycles() - cycles;
            assert!((dots / 3..=dots / 3 + 1).contains(&cycles), "mapper {}: {}", id, cycles);
        }
        assert_eq!(short, 2, "mapper {}", id);
    }
}

#[test]
fn unknown_mapper_is_rejected() {
    let rom = Rom::new(5, 2, 1).build();
    assert!(matches!(Console::new(&rom, &Config::default()), Err(Error::UnsupportedMapper(5))));
}

#[test]
fn uxrom_switches_the_low_bank() {
    let rom = Rom::new(2, 8, 0).program(&common::SPIN, &[0x40]);
    let mut console = common::console(&rom);
    assert_eq!(console.peek(0x8200), 0);
    assert_eq!(console.peek(0xc200), 7);

    console.bus.write(0xc200, 3);
    assert_eq!(console.peek(0x8200), 3);
    assert_eq!(console.peek(0xc200), 7);
}

#[test]
fn mmc1_serial_writes() {
    let rom = Rom::new(1, 8, 2).program(&common::SPIN, &[0x40]);
    let mut console = common::console(&rom);

    // PRG register = 2, least significant bit first.
    for bit in [0, 1, 0, 0, 0] {
        console.bus.write(0xe000, bit);
    }
    assert_eq!(console.peek(0x8200), 2);
    assert_eq!(console.peek(0xc200), 7);

    // Control = 0b00010: vertical mirroring, keeps PRG mode 0 (32KB).
    for bit in [0, 1, 0, 0, 0] {
        console.bus.write(0x8000, bit);
    }
    assert_eq!(console.bus.cartridge.mirroring(), Mirroring::Vertical);
}

#[test]
fn mmc3_counts_scanlines() {
    let code = [
        0xa9, 0x08,       // LDA #$08
        0x8d, 0x00, 0x20, // STA $2000
        0xa9, 0x18,       // LDA #$18
        0x8d, 0x01, 0x20, // STA $2001
        0xa9, 0x10,       // LDA #$10
        0x8d, 0x00, 0xc0, // STA $c000
        0x8d, 0x01, 0xc0, // STA $c001
        0x8d, 0x01, 0xe0, // STA $e001
        0x58,             // CLI
        0x4c, 0x16, 0x80, // JMP $8016
    ];
    let irq = [
        0x8d, 0x00, 0xe0, // STA $e000
        0x8d, 0x01, 0xe0, // STA $e001
        0xe6, 0x10,       // INC $10
        0x40,             // RTI
    ];
    let rom = Rom::new(4, 8, 8).program(&code, &irq);
    let mut console = common::console(&rom);
    console.run_frames(4).unwrap();

    // 241 A12 rises per rendered frame, one interrupt every 17.
    let count = console.read_ram(0x10);
    assert!((40..=64).contains(&count), "{}", count);
}

#[test]
fn axrom_selects_single_screen() {
    let rom = Rom::new(7, 8, 0).program(&common::SPIN, &[0x40]);
    let mut console = common::console(&rom);

    console.bus.write(0x8000, 0x12);
    assert_eq!(console.bus.cartridge.mirroring(), Mirroring::SingleScreenHigh);
    // 32KB bank 2 holds 16KB banks 4 and 5.
    assert_eq!(console.peek(0x8200), 4);
    assert_eq!(console.peek(0xc200), 5);
}

#[test]
fn gxrom_register_with_bus_conflicts() {
    let rom = Rom::new(66, 4, 2)
        .program(&common::SPIN, &[0x40])
        .everywhere(0x8200, &[0xff])
        .chr(0x2000, &[0xaa]);
    let mut console = common::console(&rom);

    console.bus.write(0x8200, 0x11);
    assert_eq!(console.peek(0x8300), 2);
    assert_eq!(console.bus.cartridge.peek_chr(0x0000), 0xaa);

    // The ROM drives 0x02 at 0x8300, so the write lands as 0x00.
    console.bus.write(0x8300, 0x11);
    assert_eq!(console.peek(0x8300), 0);
}

#[test]
fn battery_ram_survives_power_cycle() {
    // LDA #$42; STA $6000; JMP *
    let code = [0xa9, 0x42, 0x8d, 0x00, 0x60, 0x4c, 0x05, 0x80];
    let rom = Rom::nrom().battery().program(&code, &[0x40]);
    let mut env = nesgym::NesEnv::new(&rom.build()).unwrap();
    env.reset().unwrap();
    assert_eq!(env.sram().map(|ram| ram[0]), Some(0x42));

    let mut saved = env.sram().unwrap().to_vec();
    saved[1] = 0x24;
    env.load_sram(&saved).unwrap();
    env.reset().unwrap();
    assert_eq!(env.peek(0x6001), 0x24);
    assert!(env.load_sram(&[0; 3]).is_err());
}
