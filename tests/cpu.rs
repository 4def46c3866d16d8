mod common;

use nesgym::cpu::disasm;
use nesgym::{Config, Console, Error, IllegalOpcodes};

use common::Rom;

// Waits for three NMIs, then writes 0x00..=0x0f to 0x0200.
const FILL_AFTER_THREE_FRAMES: [u8; 30] = [
    0x78,             // SEI
    0xd8,             // CLD
    0xa2, 0xff,       // LDX #$ff
    0x9a,             // TXS
    0xa9, 0x80,       // LDA #$80
    0x8d, 0x00, 0x20, // STA $2000
    0xa5, 0x10,       // LDA $10
    0xc9, 0x03,       // CMP #$03
    0xd0, 0xfa,       // BNE $800a
    0xa2, 0x00,       // LDX #$00
    0x8a,             // TXA
    0x9d, 0x00, 0x02, // STA $0200,X
    0xe8,             // INX
    0xe0, 0x10,       // CPX #$10
    0xd0, 0xf7,       // BNE $8012
    0x4c, 0x1b, 0x80, // JMP $801b
];

#[test]
fn writes_pattern_after_frames() {
    let rom = Rom::nrom().program(&FILL_AFTER_THREE_FRAMES, &common::COUNT_NMI);
    let mut console = common::console(&rom);

    console.run_frames(2).unwrap();
    assert!((0..0x10).all(|i| console.read_ram(0x0200 + i) == 0));

    console.run_frames(3).unwrap();
    let pattern = (0..0x10).map(|i| console.read_ram(0x0200 + i)).collect::<Vec<_>>();
    assert_eq!(pattern, (0..0x10).collect::<Vec<u8>>(), "\n{:?}", console.cpu);
    assert!(console.read_ram(0x10) >= 3);
}

#[test]
fn stack_and_flags_after_power_on() {
    let rom = Rom::nrom().program(&common::SPIN, &[0x40]);
    let mut console = common::console(&rom);
    console.step_instruction().unwrap();

    assert_eq!(console.cpu.reg.get_pc(), 0x8000);
    assert_eq!(console.cpu.reg.get_s(), 0xfd);
    assert!(console.cpu.reg.get_p().get_interrupt_disable());
}

#[test]
fn trace_lines() {
    let rom = Rom::nrom().program(&FILL_AFTER_THREE_FRAMES, &common::COUNT_NMI);
    let mut console = common::console(&rom);
    console.step_instruction().unwrap();

    assert_eq!(disasm::disassemble(&console.bus, 0x8000), "8000  78        SEI");
    assert_eq!(disasm::disassemble(&console.bus, 0x8007), "8007  8D 00 20  STA $2000");
    let line = disasm::trace_line(&console.cpu, &console.bus);
    assert!(line.starts_with("8000  78        SEI"), "{}", line);
    assert!(line.contains("SP:FD"), "{}", line);
}

#[test]
fn jam_freezes_cpu_but_not_ppu() {
    let rom = Rom::nrom().program(&[0x02], &[0x40]);
    let mut console = common::console(&rom);
    console.run_frames(2).unwrap();

    assert!(console.jammed());
    assert_eq!(console.frame(), 2);
    let pc = console.cpu.reg.get_pc();
    console.run_frames(1).unwrap();
    assert_eq!(console.cpu.reg.get_pc(), pc);
}

#[test]
fn halt_policy_stops_on_unofficial_opcode() {
    // LAX $00
    let rom = Rom::nrom().program(&[0xea, 0xa7, 0x00], &[0x40]);
    let config = Config::default().illegal_opcodes(IllegalOpcodes::Halt);
    let mut console = Console::new(&rom.build(), &config).unwrap();

    let err = console.run_frames(1).unwrap_err();
    assert!(matches!(err, Error::IllegalOpcode { opcode: 0xa7, pc: 0x8001 }), "{}", err);
}

#[test]
fn emulate_policy_runs_unofficial_opcodes() {
    // LDA #$5a; STA $00; LAX $00; STX $01; JMP *
    let code = [0xa9, 0x5a, 0x85, 0x00, 0xa7, 0x00, 0x86, 0x01, 0x4c, 0x08, 0x80];
    let rom = Rom::nrom().program(&code, &[0x40]);
    let mut console = common::console(&rom);
    console.run_frames(1).unwrap();
    assert_eq!(console.read_ram(0x01), 0x5a);
}

#[test]
fn oam_dma_copies_a_page() {
    // Fill 0x0300 with X, then start DMA from page 3.
    let code = [
        0xa2, 0x00,       // LDX #$00
        0x8a,             // TXA
        0x9d, 0x00, 0x03, // STA $0300,X
        0xe8,             // INX
        0xd0, 0xf9,       // BNE $8002
        0xa9, 0x03,       // LDA #$03
        0x8d, 0x14, 0x40, // STA $4014
        0x4c, 0x0e, 0x80, // JMP $800e
    ];
    let rom = Rom::nrom().program(&code, &[0x40]);
    let mut console = common::console(&rom);
    console.run_frames(1).unwrap();

    let oam = console.bus.ppu.oam();
    assert!((0..256).all(|i| oam[i] == i as u8));
}

#[test]
fn oam_dma_suspends_the_cpu() {
    let code = [
        0xa9, 0x02,       // LDA #$02
        0x8d, 0x14, 0x40, // STA $4014
        0xea,             // NOP
        0x4c, 0x06, 0x80, // JMP $8006
    ];
    let rom = Rom::nrom().program(&code, &[0x40]);
    let mut console = common::console(&rom);

    // Reset, LDA, STA.
    for _ in 0..3 {
        console.step_instruction().unwrap();
    }
    let start = console.cycles();
    // The NOP waits for the transfer.
    console.step_instruction().unwrap();
    let taken = console.cycles() - start;
    assert!(taken == 513 || taken == 514, "{}", taken);
}
