mod common;

use nesgym::{Config, HeadlessMode, NesEnv};

use common::Rom;

// Frame IRQ handler: acknowledge through $4015 and count in $10.
const COUNT_IRQ: [u8; 6] = [
    0xad, 0x15, 0x40, // LDA $4015
    0xe6, 0x10,       // INC $10
    0x40,             // RTI
];

#[test]
fn frame_irq_reaches_the_cpu() {
    // CLI; JMP *
    let rom = Rom::nrom().program(&[0x58, 0x4c, 0x01, 0x80], &COUNT_IRQ);
    let mut console = common::console(&rom);
    // A 4-step sequence is 29830 CPU cycles, about one frame.
    console.run_frames(4).unwrap();

    let count = console.read_ram(0x10);
    assert!((2..=4).contains(&count), "{}", count);
}

#[test]
fn irq_inhibit_keeps_the_line_low() {
    let code = [
        0xa9, 0x40,       // LDA #$40
        0x8d, 0x17, 0x40, // STA $4017
        0x58,             // CLI
        0x4c, 0x06, 0x80, // JMP $8006
    ];
    let rom = Rom::nrom().program(&code, &COUNT_IRQ);
    let mut console = common::console(&rom);
    console.run_frames(4).unwrap();
    assert_eq!(console.read_ram(0x10), 0);
}

#[test]
fn length_counter_status() {
    let code = [
        0xa9, 0x01,       // LDA #$01
        0x8d, 0x15, 0x40, // STA $4015
        0xa9, 0x08,       // LDA #$08
        0x8d, 0x03, 0x40, // STA $4003
        0xad, 0x15, 0x40, // LDA $4015
        0x85, 0x00,       // STA $00
        0x4c, 0x0f, 0x80, // JMP $800f
    ];
    let rom = Rom::nrom().program(&code, &[0x40]);
    let mut console = common::console(&rom);
    console.run_frames(1).unwrap();
    assert_eq!(console.read_ram(0x00) & 0x1f, 0x01);
}

#[test]
fn dmc_sample_plays_through_dma() {
    // One byte sample at 0xc000 with IRQ enabled, then poll $4015.
    let code = [
        0xa9, 0x8f,       // LDA #$8f
        0x8d, 0x10, 0x40, // STA $4010
        0xa9, 0x00,       // LDA #$00
        0x8d, 0x12, 0x40, // STA $4012
        0x8d, 0x13, 0x40, // STA $4013
        0xa9, 0x10,       // LDA #$10
        0x8d, 0x15, 0x40, // STA $4015
        0xad, 0x15, 0x40, // LDA $4015
        0x85, 0x00,       // STA $00
        0x4c, 0x12, 0x80, // JMP $8012
    ];
    let rom = Rom::nrom().program(&code, &[0x40]);
    let mut console = common::console(&rom);
    console.run_frames(1).unwrap();

    // Sample done, DMC interrupt pending.
    let status = console.read_ram(0x00);
    assert_eq!(status & 0x10, 0x00);
    assert_eq!(status & 0x80, 0x80);
}

#[test]
fn samples_per_frame() {
    let rom = Rom::nrom().program(&common::SPIN, &[0x40]);
    let mut env = NesEnv::new(&rom.build()).unwrap();
    env.reset().unwrap();
    env.drain_audio();

    env.step(0).unwrap();
    // 44100 / 60.1 samples per frame, give or take the pitch adjustment.
    let samples = env.drain_audio();
    assert!((720..=750).contains(&samples.len()), "{}", samples.len());
    assert!(samples.iter().all(|sample| sample.is_finite()));
}

#[test]
fn full_buffer_drops_oldest() {
    let rom = Rom::nrom().program(&common::SPIN, &[0x40]);
    let config = Config::default().audio_capacity(256);
    let mut env = NesEnv::with_config(&rom.build(), config).unwrap();
    env.reset().unwrap();
    for _ in 0..3 {
        env.step(0).unwrap();
    }
    assert_eq!(env.audio_samples(), 256);
    assert_eq!(env.buffer_fill(), 1.0);
    assert!(env.console().bus.apu.dropped_samples() > 0);
}

#[test]
fn no_audio_produces_nothing() {
    let rom = Rom::nrom().program(&common::SPIN, &[0x40]);
    let config = Config::default().headless(HeadlessMode::NO_AUDIO);
    let mut env = NesEnv::with_config(&rom.build(), config).unwrap();
    env.reset().unwrap();
    env.step(0).unwrap();
    assert!(env.drain_audio().is_empty());
}

#[test]
fn pulse_wave_is_audible() {
    let code = [
        0xa9, 0x01,       // LDA #$01
        0x8d, 0x15, 0x40, // STA $4015
        0xa9, 0xbf,       // LDA #$bf
        0x8d, 0x00, 0x40, // STA $4000
        0xa9, 0xfd,       // LDA #$fd
        0x8d, 0x02, 0x40, // STA $4002
        0xa9, 0x00,       // LDA #$00
        0x8d, 0x03, 0x40, // STA $4003
        0x4c, 0x14, 0x80, // JMP $8014
    ];
    let rom = Rom::nrom().program(&code, &[0x40]);
    let mut env = NesEnv::new(&rom.build()).unwrap();
    env.reset().unwrap();
    env.step(0).unwrap();
    env.drain_audio();
    env.step(0).unwrap();

    let samples = env.drain_audio();
    let max = samples.iter().cloned().fold(f32::MIN, f32::max);
    let min = samples.iter().cloned().fold(f32::MAX, f32::min);
    assert!(max - min > 0.05, "{} {}", min, max);
}
