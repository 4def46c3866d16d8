use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cpu::bus::CpuBus;
use crate::cpu::disasm::INSTRUCTIONS;
use crate::cpu::reg::Reg;
use crate::error::{ensure_state, Error, Result};

pub mod bus;
pub mod cycle;
pub mod disasm;
pub mod flags;
pub mod opc;
pub mod reg;

pub const NMI_VECTOR: u16 = 0xfffa;
pub const RESET_VECTOR: u16 = 0xfffc;
pub const IRQ_VECTOR: u16 = 0xfffe;

// NTSC 2A03 clock.
pub const CLOCK_RATE: f64 = 21_477_272.0 / 12.0;

// What to do when an unofficial opcode is fetched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IllegalOpcodes {
    // Run the documented behaviour. JAM opcodes freeze the CPU.
    Emulate,
    // Stop and report the opcode.
    Halt,
}

impl Default for IllegalOpcodes {
    fn default() -> Self { IllegalOpcodes::Emulate }
}

// What the current timing states belong to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sequence {
    Instruction,
    Interrupt,
    Reset,
    Jammed,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
struct OamDma {
    page: u8,
    // Halt and alignment cycles before the first read.
    setup: u8,
    // Read on even steps, write on odd steps.
    step: u16,
    data: u8,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
struct DmcDma {
    addr: u16,
    remaining: u8,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub reg: Reg,

    // Instruction register and its timing state.
    opcode: u8,
    cycle: u8,
    sequence: Sequence,

    // Latches used while an instruction builds its effective address.
    addr: u16,
    base: u16,
    data: u8,
    crossed: bool,

    // Interrupt lines as sampled at the end of each cycle, and one cycle earlier.
    nmi_line: bool,
    need_nmi: bool,
    prev_need_nmi: bool,
    run_irq: bool,
    prev_run_irq: bool,
    reset_pending: bool,

    oam_dma: Option<OamDma>,
    dmc_dma: Option<DmcDma>,

    // Number of cycles since power on.
    cycles: u64,
    policy: IllegalOpcodes,
}

impl Cpu {
    pub fn new(policy: IllegalOpcodes) -> Self {
        Self {
            reg: Reg::new(),
            opcode: 0,
            cycle: cycle::T1,
            sequence: Sequence::Reset,
            addr: 0,
            base: 0,
            data: 0,
            crossed: false,
            nmi_line: false,
            need_nmi: false,
            prev_need_nmi: false,
            run_irq: false,
            prev_run_irq: false,
            reset_pending: true,
            oam_dma: None,
            dmc_dma: None,
            cycles: 0,
            policy,
        }
    }

    pub fn cycles(&self) -> u64 { self.cycles }
    pub fn opcode(&self) -> u8 { self.opcode }
    pub fn sequence(&self) -> Sequence { self.sequence }
    pub fn jammed(&self) -> bool { self.sequence == Sequence::Jammed }
    pub fn policy(&self) -> IllegalOpcodes { self.policy }

    // Range checks for a deserialized CPU.
    pub fn validate(&self) -> Result<()> {
        let last = match self.sequence {
            Sequence::Interrupt | Sequence::Reset => cycle::T7,
            Sequence::Instruction | Sequence::Jammed => cycle::T8,
        };
        ensure_state((cycle::T1..=last).contains(&self.cycle), "CPU cycle")?;
        if let Some(dma) = self.oam_dma {
            ensure_state(dma.setup <= 2 && dma.step < 512, "OAM DMA")?;
        }
        if let Some(dma) = self.dmc_dma {
            ensure_state((1..=4).contains(&dma.remaining), "DMC DMA")?;
        }
        Ok(())
    }

    // True between instructions, when no DMA holds the bus.
    pub fn at_boundary(&self) -> bool {
        self.cycle == cycle::T1 && self.oam_dma.is_none() && self.dmc_dma.is_none()
    }

    // Run the reset sequence from the next cycle. Registers other than S, P and PC are kept.
    pub fn reset(&mut self) {
        self.cycle = cycle::T1;
        self.sequence = Sequence::Reset;
        self.reset_pending = true;
        self.oam_dma = None;
        self.dmc_dma = None;
        self.need_nmi = false;
        self.prev_need_nmi = false;
    }

    // Step a cycle
    pub fn step<B: CpuBus>(&mut self, bus: &mut B) -> Result<()> {
        self.cycles += 1;
        let res = self.run_cycle(bus);
        self.poll_interrupts(bus);
        res
    }

    // Step until the next instruction boundary. Returns the cycles taken.
    pub fn step_instruction<B: CpuBus>(&mut self, bus: &mut B) -> Result<u64> {
        let start = self.cycles;
        loop {
            self.step(bus)?;
            if self.at_boundary() {
                break;
            }
        }
        Ok(self.cycles - start)
    }

    fn poll_interrupts<B: CpuBus>(&mut self, bus: &B) {
        // NMI is edge triggered.
        self.prev_need_nmi = self.need_nmi;
        let nmi = bus.nmi_line();
        if nmi && !self.nmi_line {
            self.need_nmi = true;
        }
        self.nmi_line = nmi;

        // IRQ is level triggered and masked by I.
        self.prev_run_irq = self.run_irq;
        self.run_irq = bus.irq_line() && !self.reg.get_p().get_interrupt_disable();
    }

    fn run_cycle<B: CpuBus>(&mut self, bus: &mut B) -> Result<()> {
        if self.dmc_dma.is_none() {
            if let Some(addr) = bus.take_dmc_dma() {
                self.dmc_dma = Some(DmcDma { addr, remaining: 4 });
            }
        }
        if self.dmc_dma.is_some() {
            self.dmc_dma_cycle(bus);
            return Ok(());
        }

        if self.cycle == cycle::T1 && self.oam_dma.is_none() {
            if let Some(page) = bus.take_oam_dma() {
                let setup = if self.cycles % 2 == 1 { 2 } else { 1 };
                trace!(target: "opcode", "oam dma from page 0x{:02x}", page);
                self.oam_dma = Some(OamDma { page, setup, step: 0, data: 0 });
            }
        }
        if self.oam_dma.is_some() {
            self.oam_dma_cycle(bus);
            return Ok(());
        }

        if self.cycle == cycle::T1 {
            return self.begin(bus);
        }

        match self.sequence {
            Sequence::Instruction => self.execute(bus),
            Sequence::Interrupt => self.interrupt(bus),
            Sequence::Reset => self.rst(bus),
            Sequence::Jammed => self.finish(),
        }

        self.cycle += 1;
        Ok(())
    }

    // T1. Fetch the next opcode or start an interrupt sequence instead.
    fn begin<B: CpuBus>(&mut self, bus: &mut B) -> Result<()> {
        match self.sequence {
            Sequence::Jammed => return Ok(()),
            _ if self.reset_pending => {
                self.reset_pending = false;
                self.sequence = Sequence::Reset;
                bus.read(self.reg.get_pc());
            }
            _ if self.prev_need_nmi || self.prev_run_irq => {
                trace!(target: "opcode", "interrupt, nmi: {}, irq: {}", self.prev_need_nmi, self.prev_run_irq);
                self.sequence = Sequence::Interrupt;
                bus.read(self.reg.get_pc());
            }
            _ => {
                if log_enabled!(target: "opcode", ::log::Level::Trace) {
                    trace!(target: "opcode", "{}", disasm::trace_line(self, bus));
                }

                let pc = self.reg.get_pc();
                self.opcode = bus.read(pc);
                self.reg.set_next_pc();

                if self.policy == IllegalOpcodes::Halt && !INSTRUCTIONS[self.opcode as usize].official {
                    error!(target: "opcode", "illegal opcode 0x{:02x} at 0x{:04x}", self.opcode, pc);
                    self.sequence = Sequence::Jammed;
                    return Err(Error::IllegalOpcode { opcode: self.opcode, pc });
                }
                self.sequence = Sequence::Instruction;
            }
        }

        self.cycle = cycle::T2;
        Ok(())
    }

    fn oam_dma_cycle<B: CpuBus>(&mut self, bus: &mut B) {
        let mut dma = match self.oam_dma {
            Some(dma) => dma,
            None => return,
        };

        if dma.setup > 0 {
            dma.setup -= 1;
        } else if dma.step % 2 == 0 {
            dma.data = bus.read(((dma.page as u16) << 8) | (dma.step / 2));
            dma.step += 1;
        } else {
            bus.write(0x2004, dma.data);
            dma.step += 1;
        }

        self.oam_dma = if dma.step == 512 { None } else { Some(dma) };
    }

    // Three halt cycles then the sample fetch.
    fn dmc_dma_cycle<B: CpuBus>(&mut self, bus: &mut B) {
        if let Some(mut dma) = self.dmc_dma {
            dma.remaining -= 1;
            if dma.remaining == 0 {
                let data = bus.read(dma.addr);
                bus.finish_dmc_dma(data);
                self.dmc_dma = None;
            } else {
                self.dmc_dma = Some(dma);
            }
        }
    }

    // Run the current opcode for one cycle.
    #[allow(clippy::cognitive_complexity)]
    fn execute<B: CpuBus>(&mut self, bus: &mut B) {
        macro_rules! run {
            ($code:ident) => {{
                self.$code(bus)
            }};

            ($code:ident, $mode:ident) => {{
                if let Some(operand) = self.$mode(bus) {
                    self.$code(bus, operand)
                }
            }};
        }

        match self.opcode {
            0x00 => run!(brk),                  /* bytes: 2 cycles: 7     Brk, Implied     */
            0x01 => run!(ora, r_indirect_x),    /* bytes: 2 cycles: 6     Ora, IndirectX   */
            0x02 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x03 => run!(slo, rw_indirect_x),   /* bytes: 2 cycles: 8   * Slo, IndirectX   */
            0x04 => run!(skb, r_zero_page),     /* bytes: 2 cycles: 3   * Nop, ZeroPage    */
            0x05 => run!(ora, r_zero_page),     /* bytes: 2 cycles: 3     Ora, ZeroPage    */
            0x06 => run!(asl, rw_zero_page),    /* bytes: 2 cycles: 5     Asl, ZeroPage    */
            0x07 => run!(slo, rw_zero_page),    /* bytes: 2 cycles: 5   * Slo, ZeroPage    */
            0x08 => run!(php, w_stack),         /* bytes: 1 cycles: 3     Php, Implied     */
            0x09 => run!(ora, immediate),       /* bytes: 2 cycles: 2     Ora, Immediate   */
            0x0A => run!(asl_acc, accumulator), /* bytes: 1 cycles: 2     Asl, Accumulator */
            0x0B => run!(anc, immediate),       /* bytes: 2 cycles: 2   * Anc, Immediate   */
            0x0C => run!(skb, r_absolute),      /* bytes: 3 cycles: 4   * Nop, Absolute    */
            0x0D => run!(ora, r_absolute),      /* bytes: 3 cycles: 4     Ora, Absolute    */
            0x0E => run!(asl, rw_absolute),     /* bytes: 3 cycles: 6     Asl, Absolute    */
            0x0F => run!(slo, rw_absolute),     /* bytes: 3 cycles: 6   * Slo, Absolute    */
            0x10 => run!(bpl),                  /* bytes: 2 cycles: 2**   Bpl, Relative    */
            0x11 => run!(ora, r_indirect_y),    /* bytes: 2 cycles: 5*    Ora, IndirectY   */
            0x12 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x13 => run!(slo, rw_indirect_y),   /* bytes: 2 cycles: 8   * Slo, IndirectY   */
            0x14 => run!(skb, r_zero_page_x),   /* bytes: 2 cycles: 4   * Nop, ZeroPageX   */
            0x15 => run!(ora, r_zero_page_x),   /* bytes: 2 cycles: 4     Ora, ZeroPageX   */
            0x16 => run!(asl, rw_zero_page_x),  /* bytes: 2 cycles: 6     Asl, ZeroPageX   */
            0x17 => run!(slo, rw_zero_page_x),  /* bytes: 2 cycles: 6   * Slo, ZeroPageX   */
            0x18 => run!(clc, implied),         /* bytes: 1 cycles: 2     Clc, Implied     */
            0x19 => run!(ora, r_absolute_y),    /* bytes: 3 cycles: 4*    Ora, AbsoluteY   */
            0x1A => run!(nop, implied),         /* bytes: 1 cycles: 2   * Nop, Implied     */
            0x1B => run!(slo, rw_absolute_y),   /* bytes: 3 cycles: 7   * Slo, AbsoluteY   */
            0x1C => run!(skb, r_absolute_x),    /* bytes: 3 cycles: 4*  * Nop, AbsoluteX   */
            0x1D => run!(ora, r_absolute_x),    /* bytes: 3 cycles: 4*    Ora, AbsoluteX   */
            0x1E => run!(asl, rw_absolute_x),   /* bytes: 3 cycles: 7     Asl, AbsoluteX   */
            0x1F => run!(slo, rw_absolute_x),   /* bytes: 3 cycles: 7   * Slo, AbsoluteX   */
            0x20 => run!(jsr),                  /* bytes: 3 cycles: 6     Jsr, Absolute    */
            0x21 => run!(and, r_indirect_x),    /* bytes: 2 cycles: 6     And, IndirectX   */
            0x22 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x23 => run!(rla, rw_indirect_x),   /* bytes: 2 cycles: 8   * Rla, IndirectX   */
            0x24 => run!(bit, r_zero_page),     /* bytes: 2 cycles: 3     Bit, ZeroPage    */
            0x25 => run!(and, r_zero_page),     /* bytes: 2 cycles: 3     And, ZeroPage    */
            0x26 => run!(rol, rw_zero_page),    /* bytes: 2 cycles: 5     Rol, ZeroPage    */
            0x27 => run!(rla, rw_zero_page),    /* bytes: 2 cycles: 5   * Rla, ZeroPage    */
            0x28 => run!(plp, r_stack),         /* bytes: 1 cycles: 4     Plp, Implied     */
            0x29 => run!(and, immediate),       /* bytes: 2 cycles: 2     And, Immediate   */
            0x2A => run!(rol_acc, accumulator), /* bytes: 1 cycles: 2     Rol, Accumulator */
            0x2B => run!(anc, immediate),       /* bytes: 2 cycles: 2   * Anc, Immediate   */
            0x2C => run!(bit, r_absolute),      /* bytes: 3 cycles: 4     Bit, Absolute    */
            0x2D => run!(and, r_absolute),      /* bytes: 3 cycles: 4     And, Absolute    */
            0x2E => run!(rol, rw_absolute),     /* bytes: 3 cycles: 6     Rol, Absolute    */
            0x2F => run!(rla, rw_absolute),     /* bytes: 3 cycles: 6   * Rla, Absolute    */
            0x30 => run!(bmi),                  /* bytes: 2 cycles: 2**   Bmi, Relative    */
            0x31 => run!(and, r_indirect_y),    /* bytes: 2 cycles: 5*    And, IndirectY   */
            0x32 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x33 => run!(rla, rw_indirect_y),   /* bytes: 2 cycles: 8   * Rla, IndirectY   */
            0x34 => run!(skb, r_zero_page_x),   /* bytes: 2 cycles: 4   * Nop, ZeroPageX   */
            0x35 => run!(and, r_zero_page_x),   /* bytes: 2 cycles: 4     And, ZeroPageX   */
            0x36 => run!(rol, rw_zero_page_x),  /* bytes: 2 cycles: 6     Rol, ZeroPageX   */
            0x37 => run!(rla, rw_zero_page_x),  /* bytes: 2 cycles: 6   * Rla, ZeroPageX   */
            0x38 => run!(sec, implied),         /* bytes: 1 cycles: 2     Sec, Implied     */
            0x39 => run!(and, r_absolute_y),    /* bytes: 3 cycles: 4*    And, AbsoluteY   */
            0x3A => run!(nop, implied),         /* bytes: 1 cycles: 2   * Nop, Implied     */
            0x3B => run!(rla, rw_absolute_y),   /* bytes: 3 cycles: 7   * Rla, AbsoluteY   */
            0x3C => run!(skb, r_absolute_x),    /* bytes: 3 cycles: 4*  * Nop, AbsoluteX   */
            0x3D => run!(and, r_absolute_x),    /* bytes: 3 cycles: 4*    And, AbsoluteX   */
            0x3E => run!(rol, rw_absolute_x),   /* bytes: 3 cycles: 7     Rol, AbsoluteX   */
            0x3F => run!(rla, rw_absolute_x),   /* bytes: 3 cycles: 7   * Rla, AbsoluteX   */
            0x40 => run!(rti),                  /* bytes: 1 cycles: 6     Rti, Implied     */
            0x41 => run!(eor, r_indirect_x),    /* bytes: 2 cycles: 6     Eor, IndirectX   */
            0x42 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x43 => run!(sre, rw_indirect_x),   /* bytes: 2 cycles: 8   * Sre, IndirectX   */
            0x44 => run!(skb, r_zero_page),     /* bytes: 2 cycles: 3   * Nop, ZeroPage    */
            0x45 => run!(eor, r_zero_page),     /* bytes: 2 cycles: 3     Eor, ZeroPage    */
            0x46 => run!(lsr, rw_zero_page),    /* bytes: 2 cycles: 5     Lsr, ZeroPage    */
            0x47 => run!(sre, rw_zero_page),    /* bytes: 2 cycles: 5   * Sre, ZeroPage    */
            0x48 => run!(pha, w_stack),         /* bytes: 1 cycles: 3     Pha, Implied     */
            0x49 => run!(eor, immediate),       /* bytes: 2 cycles: 2     Eor, Immediate   */
            0x4A => run!(lsr_acc, accumulator), /* bytes: 1 cycles: 2     Lsr, Accumulator */
            0x4B => run!(alr, immediate),       /* bytes: 2 cycles: 2   * Alr, Immediate   */
            0x4C => run!(jmp_absolute),         /* bytes: 3 cycles: 3     Jmp, Absolute    */
            0x4D => run!(eor, r_absolute),      /* bytes: 3 cycles: 4     Eor, Absolute    */
            0x4E => run!(lsr, rw_absolute),     /* bytes: 3 cycles: 6     Lsr, Absolute    */
            0x4F => run!(sre, rw_absolute),     /* bytes: 3 cycles: 6   * Sre, Absolute    */
            0x50 => run!(bvc),                  /* bytes: 2 cycles: 2**   Bvc, Relative    */
            0x51 => run!(eor, r_indirect_y),    /* bytes: 2 cycles: 5*    Eor, IndirectY   */
            0x52 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x53 => run!(sre, rw_indirect_y),   /* bytes: 2 cycles: 8   * Sre, IndirectY   */
            0x54 => run!(skb, r_zero_page_x),   /* bytes: 2 cycles: 4   * Nop, ZeroPageX   */
            0x55 => run!(eor, r_zero_page_x),   /* bytes: 2 cycles: 4     Eor, ZeroPageX   */
            0x56 => run!(lsr, rw_zero_page_x),  /* bytes: 2 cycles: 6     Lsr, ZeroPageX   */
            0x57 => run!(sre, rw_zero_page_x),  /* bytes: 2 cycles: 6   * Sre, ZeroPageX   */
            0x58 => run!(cli, implied),         /* bytes: 1 cycles: 2     Cli, Implied     */
            0x59 => run!(eor, r_absolute_y),    /* bytes: 3 cycles: 4*    Eor, AbsoluteY   */
            0x5A => run!(nop, implied),         /* bytes: 1 cycles: 2   * Nop, Implied     */
            0x5B => run!(sre, rw_absolute_y),   /* bytes: 3 cycles: 7   * Sre, AbsoluteY   */
            0x5C => run!(skb, r_absolute_x),    /* bytes: 3 cycles: 4*  * Nop, AbsoluteX   */
            0x5D => run!(eor, r_absolute_x),    /* bytes: 3 cycles: 4*    Eor, AbsoluteX   */
            0x5E => run!(lsr, rw_absolute_x),   /* bytes: 3 cycles: 7     Lsr, AbsoluteX   */
            0x5F => run!(sre, rw_absolute_x),   /* bytes: 3 cycles: 7   * Sre, AbsoluteX   */
            0x60 => run!(rts),                  /* bytes: 1 cycles: 6     Rts, Implied     */
            0x61 => run!(adc, r_indirect_x),    /* bytes: 2 cycles: 6     Adc, IndirectX   */
            0x62 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x63 => run!(rra, rw_indirect_x),   /* bytes: 2 cycles: 8   * Rra, IndirectX   */
            0x64 => run!(skb, r_zero_page),     /* bytes: 2 cycles: 3   * Nop, ZeroPage    */
            0x65 => run!(adc, r_zero_page),     /* bytes: 2 cycles: 3     Adc, ZeroPage    */
            0x66 => run!(ror, rw_zero_page),    /* bytes: 2 cycles: 5     Ror, ZeroPage    */
            0x67 => run!(rra, rw_zero_page),    /* bytes: 2 cycles: 5   * Rra, ZeroPage    */
            0x68 => run!(pla, r_stack),         /* bytes: 1 cycles: 4     Pla, Implied     */
            0x69 => run!(adc, immediate),       /* bytes: 2 cycles: 2     Adc, Immediate   */
            0x6A => run!(ror_acc, accumulator), /* bytes: 1 cycles: 2     Ror, Accumulator */
            0x6B => run!(arr, immediate),       /* bytes: 2 cycles: 2   * Arr, Immediate   */
            0x6C => run!(jmp_indirect),         /* bytes: 3 cycles: 5     Jmp, Indirect    */
            0x6D => run!(adc, r_absolute),      /* bytes: 3 cycles: 4     Adc, Absolute    */
            0x6E => run!(ror, rw_absolute),     /* bytes: 3 cycles: 6     Ror, Absolute    */
            0x6F => run!(rra, rw_absolute),     /* bytes: 3 cycles: 6   * Rra, Absolute    */
            0x70 => run!(bvs),                  /* bytes: 2 cycles: 2**   Bvs, Relative    */
            0x71 => run!(adc, r_indirect_y),    /* bytes: 2 cycles: 5*    Adc, IndirectY   */
            0x72 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x73 => run!(rra, rw_indirect_y),   /* bytes: 2 cycles: 8   * Rra, IndirectY   */
            0x74 => run!(skb, r_zero_page_x),   /* bytes: 2 cycles: 4   * Nop, ZeroPageX   */
            0x75 => run!(adc, r_zero_page_x),   /* bytes: 2 cycles: 4     Adc, ZeroPageX   */
            0x76 => run!(ror, rw_zero_page_x),  /* bytes: 2 cycles: 6     Ror, ZeroPageX   */
            0x77 => run!(rra, rw_zero_page_x),  /* bytes: 2 cycles: 6   * Rra, ZeroPageX   */
            0x78 => run!(sei, implied),         /* bytes: 1 cycles: 2     Sei, Implied     */
            0x79 => run!(adc, r_absolute_y),    /* bytes: 3 cycles: 4*    Adc, AbsoluteY   */
            0x7A => run!(nop, implied),         /* bytes: 1 cycles: 2   * Nop, Implied     */
            0x7B => run!(rra, rw_absolute_y),   /* bytes: 3 cycles: 7   * Rra, AbsoluteY   */
            0x7C => run!(skb, r_absolute_x),    /* bytes: 3 cycles: 4*  * Nop, AbsoluteX   */
            0x7D => run!(adc, r_absolute_x),    /* bytes: 3 cycles: 4*    Adc, AbsoluteX   */
            0x7E => run!(ror, rw_absolute_x),   /* bytes: 3 cycles: 7     Ror, AbsoluteX   */
            0x7F => run!(rra, rw_absolute_x),   /* bytes: 3 cycles: 7   * Rra, AbsoluteX   */
            0x80 => run!(skb, immediate),       /* bytes: 2 cycles: 2   * Nop, Immediate   */
            0x81 => run!(sta, w_indirect_x),    /* bytes: 2 cycles: 6     Sta, IndirectX   */
            0x82 => run!(skb, immediate),       /* bytes: 2 cycles: 2   * Nop, Immediate   */
            0x83 => run!(sax, w_indirect_x),    /* bytes: 2 cycles: 6   * Sax, IndirectX   */
            0x84 => run!(sty, w_zero_page),     /* bytes: 2 cycles: 3     Sty, ZeroPage    */
            0x85 => run!(sta, w_zero_page),     /* bytes: 2 cycles: 3     Sta, ZeroPage    */
            0x86 => run!(stx, w_zero_page),     /* bytes: 2 cycles: 3     Stx, ZeroPage    */
            0x87 => run!(sax, w_zero_page),     /* bytes: 2 cycles: 3   * Sax, ZeroPage    */
            0x88 => run!(dey, implied),         /* bytes: 1 cycles: 2     Dey, Implied     */
            0x89 => run!(skb, immediate),       /* bytes: 2 cycles: 2   * Nop, Immediate   */
            0x8A => run!(txa, implied),         /* bytes: 1 cycles: 2     Txa, Implied     */
            0x8B => run!(xaa, immediate),       /* bytes: 2 cycles: 2   * Xaa, Immediate   */
            0x8C => run!(sty, w_absolute),      /* bytes: 3 cycles: 4     Sty, Absolute    */
            0x8D => run!(sta, w_absolute),      /* bytes: 3 cycles: 4     Sta, Absolute    */
            0x8E => run!(stx, w_absolute),      /* bytes: 3 cycles: 4     Stx, Absolute    */
            0x8F => run!(sax, w_absolute),      /* bytes: 3 cycles: 4   * Sax, Absolute    */
            0x90 => run!(bcc),                  /* bytes: 2 cycles: 2**   Bcc, Relative    */
            0x91 => run!(sta, w_indirect_y),    /* bytes: 2 cycles: 6     Sta, IndirectY   */
            0x92 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0x93 => run!(sha, w_indirect_y),    /* bytes: 2 cycles: 6   * Sha, IndirectY   */
            0x94 => run!(sty, w_zero_page_x),   /* bytes: 2 cycles: 4     Sty, ZeroPageX   */
            0x95 => run!(sta, w_zero_page_x),   /* bytes: 2 cycles: 4     Sta, ZeroPageX   */
            0x96 => run!(stx, w_zero_page_y),   /* bytes: 2 cycles: 4     Stx, ZeroPageY   */
            0x97 => run!(sax, w_zero_page_y),   /* bytes: 2 cycles: 4   * Sax, ZeroPageY   */
            0x98 => run!(tya, implied),         /* bytes: 1 cycles: 2     Tya, Implied     */
            0x99 => run!(sta, w_absolute_y),    /* bytes: 3 cycles: 5     Sta, AbsoluteY   */
            0x9A => run!(txs, implied),         /* bytes: 1 cycles: 2     Txs, Implied     */
            0x9B => run!(tas, w_absolute_y),    /* bytes: 3 cycles: 5   * Tas, AbsoluteY   */
            0x9C => run!(shy, w_absolute_x),    /* bytes: 3 cycles: 5   * Shy, AbsoluteX   */
            0x9D => run!(sta, w_absolute_x),    /* bytes: 3 cycles: 5     Sta, AbsoluteX   */
            0x9E => run!(shx, w_absolute_y),    /* bytes: 3 cycles: 5   * Shx, AbsoluteY   */
            0x9F => run!(sha, w_absolute_y),    /* bytes: 3 cycles: 5   * Sha, AbsoluteY   */
            0xA0 => run!(ldy, immediate),       /* bytes: 2 cycles: 2     Ldy, Immediate   */
            0xA1 => run!(lda, r_indirect_x),    /* bytes: 2 cycles: 6     Lda, IndirectX   */
            0xA2 => run!(ldx, immediate),       /* bytes: 2 cycles: 2     Ldx, Immediate   */
            0xA3 => run!(lax, r_indirect_x),    /* bytes: 2 cycles: 6   * Lax, IndirectX   */
            0xA4 => run!(ldy, r_zero_page),     /* bytes: 2 cycles: 3     Ldy, ZeroPage    */
            0xA5 => run!(lda, r_zero_page),     /* bytes: 2 cycles: 3     Lda, ZeroPage    */
            0xA6 => run!(ldx, r_zero_page),     /* bytes: 2 cycles: 3     Ldx, ZeroPage    */
            0xA7 => run!(lax, r_zero_page),     /* bytes: 2 cycles: 3   * Lax, ZeroPage    */
            0xA8 => run!(tay, implied),         /* bytes: 1 cycles: 2     Tay, Implied     */
            0xA9 => run!(lda, immediate),       /* bytes: 2 cycles: 2     Lda, Immediate   */
            0xAA => run!(tax, implied),         /* bytes: 1 cycles: 2     Tax, Implied     */
            0xAB => run!(lxa, immediate),       /* bytes: 2 cycles: 2   * Lxa, Immediate   */
            0xAC => run!(ldy, r_absolute),      /* bytes: 3 cycles: 4     Ldy, Absolute    */
            0xAD => run!(lda, r_absolute),      /* bytes: 3 cycles: 4     Lda, Absolute    */
            0xAE => run!(ldx, r_absolute),      /* bytes: 3 cycles: 4     Ldx, Absolute    */
            0xAF => run!(lax, r_absolute),      /* bytes: 3 cycles: 4   * Lax, Absolute    */
            0xB0 => run!(bcs),                  /* bytes: 2 cycles: 2**   Bcs, Relative    */
            0xB1 => run!(lda, r_indirect_y),    /* bytes: 2 cycles: 5*    Lda, IndirectY   */
            0xB2 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0xB3 => run!(lax, r_indirect_y),    /* bytes: 2 cycles: 5*  * Lax, IndirectY   */
            0xB4 => run!(ldy, r_zero_page_x),   /* bytes: 2 cycles: 4     Ldy, ZeroPageX   */
            0xB5 => run!(lda, r_zero_page_x),   /* bytes: 2 cycles: 4     Lda, ZeroPageX   */
            0xB6 => run!(ldx, r_zero_page_y),   /* bytes: 2 cycles: 4     Ldx, ZeroPageY   */
            0xB7 => run!(lax, r_zero_page_y),   /* bytes: 2 cycles: 4   * Lax, ZeroPageY   */
            0xB8 => run!(clv, implied),         /* bytes: 1 cycles: 2     Clv, Implied     */
            0xB9 => run!(lda, r_absolute_y),    /* bytes: 3 cycles: 4*    Lda, AbsoluteY   */
            0xBA => run!(tsx, implied),         /* bytes: 1 cycles: 2     Tsx, Implied     */
            0xBB => run!(las, r_absolute_y),    /* bytes: 3 cycles: 4*  * Las, AbsoluteY   */
            0xBC => run!(ldy, r_absolute_x),    /* bytes: 3 cycles: 4*    Ldy, AbsoluteX   */
            0xBD => run!(lda, r_absolute_x),    /* bytes: 3 cycles: 4*    Lda, AbsoluteX   */
            0xBE => run!(ldx, r_absolute_y),    /* bytes: 3 cycles: 4*    Ldx, AbsoluteY   */
            0xBF => run!(lax, r_absolute_y),    /* bytes: 3 cycles: 4*  * Lax, AbsoluteY   */
            0xC0 => run!(cpy, immediate),       /* bytes: 2 cycles: 2     Cpy, Immediate   */
            0xC1 => run!(cmp, r_indirect_x),    /* bytes: 2 cycles: 6     Cmp, IndirectX   */
            0xC2 => run!(skb, immediate),       /* bytes: 2 cycles: 2   * Nop, Immediate   */
            0xC3 => run!(dcp, rw_indirect_x),   /* bytes: 2 cycles: 8   * Dcp, IndirectX   */
            0xC4 => run!(cpy, r_zero_page),     /* bytes: 2 cycles: 3     Cpy, ZeroPage    */
            0xC5 => run!(cmp, r_zero_page),     /* bytes: 2 cycles: 3     Cmp, ZeroPage    */
            0xC6 => run!(dec, rw_zero_page),    /* bytes: 2 cycles: 5     Dec, ZeroPage    */
            0xC7 => run!(dcp, rw_zero_page),    /* bytes: 2 cycles: 5   * Dcp, ZeroPage    */
            0xC8 => run!(iny, implied),         /* bytes: 1 cycles: 2     Iny, Implied     */
            0xC9 => run!(cmp, immediate),       /* bytes: 2 cycles: 2     Cmp, Immediate   */
            0xCA => run!(dex, implied),         /* bytes: 1 cycles: 2     Dex, Implied     */
            0xCB => run!(axs, immediate),       /* bytes: 2 cycles: 2   * Axs, Immediate   */
            0xCC => run!(cpy, r_absolute),      /* bytes: 3 cycles: 4     Cpy, Absolute    */
            0xCD => run!(cmp, r_absolute),      /* bytes: 3 cycles: 4     Cmp, Absolute    */
            0xCE => run!(dec, rw_absolute),     /* bytes: 3 cycles: 6     Dec, Absolute    */
            0xCF => run!(dcp, rw_absolute),     /* bytes: 3 cycles: 6   * Dcp, Absolute    */
            0xD0 => run!(bne),                  /* bytes: 2 cycles: 2**   Bne, Relative    */
            0xD1 => run!(cmp, r_indirect_y),    /* bytes: 2 cycles: 5*    Cmp, IndirectY   */
            0xD2 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0xD3 => run!(dcp, rw_indirect_y),   /* bytes: 2 cycles: 8   * Dcp, IndirectY   */
            0xD4 => run!(skb, r_zero_page_x),   /* bytes: 2 cycles: 4   * Nop, ZeroPageX   */
            0xD5 => run!(cmp, r_zero_page_x),   /* bytes: 2 cycles: 4     Cmp, ZeroPageX   */
            0xD6 => run!(dec, rw_zero_page_x),  /* bytes: 2 cycles: 6     Dec, ZeroPageX   */
            0xD7 => run!(dcp, rw_zero_page_x),  /* bytes: 2 cycles: 6   * Dcp, ZeroPageX   */
            0xD8 => run!(cld, implied),         /* bytes: 1 cycles: 2     Cld, Implied     */
            0xD9 => run!(cmp, r_absolute_y),    /* bytes: 3 cycles: 4*    Cmp, AbsoluteY   */
            0xDA => run!(nop, implied),         /* bytes: 1 cycles: 2   * Nop, Implied     */
            0xDB => run!(dcp, rw_absolute_y),   /* bytes: 3 cycles: 7   * Dcp, AbsoluteY   */
            0xDC => run!(skb, r_absolute_x),    /* bytes: 3 cycles: 4*  * Nop, AbsoluteX   */
            0xDD => run!(cmp, r_absolute_x),    /* bytes: 3 cycles: 4*    Cmp, AbsoluteX   */
            0xDE => run!(dec, rw_absolute_x),   /* bytes: 3 cycles: 7     Dec, AbsoluteX   */
            0xDF => run!(dcp, rw_absolute_x),   /* bytes: 3 cycles: 7   * Dcp, AbsoluteX   */
            0xE0 => run!(cpx, immediate),       /* bytes: 2 cycles: 2     Cpx, Immediate   */
            0xE1 => run!(sbc, r_indirect_x),    /* bytes: 2 cycles: 6     Sbc, IndirectX   */
            0xE2 => run!(skb, immediate),       /* bytes: 2 cycles: 2   * Nop, Immediate   */
            0xE3 => run!(isc, rw_indirect_x),   /* bytes: 2 cycles: 8   * Isc, IndirectX   */
            0xE4 => run!(cpx, r_zero_page),     /* bytes: 2 cycles: 3     Cpx, ZeroPage    */
            0xE5 => run!(sbc, r_zero_page),     /* bytes: 2 cycles: 3     Sbc, ZeroPage    */
            0xE6 => run!(inc, rw_zero_page),    /* bytes: 2 cycles: 5     Inc, ZeroPage    */
            0xE7 => run!(isc, rw_zero_page),    /* bytes: 2 cycles: 5   * Isc, ZeroPage    */
            0xE8 => run!(inx, implied),         /* bytes: 1 cycles: 2     Inx, Implied     */
            0xE9 => run!(sbc, immediate),       /* bytes: 2 cycles: 2     Sbc, Immediate   */
            0xEA => run!(nop, implied),         /* bytes: 1 cycles: 2     Nop, Implied     */
            0xEB => run!(sbc, immediate),       /* bytes: 2 cycles: 2   * Sbc, Immediate   */
            0xEC => run!(cpx, r_absolute),      /* bytes: 3 cycles: 4     Cpx, Absolute    */
            0xED => run!(sbc, r_absolute),      /* bytes: 3 cycles: 4     Sbc, Absolute    */
            0xEE => run!(inc, rw_absolute),     /* bytes: 3 cycles: 6     Inc, Absolute    */
            0xEF => run!(isc, rw_absolute),     /* bytes: 3 cycles: 6   * Isc, Absolute    */
            0xF0 => run!(beq),                  /* bytes: 2 cycles: 2**   Beq, Relative    */
            0xF1 => run!(sbc, r_indirect_y),    /* bytes: 2 cycles: 5*    Sbc, IndirectY   */
            0xF2 => run!(jam),                  /* bytes: 1 cycles: -   * Jam, Implied     */
            0xF3 => run!(isc, rw_indirect_y),   /* bytes: 2 cycles: 8   * Isc, IndirectY   */
            0xF4 => run!(skb, r_zero_page_x),   /* bytes: 2 cycles: 4   * Nop, ZeroPageX   */
            0xF5 => run!(sbc, r_zero_page_x),   /* bytes: 2 cycles: 4     Sbc, ZeroPageX   */
            0xF6 => run!(inc, rw_zero_page_x),  /* bytes: 2 cycles: 6     Inc, ZeroPageX   */
            0xF7 => run!(isc, rw_zero_page_x),  /* bytes: 2 cycles: 6   * Isc, ZeroPageX   */
            0xF8 => run!(sed, implied),         /* bytes: 1 cycles: 2     Sed, Implied     */
            0xF9 => run!(sbc, r_absolute_y),    /* bytes: 3 cycles: 4*    Sbc, AbsoluteY   */
            0xFA => run!(nop, implied),         /* bytes: 1 cycles: 2   * Nop, Implied     */
            0xFB => run!(isc, rw_absolute_y),   /* bytes: 3 cycles: 7   * Isc, AbsoluteY   */
            0xFC => run!(skb, r_absolute_x),    /* bytes: 3 cycles: 4*  * Nop, AbsoluteX   */
            0xFD => run!(sbc, r_absolute_x),    /* bytes: 3 cycles: 4*    Sbc, AbsoluteX   */
            0xFE => run!(inc, rw_absolute_x),   /* bytes: 3 cycles: 7     Inc, AbsoluteX   */
            0xFF => run!(isc, rw_absolute_x),   /* bytes: 3 cycles: 7   * Isc, AbsoluteX   */
        }
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "Cpu | cycles: {:>8}, op: 0x{:02x} T{}, {:?}, [ {:?} ]",
               self.cycles, self.opcode, self.cycle, self.sequence, self.reg)
    }
}
