use crate::cpu::bus::CpuBus;
use crate::cpu::cycle;
use crate::cpu::flags;
use crate::cpu::{Cpu, Sequence, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use crate::utils::bits;

impl Cpu {
    // region Miscellaneous

    // Set current cycle to the last one.
    // It's actually the next to last cycle but this is always incremented later.
    pub(crate) fn finish(&mut self) { self.cycle = cycle::NEXT_TO_LAST }

    fn read_pc<B: CpuBus>(&mut self, bus: &mut B) -> u8 { bus.read(self.reg.get_pc()) }

    fn fetch_pc<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        let data = self.read_pc(bus);
        self.reg.set_next_pc();
        data
    }

    fn read_stack<B: CpuBus>(&mut self, bus: &mut B) -> u8 { bus.read(self.reg.get_stack_addr()) }

    fn push<B: CpuBus>(&mut self, bus: &mut B, data: u8) {
        bus.write(self.reg.get_stack_addr(), data);
        self.reg.set_inc_s(-1);
    }

    fn pull<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        self.reg.set_inc_s(1);
        self.read_stack(bus)
    }

    // Add an index to the latched base. The carry into the high byte is applied a cycle later.
    fn index_base(&mut self, index: u8) {
        self.addr = self.base.wrapping_add(index as u16);
        self.crossed = bits::page_crossed(self.base, self.addr);
    }

    // Effective address before the high byte is fixed.
    fn uncorrected(&self) -> u16 { bits::set_high(self.addr, bits::high(self.base)) }

    // Only reachable from a timing state no instruction produces. Freeze like a JAM.
    fn unexpected_cycle<T: Default>(&mut self) -> T {
        error!(target: "opcode", "opcode 0x{:02x} shouldn't reach cycle {}", self.opcode, self.cycle);
        self.sequence = Sequence::Jammed;
        self.finish();
        T::default()
    }

    // Which vector a BRK or an interrupt jumps to. A pending NMI takes over.
    fn select_vector(&mut self) {
        self.addr = if self.need_nmi {
            self.need_nmi = false;
            NMI_VECTOR
        } else {
            IRQ_VECTOR
        };
    }

    // endregion

    // region Interrupts

    // Break execution and load the interrupt vector
    // 2      PC      read next instruction byte (and throw it away), increment PC
    // 3    $0100,S   push PCH on stack, decrement S
    // 4    $0100,S   push PCL on stack, decrement S
    // 5    $0100,S   push P on stack with B set, decrement S
    // 6     $FFFE    fetch PCL
    // 7     $FFFF    fetch PCH
    pub fn brk<B: CpuBus>(&mut self, bus: &mut B) {
        match self.cycle {
            cycle::T2 => {
                trace!(target: "opcode", "brk");
                self.fetch_pc(bus);
            }
            cycle::T3 => self.push(bus, self.reg.get_pch()),
            cycle::T4 => self.push(bus, self.reg.get_pcl()),
            cycle::T5 => {
                self.select_vector();
                let p = self.reg.get_p() | flags::BREAK_COMMAND | flags::UNUSED;
                self.push(bus, p.into());
            }
            cycle::T6 => {
                let pcl = bus.read(self.addr);
                self.reg.set_pcl(pcl);
                self.reg.get_p_mut().set(flags::INTERRUPT_DISABLE);
            }
            cycle::T7 => {
                let pch = bus.read(self.addr.wrapping_add(1));
                self.reg.set_pch(pch);
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    // Hardware interrupt. Same as BRK but the PC is not incremented and B is clear.
    // 1 was the dummy opcode fetch.
    pub(crate) fn interrupt<B: CpuBus>(&mut self, bus: &mut B) {
        match self.cycle {
            cycle::T2 => { self.read_pc(bus); }
            cycle::T3 => self.push(bus, self.reg.get_pch()),
            cycle::T4 => self.push(bus, self.reg.get_pcl()),
            cycle::T5 => {
                self.select_vector();
                trace!(target: "opcode", "interrupt, vector: 0x{:04x}", self.addr);
                let mut p = self.reg.get_p() | flags::UNUSED;
                p.clear(flags::BREAK_COMMAND);
                self.push(bus, p.into());
            }
            cycle::T6 => {
                let pcl = bus.read(self.addr);
                self.reg.set_pcl(pcl);
                self.reg.get_p_mut().set(flags::INTERRUPT_DISABLE);
            }
            cycle::T7 => {
                let pch = bus.read(self.addr.wrapping_add(1));
                self.reg.set_pch(pch);
                self.sequence = Sequence::Instruction;
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    // Reset subroutine. Load the reset vector.
    // The stack cycles are reads, so nothing is written even though S moves.
    // 2     PC      read next instruction byte (and throw it away)
    // 3   $0100,S   read, decrement S
    // 4   $0100,S   read, decrement S
    // 5   $0100,S   read, decrement S
    // 6    $FFFC    fetch PCL
    // 7    $FFFD    fetch PCH
    pub(crate) fn rst<B: CpuBus>(&mut self, bus: &mut B) {
        match self.cycle {
            cycle::T2 => {
                trace!(target: "opcode", "rst");
                self.read_pc(bus);
            }
            cycle::T3 | cycle::T4 | cycle::T5 => {
                self.read_stack(bus);
                self.reg.set_inc_s(-1);
            }
            cycle::T6 => {
                let pcl = bus.read(RESET_VECTOR);
                self.reg.set_pcl(pcl);
                self.reg.get_p_mut().set(flags::INTERRUPT_DISABLE);
            }
            cycle::T7 => {
                let pch = bus.read(RESET_VECTOR + 1);
                self.reg.set_pch(pch);
                self.sequence = Sequence::Instruction;
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    // Jam. The CPU stops fetching until reset. Other chips keep running.
    // 2    PC     read next instruction byte (and throw it away)
    pub fn jam<B: CpuBus>(&mut self, bus: &mut B) {
        warn!(target: "opcode", "jam 0x{:02x} at 0x{:04x}", self.opcode, self.reg.get_pc().wrapping_sub(1));
        self.read_pc(bus);
        self.sequence = Sequence::Jammed;
        self.finish();
    }

    // endregion

    // region Jumps

    // 2    PC     fetch low address byte, increment PC
    // 3    PC     copy low address byte to PCL, fetch high address byte to PCH
    pub fn jmp_absolute<B: CpuBus>(&mut self, bus: &mut B) {
        match self.cycle {
            cycle::T2 => self.data = self.fetch_pc(bus),
            cycle::T3 => {
                let pch = self.read_pc(bus);
                self.reg.set_pc(bits::word(pch, self.data));
                trace!(target: "opcode", "jmp 0x{:04x}", self.reg.get_pc());
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    // 2     PC      fetch pointer address low, increment PC
    // 3     PC      fetch pointer address high, increment PC
    // 4   pointer   fetch low address to latch
    // 5  pointer+1* fetch PCH, copy latch to PCL
    // * The high byte of the pointer is not incremented when the low one wraps.
    pub fn jmp_indirect<B: CpuBus>(&mut self, bus: &mut B) {
        match self.cycle {
            cycle::T2 => self.data = self.fetch_pc(bus),
            cycle::T3 => {
                let high = self.fetch_pc(bus);
                self.base = bits::word(high, self.data);
            }
            cycle::T4 => self.data = bus.read(self.base),
            cycle::T5 => {
                let high = bus.read(bits::set_low(self.base, bits::low(self.base).wrapping_add(1)));
                self.reg.set_pc(bits::word(high, self.data));
                trace!(target: "opcode", "jmp (0x{:04x}) 0x{:04x}", self.base, self.reg.get_pc());
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    // 2    PC     fetch low address byte, increment PC
    // 3  $0100,S  internal operation
    // 4  $0100,S  push PCH on stack, decrement S
    // 5  $0100,S  push PCL on stack, decrement S
    // 6    PC     copy low address byte to PCL, fetch high address byte to PCH
    pub fn jsr<B: CpuBus>(&mut self, bus: &mut B) {
        match self.cycle {
            cycle::T2 => self.data = self.fetch_pc(bus),
            cycle::T3 => { self.read_stack(bus); }
            cycle::T4 => self.push(bus, self.reg.get_pch()),
            cycle::T5 => self.push(bus, self.reg.get_pcl()),
            cycle::T6 => {
                let pch = self.read_pc(bus);
                self.reg.set_pc(bits::word(pch, self.data));
                trace!(target: "opcode", "jsr 0x{:04x}", self.reg.get_pc());
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    // 2    PC     read next instruction byte (and throw it away)
    // 3  $0100,S  increment S
    // 4  $0100,S  pull P from stack, increment S
    // 5  $0100,S  pull PCL from stack, increment S
    // 6  $0100,S  pull PCH from stack
    pub fn rti<B: CpuBus>(&mut self, bus: &mut B) {
        match self.cycle {
            cycle::T2 => { self.read_pc(bus); }
            cycle::T3 => { self.read_stack(bus); }
            cycle::T4 => {
                let p = self.pull(bus);
                self.reg.set_p(p);
            }
            cycle::T5 => {
                let pcl = self.pull(bus);
                self.reg.set_pcl(pcl);
            }
            cycle::T6 => {
                let pch = self.pull(bus);
                self.reg.set_pch(pch);
                trace!(target: "opcode", "rti 0x{:04x}", self.reg.get_pc());
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    // 2    PC     read next instruction byte (and throw it away)
    // 3  $0100,S  increment S
    // 4  $0100,S  pull PCL from stack, increment S
    // 5  $0100,S  pull PCH from stack
    // 6    PC     increment PC
    pub fn rts<B: CpuBus>(&mut self, bus: &mut B) {
        match self.cycle {
            cycle::T2 => { self.read_pc(bus); }
            cycle::T3 => { self.read_stack(bus); }
            cycle::T4 => {
                let pcl = self.pull(bus);
                self.reg.set_pcl(pcl);
            }
            cycle::T5 => {
                let pch = self.pull(bus);
                self.reg.set_pch(pch);
            }
            cycle::T6 => {
                self.fetch_pc(bus);
                trace!(target: "opcode", "rts 0x{:04x}", self.reg.get_pc());
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    // 2     PC      fetch operand, increment PC
    // 3+    PC*     if taken, add operand to PCL
    // 4+    PC      fix PCH if the page was crossed
    fn branch<B: CpuBus>(&mut self, bus: &mut B, taken: bool) {
        match self.cycle {
            cycle::T2 => {
                self.data = self.fetch_pc(bus);
                if !taken { self.finish() }
            }
            cycle::T3 => {
                self.read_pc(bus);
                let pc = self.reg.get_pc();
                self.addr = pc.wrapping_add(self.data as i8 as u16);
                self.reg.set_pcl(bits::low(self.addr));
                if !bits::page_crossed(pc, self.addr) { self.finish() }
            }
            cycle::T4 => {
                self.read_pc(bus);
                self.reg.set_pc(self.addr);
                self.finish();
            }
            _ => self.unexpected_cycle(),
        }
    }

    pub fn bpl<B: CpuBus>(&mut self, bus: &mut B) { self.branch(bus, !self.reg.get_p().get_negative()) }
    pub fn bmi<B: CpuBus>(&mut self, bus: &mut B) { self.branch(bus, self.reg.get_p().get_negative()) }
    pub fn bvc<B: CpuBus>(&mut self, bus: &mut B) { self.branch(bus, !self.reg.get_p().get_overflow()) }
    pub fn bvs<B: CpuBus>(&mut self, bus: &mut B) { self.branch(bus, self.reg.get_p().get_overflow()) }
    pub fn bcc<B: CpuBus>(&mut self, bus: &mut B) { self.branch(bus, !self.reg.get_p().get_carry()) }
    pub fn bcs<B: CpuBus>(&mut self, bus: &mut B) { self.branch(bus, self.reg.get_p().get_carry()) }
    pub fn bne<B: CpuBus>(&mut self, bus: &mut B) { self.branch(bus, !self.reg.get_p().get_zero()) }
    pub fn beq<B: CpuBus>(&mut self, bus: &mut B) { self.branch(bus, self.reg.get_p().get_zero()) }

    // endregion

    // region Stack

    pub fn pha<B: CpuBus>(&mut self, bus: &mut B, _: ()) {
        trace!(target: "opcode", "pha");
        self.push(bus, self.reg.get_a());
    }

    pub fn php<B: CpuBus>(&mut self, bus: &mut B, _: ()) {
        trace!(target: "opcode", "php");
        let p = self.reg.get_p() | flags::BREAK_COMMAND | flags::UNUSED;
        self.push(bus, p.into());
    }

    pub fn pla<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        trace!(target: "opcode", "pla, data: 0x{:02x}", value);
        self.reg.write_a(value);
    }

    pub fn plp<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        trace!(target: "opcode", "plp, data: 0x{:02x}", value);
        self.reg.set_p(value);
    }

    // endregion

    // region Implied

    pub fn nop<B: CpuBus>(&mut self, _bus: &mut B, _: ()) {}

    // Unofficial NOPs that read memory.
    pub fn skb<B: CpuBus>(&mut self, _bus: &mut B, _value: u8) {}

    pub fn clc<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.get_p_mut().clear(flags::CARRY) }
    pub fn sec<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.get_p_mut().set(flags::CARRY) }
    pub fn cli<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.get_p_mut().clear(flags::INTERRUPT_DISABLE) }
    pub fn sei<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.get_p_mut().set(flags::INTERRUPT_DISABLE) }
    pub fn clv<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.get_p_mut().clear(flags::OVERFLOW) }
    pub fn cld<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.get_p_mut().clear(flags::DECIMAL_MODE) }
    pub fn sed<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.get_p_mut().set(flags::DECIMAL_MODE) }

    pub fn tax<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_x(self.reg.get_a()) }
    pub fn tay<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_y(self.reg.get_a()) }
    pub fn txa<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_a(self.reg.get_x()) }
    pub fn tya<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_a(self.reg.get_y()) }
    pub fn tsx<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_x(self.reg.get_s()) }
    // No flags
    pub fn txs<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.set_s(self.reg.get_x()) }

    pub fn inx<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_x(self.reg.get_x().wrapping_add(1)) }
    pub fn iny<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_y(self.reg.get_y().wrapping_add(1)) }
    pub fn dex<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_x(self.reg.get_x().wrapping_sub(1)) }
    pub fn dey<B: CpuBus>(&mut self, _bus: &mut B, _: ()) { self.reg.write_y(self.reg.get_y().wrapping_sub(1)) }

    // endregion

    // region Load

    pub fn lda<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        trace!(target: "opcode", "lda, data: 0x{:02x}", value);
        self.reg.write_a(value);
    }

    pub fn ldx<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        trace!(target: "opcode", "ldx, data: 0x{:02x}", value);
        self.reg.write_x(value);
    }

    pub fn ldy<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        trace!(target: "opcode", "ldy, data: 0x{:02x}", value);
        self.reg.write_y(value);
    }

    pub fn lax<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        trace!(target: "opcode", "lax, data: 0x{:02x}", value);
        self.reg.write_a(value);
        self.reg.write_x(value);
    }

    // endregion

    // region Store

    pub fn sta<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        trace!(target: "opcode", "sta, addr: 0x{:04x}", addr);
        bus.write(addr, self.reg.get_a());
    }

    pub fn stx<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        trace!(target: "opcode", "stx, addr: 0x{:04x}", addr);
        bus.write(addr, self.reg.get_x());
    }

    pub fn sty<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        trace!(target: "opcode", "sty, addr: 0x{:04x}", addr);
        bus.write(addr, self.reg.get_y());
    }

    pub fn sax<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        trace!(target: "opcode", "sax, addr: 0x{:04x}", addr);
        bus.write(addr, self.reg.get_a() & self.reg.get_x());
    }

    // The value is ANDed with the high byte of the base address plus one.
    // When indexing crossed a page the value also replaces the high byte of the address.
    fn unstable_store<B: CpuBus>(&mut self, bus: &mut B, addr: u16, value: u8) {
        let value = value & bits::high(self.base).wrapping_add(1);
        let addr = if self.crossed { bits::set_high(addr, value) } else { addr };
        trace!(target: "opcode", "unstable store, addr: 0x{:04x}, data: 0x{:02x}", addr, value);
        bus.write(addr, value);
    }

    pub fn sha<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        let value = self.reg.get_a() & self.reg.get_x();
        self.unstable_store(bus, addr, value);
    }

    pub fn shx<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        let value = self.reg.get_x();
        self.unstable_store(bus, addr, value);
    }

    pub fn shy<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        let value = self.reg.get_y();
        self.unstable_store(bus, addr, value);
    }

    pub fn tas<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        let value = self.reg.get_a() & self.reg.get_x();
        self.reg.set_s(value);
        self.unstable_store(bus, addr, value);
    }

    // endregion

    // region Arithmetic and logic

    pub fn ora<B: CpuBus>(&mut self, _bus: &mut B, value: u8) { self.reg.write_a(self.reg.get_a() | value) }
    pub fn and<B: CpuBus>(&mut self, _bus: &mut B, value: u8) { self.reg.write_a(self.reg.get_a() & value) }
    pub fn eor<B: CpuBus>(&mut self, _bus: &mut B, value: u8) { self.reg.write_a(self.reg.get_a() ^ value) }

    fn add(&mut self, value: u8) {
        let a = self.reg.get_a();
        let sum = a as u16 + value as u16 + self.reg.get_p().get_carry() as u16;
        let result = sum as u8;

        let p = self.reg.get_p_mut();
        p.change(flags::CARRY, sum > 0xff);
        p.change(flags::OVERFLOW, (a ^ result) & (value ^ result) & 0x80 != 0);
        self.reg.write_a(result);
    }

    // Decimal mode is not wired on this CPU.
    pub fn adc<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        trace!(target: "opcode", "adc, data: 0x{:02x}", value);
        self.add(value);
    }

    pub fn sbc<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        trace!(target: "opcode", "sbc, data: 0x{:02x}", value);
        self.add(!value);
    }

    pub fn cmp<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let a = self.reg.get_a();
        self.reg.get_p_mut().change_cmp(a, value);
    }

    pub fn cpx<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let x = self.reg.get_x();
        self.reg.get_p_mut().change_cmp(x, value);
    }

    pub fn cpy<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let y = self.reg.get_y();
        self.reg.get_p_mut().change_cmp(y, value);
    }

    pub fn bit<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let a = self.reg.get_a();
        let p = self.reg.get_p_mut();
        p.change(flags::ZERO, a & value == 0);
        p.change(flags::OVERFLOW, bits::is_set(value, 6));
        p.change(flags::NEGATIVE, bits::is_set(value, 7));
    }

    // AND then copy N into C.
    pub fn anc<B: CpuBus>(&mut self, bus: &mut B, value: u8) {
        self.and(bus, value);
        let negative = self.reg.get_p().get_negative();
        self.reg.get_p_mut().change(flags::CARRY, negative);
    }

    // AND then LSR A.
    pub fn alr<B: CpuBus>(&mut self, bus: &mut B, value: u8) {
        self.and(bus, value);
        let a = self.shift_right(self.reg.get_a(), false);
        self.reg.write_a(a);
    }

    // AND then ROR A. C is bit 6, V is bit 6 xor bit 5.
    pub fn arr<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let carry = self.reg.get_p().get_carry() as u8;
        let result = ((self.reg.get_a() & value) >> 1) | (carry << 7);
        self.reg.write_a(result);

        let p = self.reg.get_p_mut();
        p.change(flags::CARRY, bits::is_set(result, 6));
        p.change(flags::OVERFLOW, bits::is_set(result, 6) != bits::is_set(result, 5));
    }

    // The chip constant depends on the console. 0xee is the common one.
    const MAGIC: u8 = 0xee;

    pub fn xaa<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let result = (self.reg.get_a() | Self::MAGIC) & self.reg.get_x() & value;
        self.reg.write_a(result);
    }

    pub fn lxa<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let result = (self.reg.get_a() | Self::MAGIC) & value;
        self.reg.write_a(result);
        self.reg.write_x(result);
    }

    // X = (A & X) - value, carry as in CMP.
    pub fn axs<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let and = self.reg.get_a() & self.reg.get_x();
        self.reg.get_p_mut().change(flags::CARRY, and >= value);
        self.reg.write_x(and.wrapping_sub(value));
    }

    pub fn las<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let result = value & self.reg.get_s();
        self.reg.set_s(result);
        self.reg.write_a(result);
        self.reg.write_x(result);
    }

    // endregion

    // region Read modify write

    fn shift_left(&mut self, value: u8, carry_in: bool) -> u8 {
        self.reg.get_p_mut().change(flags::CARRY, bits::is_set(value, 7));
        (value << 1) | carry_in as u8
    }

    fn shift_right(&mut self, value: u8, carry_in: bool) -> u8 {
        self.reg.get_p_mut().change(flags::CARRY, bits::is_set(value, 0));
        (value >> 1) | ((carry_in as u8) << 7)
    }

    // Store the result and update Z and N.
    fn write_result<B: CpuBus>(&mut self, bus: &mut B, addr: u16, result: u8) -> u8 {
        bus.write(addr, result);
        self.reg.get_p_mut().change_zero_negative(result);
        result
    }

    pub fn asl<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let result = self.shift_left(value, false);
        self.write_result(bus, addr, result);
    }

    pub fn lsr<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let result = self.shift_right(value, false);
        self.write_result(bus, addr, result);
    }

    pub fn rol<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let carry = self.reg.get_p().get_carry();
        let result = self.shift_left(value, carry);
        self.write_result(bus, addr, result);
    }

    pub fn ror<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let carry = self.reg.get_p().get_carry();
        let result = self.shift_right(value, carry);
        self.write_result(bus, addr, result);
    }

    pub fn inc<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        self.write_result(bus, addr, value.wrapping_add(1));
    }

    pub fn dec<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        self.write_result(bus, addr, value.wrapping_sub(1));
    }

    pub fn asl_acc<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let result = self.shift_left(value, false);
        self.reg.write_a(result);
    }

    pub fn lsr_acc<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let result = self.shift_right(value, false);
        self.reg.write_a(result);
    }

    pub fn rol_acc<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let carry = self.reg.get_p().get_carry();
        let result = self.shift_left(value, carry);
        self.reg.write_a(result);
    }

    pub fn ror_acc<B: CpuBus>(&mut self, _bus: &mut B, value: u8) {
        let carry = self.reg.get_p().get_carry();
        let result = self.shift_right(value, carry);
        self.reg.write_a(result);
    }

    // ASL then ORA.
    pub fn slo<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let result = self.shift_left(value, false);
        bus.write(addr, result);
        self.ora(bus, result);
    }

    // ROL then AND.
    pub fn rla<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let carry = self.reg.get_p().get_carry();
        let result = self.shift_left(value, carry);
        bus.write(addr, result);
        self.and(bus, result);
    }

    // LSR then EOR.
    pub fn sre<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let result = self.shift_right(value, false);
        bus.write(addr, result);
        self.eor(bus, result);
    }

    // ROR then ADC.
    pub fn rra<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let carry = self.reg.get_p().get_carry();
        let result = self.shift_right(value, carry);
        bus.write(addr, result);
        self.add(result);
    }

    // DEC then CMP.
    pub fn dcp<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let result = value.wrapping_sub(1);
        bus.write(addr, result);
        self.cmp(bus, result);
    }

    // INC then SBC.
    pub fn isc<B: CpuBus>(&mut self, bus: &mut B, (addr, value): (u16, u8)) {
        let result = value.wrapping_add(1);
        bus.write(addr, result);
        self.add(!result);
    }

    // endregion

    // region Addressing modes

    // The address builders below are called once per cycle.
    // They return None while the address is being built and the address itself from the first cycle it is ready on.

    // Zero page
    // 2    PC     fetch address, increment PC
    fn zero_page<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        match self.cycle {
            cycle::T2 => {
                self.addr = self.fetch_pc(bus) as u16;
                None
            }
            _ => Some(self.addr),
        }
    }

    // Zero page indexed
    // 2     PC      fetch address, increment PC
    // 3   address   read from address, add index register to it. The page is never crossed.
    fn zero_page_indexed<B: CpuBus>(&mut self, bus: &mut B, index: u8) -> Option<u16> {
        match self.cycle {
            cycle::T2 => {
                self.addr = self.fetch_pc(bus) as u16;
                None
            }
            cycle::T3 => {
                bus.read(self.addr);
                self.addr = (self.addr as u8).wrapping_add(index) as u16;
                None
            }
            _ => Some(self.addr),
        }
    }

    // Absolute
    // 2    PC     fetch low byte of address, increment PC
    // 3    PC     fetch high byte of address, increment PC
    fn absolute<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        match self.cycle {
            cycle::T2 => {
                self.data = self.fetch_pc(bus);
                None
            }
            cycle::T3 => {
                let high = self.fetch_pc(bus);
                self.addr = bits::word(high, self.data);
                self.base = self.addr;
                None
            }
            _ => Some(self.addr),
        }
    }

    // Absolute indexed, as used by writes and read modify write.
    // 2     PC       fetch low byte of address, increment PC
    // 3     PC       fetch high byte of address, add index register to low address byte, increment PC
    // 4  address+I*  read from effective address, fix the high byte of effective address
    fn absolute_indexed<B: CpuBus>(&mut self, bus: &mut B, index: u8) -> Option<u16> {
        match self.cycle {
            cycle::T2 => {
                self.data = self.fetch_pc(bus);
                None
            }
            cycle::T3 => {
                let high = self.fetch_pc(bus);
                self.base = bits::word(high, self.data);
                self.index_base(index);
                None
            }
            cycle::T4 => {
                bus.read(self.uncorrected());
                None
            }
            _ => Some(self.addr),
        }
    }

    // Indexed indirect by X
    // 2      PC       fetch pointer address, increment PC
    // 3    pointer    read from the address, add X to it
    // 4   pointer+X   fetch effective address low
    // 5  pointer+X+1  fetch effective address high
    fn indirect_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        match self.cycle {
            cycle::T2 => {
                self.base = self.fetch_pc(bus) as u16;
                None
            }
            cycle::T3 => {
                bus.read(self.base);
                self.base = (self.base as u8).wrapping_add(self.reg.get_x()) as u16;
                None
            }
            cycle::T4 => {
                self.data = bus.read(self.base);
                None
            }
            cycle::T5 => {
                let high = bus.read((self.base as u8).wrapping_add(1) as u16);
                self.addr = bits::word(high, self.data);
                self.base = self.addr;
                None
            }
            _ => Some(self.addr),
        }
    }

    // Indirect indexed by Y, as used by writes and read modify write.
    // 2      PC       fetch pointer address, increment PC
    // 3    pointer    fetch effective address low
    // 4   pointer+1   fetch effective address high, add Y to low byte of effective address
    // 5   address+Y*  read from effective address, fix high byte of effective address
    fn indirect_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        match self.cycle {
            cycle::T2 => {
                self.base = self.fetch_pc(bus) as u16;
                None
            }
            cycle::T3 => {
                self.data = bus.read(self.base);
                None
            }
            cycle::T4 => {
                let high = bus.read((self.base as u8).wrapping_add(1) as u16);
                self.base = bits::word(high, self.data);
                self.index_base(self.reg.get_y());
                None
            }
            cycle::T5 => {
                bus.read(self.uncorrected());
                None
            }
            _ => Some(self.addr),
        }
    }

    // Read, write the old value back, then let the operation write the new one.
    fn modify<B: CpuBus>(&mut self, bus: &mut B, addr: u16, first: u8) -> Option<(u16, u8)> {
        match self.cycle - first {
            0 => {
                self.data = bus.read(addr);
                None
            }
            1 => {
                bus.write(addr, self.data);
                None
            }
            _ => {
                self.finish();
                Some((addr, self.data))
            }
        }
    }

    // Read from an indexed address. The fix up cycle is skipped if the page was not crossed.
    fn read_indexed<B: CpuBus>(&mut self, bus: &mut B, ready: u8) -> Option<u8> {
        if self.cycle == ready {
            let value = bus.read(self.uncorrected());
            if self.crossed {
                return None;
            }
            self.finish();
            return Some(value);
        }

        self.finish();
        Some(bus.read(self.addr))
    }

    // endregion

    // region Write modes

    pub fn w_zero_page<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        let addr = self.zero_page(bus)?;
        self.finish();
        Some(addr)
    }

    pub fn w_zero_page_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        let addr = self.zero_page_indexed(bus, self.reg.get_x())?;
        self.finish();
        Some(addr)
    }

    pub fn w_zero_page_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        let addr = self.zero_page_indexed(bus, self.reg.get_y())?;
        self.finish();
        Some(addr)
    }

    pub fn w_absolute<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        let addr = self.absolute(bus)?;
        self.finish();
        Some(addr)
    }

    pub fn w_absolute_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        let addr = self.absolute_indexed(bus, self.reg.get_x())?;
        self.finish();
        Some(addr)
    }

    pub fn w_absolute_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        let addr = self.absolute_indexed(bus, self.reg.get_y())?;
        self.finish();
        Some(addr)
    }

    pub fn w_indirect_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        let addr = self.indirect_x(bus)?;
        self.finish();
        Some(addr)
    }

    pub fn w_indirect_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<u16> {
        let addr = self.indirect_y(bus)?;
        self.finish();
        Some(addr)
    }

    // Push
    // 2    PC     read next instruction byte (and throw it away)
    // 3  $0100,S  push register on stack, decrement S
    pub fn w_stack<B: CpuBus>(&mut self, bus: &mut B) -> Option<()> {
        match self.cycle {
            cycle::T2 => {
                self.read_pc(bus);
                None
            }
            cycle::T3 => {
                self.finish();
                Some(())
            }
            _ => self.unexpected_cycle(),
        }
    }

    // endregion

    // region Read modes

    // Implied
    // 2    PC     read next instruction byte (and throw it away)
    pub fn implied<B: CpuBus>(&mut self, bus: &mut B) -> Option<()> {
        self.read_pc(bus);
        self.finish();
        Some(())
    }

    pub fn accumulator<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        self.read_pc(bus);
        self.finish();
        Some(self.reg.get_a())
    }

    // Immediate
    // 2    PC     fetch value, increment PC
    pub fn immediate<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        self.finish();
        Some(self.fetch_pc(bus))
    }

    pub fn r_zero_page<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        let addr = self.w_zero_page(bus)?;
        Some(bus.read(addr))
    }

    pub fn r_zero_page_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        let addr = self.w_zero_page_x(bus)?;
        Some(bus.read(addr))
    }

    pub fn r_zero_page_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        let addr = self.w_zero_page_y(bus)?;
        Some(bus.read(addr))
    }

    pub fn r_absolute<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        let addr = self.w_absolute(bus)?;
        Some(bus.read(addr))
    }

    // Absolute indexed
    // 2     PC       fetch low byte of address, increment PC
    // 3     PC       fetch high byte of address, add index register to low address byte, increment PC
    // 4  address+I*  read from effective address, fix the high byte of effective address
    // 5+ address+I   re-read from effective address
    fn r_absolute_indexed<B: CpuBus>(&mut self, bus: &mut B, index: u8) -> Option<u8> {
        match self.cycle {
            cycle::T2 | cycle::T3 => self.absolute_indexed(bus, index).and(None),
            _ => self.read_indexed(bus, cycle::T4),
        }
    }

    pub fn r_absolute_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        let index = self.reg.get_x();
        self.r_absolute_indexed(bus, index)
    }

    pub fn r_absolute_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        let index = self.reg.get_y();
        self.r_absolute_indexed(bus, index)
    }

    pub fn r_indirect_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        let addr = self.w_indirect_x(bus)?;
        Some(bus.read(addr))
    }

    // Indirect indexed by Y
    // 2      PC       fetch pointer address, increment PC
    // 3    pointer    fetch effective address low
    // 4   pointer+1   fetch effective address high, add Y to low byte of effective address
    // 5   address+Y*  read from effective address, fix high byte of effective address
    // 6+  address+Y   read from effective address
    pub fn r_indirect_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        match self.cycle {
            cycle::T2 | cycle::T3 | cycle::T4 => self.indirect_y(bus).and(None),
            _ => self.read_indexed(bus, cycle::T5),
        }
    }

    // Pull
    // 2    PC     read next instruction byte (and throw it away)
    // 3  $0100,S  increment S
    // 4  $0100,S  pull register from stack
    pub fn r_stack<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        match self.cycle {
            cycle::T2 => {
                self.read_pc(bus);
                None
            }
            cycle::T3 => {
                self.read_stack(bus);
                None
            }
            cycle::T4 => {
                self.finish();
                Some(self.pull(bus))
            }
            _ => self.unexpected_cycle(),
        }
    }

    // endregion

    // region Read modify write modes

    pub fn rw_zero_page<B: CpuBus>(&mut self, bus: &mut B) -> Option<(u16, u8)> {
        let addr = self.zero_page(bus)?;
        self.modify(bus, addr, cycle::T3)
    }

    pub fn rw_zero_page_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<(u16, u8)> {
        let addr = self.zero_page_indexed(bus, self.reg.get_x())?;
        self.modify(bus, addr, cycle::T4)
    }

    pub fn rw_absolute<B: CpuBus>(&mut self, bus: &mut B) -> Option<(u16, u8)> {
        let addr = self.absolute(bus)?;
        self.modify(bus, addr, cycle::T4)
    }

    pub fn rw_absolute_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<(u16, u8)> {
        let addr = self.absolute_indexed(bus, self.reg.get_x())?;
        self.modify(bus, addr, cycle::T5)
    }

    pub fn rw_absolute_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<(u16, u8)> {
        let addr = self.absolute_indexed(bus, self.reg.get_y())?;
        self.modify(bus, addr, cycle::T5)
    }

    pub fn rw_indirect_x<B: CpuBus>(&mut self, bus: &mut B) -> Option<(u16, u8)> {
        let addr = self.indirect_x(bus)?;
        self.modify(bus, addr, cycle::T6)
    }

    pub fn rw_indirect_y<B: CpuBus>(&mut self, bus: &mut B) -> Option<(u16, u8)> {
        let addr = self.indirect_y(bus)?;
        self.modify(bus, addr, cycle::T6)
    }

    // endregion
}

#[cfg(test)]
mod tests {
    use crate::cpu::bus::FlatBus;
    use crate::cpu::{Cpu, DmcDma, IllegalOpcodes, OamDma, Sequence};
    use crate::cpu::{cycle, flags};
    use crate::error::Error;

    // Run the reset sequence and return a CPU ready to fetch at 0x8000.
    fn boot(code: &[u8]) -> (Cpu, FlatBus) {
        let mut bus = FlatBus::with_program(0x8000, code);
        let mut cpu = Cpu::new(IllegalOpcodes::Emulate);
        cpu.step_instruction(&mut bus).unwrap();
        (cpu, bus)
    }

    fn run(cpu: &mut Cpu, bus: &mut FlatBus, instructions: usize) -> Vec<u64> {
        (0..instructions).map(|_| cpu.step_instruction(bus).unwrap()).collect()
    }

    #[test]
    fn reset_takes_seven_cycles() {
        let (cpu, bus) = boot(&[0xea]);
        assert_eq!(cpu.cycles(), 7);
        assert_eq!(cpu.reg.get_pc(), 0x8000);
        assert_eq!(cpu.reg.get_s(), 0xfd);
        assert!(cpu.reg.get_p().get_interrupt_disable());
        // Reset never writes.
        assert!(bus.writes.is_empty());
    }

    #[test]
    fn adc_sets_overflow_and_carry() {
        // LDA #$7f; ADC #$01; CLC; LDA #$ff; ADC #$01
        let (mut cpu, mut bus) = boot(&[0xa9, 0x7f, 0x69, 0x01, 0x18, 0xa9, 0xff, 0x69, 0x01]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.reg.get_a(), 0x80);
        assert!(cpu.reg.get_p().get_overflow());
        assert!(!cpu.reg.get_p().get_carry());

        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.reg.get_a(), 0x00);
        assert!(cpu.reg.get_p().get_carry());
        assert!(cpu.reg.get_p().get_zero());
        assert!(!cpu.reg.get_p().get_overflow());
    }

    #[test]
    fn sbc_borrows() {
        // SEC; LDA #$00; SBC #$01
        let (mut cpu, mut bus) = boot(&[0x38, 0xa9, 0x00, 0xe9, 0x01]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.reg.get_a(), 0xff);
        assert!(!cpu.reg.get_p().get_carry());
        assert!(cpu.reg.get_p().get_negative());
    }

    #[test]
    fn page_crossing_costs_a_cycle() {
        // LDX #$01; LDA $80fe,X; LDA $80ff,X
        let (mut cpu, mut bus) = boot(&[0xa2, 0x01, 0xbd, 0xfe, 0x80, 0xbd, 0xff, 0x80]);
        let cycles = run(&mut cpu, &mut bus, 3);
        assert_eq!(cycles, vec![2, 4, 5]);
    }

    #[test]
    fn stores_never_skip_the_fixup_cycle() {
        // LDY #$00; STA $0200,Y; STA ($10),Y
        let (mut cpu, mut bus) = boot(&[0xa0, 0x00, 0x99, 0x00, 0x02, 0x91, 0x10]);
        let cycles = run(&mut cpu, &mut bus, 3);
        assert_eq!(cycles, vec![2, 5, 6]);
    }

    #[test]
    fn read_modify_write_writes_twice() {
        // INC $10
        let (mut cpu, mut bus) = boot(&[0xe6, 0x10]);
        bus.mem[0x10] = 0x41;
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, vec![5]);
        assert_eq!(bus.writes, vec![(0x10, 0x41), (0x10, 0x42)]);
    }

    #[test]
    fn branch_timing() {
        // BNE +2 not taken (Z set by LDA #0), BEQ +0 taken same page
        let (mut cpu, mut bus) = boot(&[0xa9, 0x00, 0xd0, 0x02, 0xf0, 0x00, 0xea]);
        let cycles = run(&mut cpu, &mut bus, 3);
        assert_eq!(cycles, vec![2, 2, 3]);
        assert_eq!(cpu.reg.get_pc(), 0x8006);
    }

    #[test]
    fn branch_across_page_takes_four_cycles() {
        let mut bus = FlatBus::with_program(0x80fc, &[0x18, 0x90, 0x02]);
        let mut cpu = Cpu::new(IllegalOpcodes::Emulate);
        cpu.step_instruction(&mut bus).unwrap();
        let cycles = run(&mut cpu, &mut bus, 2);
        assert_eq!(cycles, vec![2, 4]);
        assert_eq!(cpu.reg.get_pc(), 0x8101);
    }

    #[test]
    fn jsr_and_rts() {
        // JSR $8010 ... at $8010: RTS
        let mut code = vec![0x20, 0x10, 0x80, 0xea];
        code.resize(0x10, 0xea);
        code.push(0x60);
        let (mut cpu, mut bus) = boot(&code);
        let cycles = run(&mut cpu, &mut bus, 2);
        assert_eq!(cycles, vec![6, 6]);
        assert_eq!(cpu.reg.get_pc(), 0x8003);
        assert_eq!(bus.mem[0x01fd], 0x80);
        assert_eq!(bus.mem[0x01fc], 0x02);
    }

    #[test]
    fn jmp_indirect_wraps_in_page() {
        let (mut cpu, mut bus) = boot(&[0x6c, 0xff, 0x02]);
        bus.mem[0x02ff] = 0x34;
        bus.mem[0x0200] = 0x12;
        bus.mem[0x0300] = 0x56;
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, vec![5]);
        assert_eq!(cpu.reg.get_pc(), 0x1234);
    }

    #[test]
    fn php_pushes_break_and_unused() {
        // CLI; PHP
        let (mut cpu, mut bus) = boot(&[0x58, 0x08]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(bus.mem[0x01fd], (flags::BREAK_COMMAND | flags::UNUSED).0);
    }

    #[test]
    fn brk_jumps_through_irq_vector() {
        let (mut cpu, mut bus) = boot(&[0x00, 0xff]);
        bus.mem[0xfffe] = 0x00;
        bus.mem[0xffff] = 0x90;
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, vec![7]);
        assert_eq!(cpu.reg.get_pc(), 0x9000);
        // Return address skips the padding byte.
        assert_eq!(bus.mem[0x01fc], 0x02);
        assert_eq!(bus.mem[0x01fb] & flags::BREAK_COMMAND.0, flags::BREAK_COMMAND.0);
    }

    #[test]
    fn nmi_is_edge_triggered() {
        let (mut cpu, mut bus) = boot(&[0xea; 16]);
        bus.mem[0xfffa] = 0x00;
        bus.mem[0xfffb] = 0x90;
        bus.load(0x9000, &[0xea, 0xea]);

        bus.nmi = true;
        // The NOP that sees the edge finishes first.
        run(&mut cpu, &mut bus, 1);
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, vec![7]);
        assert_eq!(cpu.reg.get_pc(), 0x9000);

        // Line still high, no new edge.
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.reg.get_pc(), 0x9002);
    }

    #[test]
    fn irq_is_masked_by_i() {
        // CLI; NOP; NOP
        let (mut cpu, mut bus) = boot(&[0xea, 0x58, 0xea, 0xea]);
        bus.mem[0xfffe] = 0x00;
        bus.mem[0xffff] = 0x90;
        bus.irq = true;

        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg.get_pc(), 0x8001);

        // CLI takes effect after the next instruction.
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.reg.get_pc(), 0x8003);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg.get_pc(), 0x9000);
        assert!(cpu.reg.get_p().get_interrupt_disable());
        // B clear in the pushed status.
        assert_eq!(bus.mem[0x01fb] & flags::BREAK_COMMAND.0, 0);
    }

    #[test]
    fn lax_and_sax() {
        // LAX $10; SAX $11
        let (mut cpu, mut bus) = boot(&[0xa7, 0x10, 0x87, 0x11]);
        bus.mem[0x10] = 0x5a;
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.reg.get_a(), 0x5a);
        assert_eq!(cpu.reg.get_x(), 0x5a);
        assert_eq!(bus.mem[0x11], 0x5a);
    }

    #[test]
    fn dcp_and_isc() {
        // LDA #$40; DCP $10; ISC $11
        let (mut cpu, mut bus) = boot(&[0xa9, 0x40, 0xc7, 0x10, 0x38, 0xe7, 0x11]);
        bus.mem[0x10] = 0x41;
        bus.mem[0x11] = 0x0f;
        let cycles = run(&mut cpu, &mut bus, 4);
        assert_eq!(cycles, vec![2, 5, 2, 5]);
        assert_eq!(bus.mem[0x10], 0x40);
        assert_eq!(bus.mem[0x11], 0x10);
        assert_eq!(cpu.reg.get_a(), 0x30);
    }

    #[test]
    fn arr_flags() {
        // SEC; LDA #$ff; ARR #$ff
        let (mut cpu, mut bus) = boot(&[0x38, 0xa9, 0xff, 0x6b, 0xff]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.reg.get_a(), 0xff);
        assert!(cpu.reg.get_p().get_carry());
        assert!(!cpu.reg.get_p().get_overflow());
    }

    #[test]
    fn axs_subtracts_from_a_and_x() {
        // LDA #$0f; LDX #$ff; AXS #$05
        let (mut cpu, mut bus) = boot(&[0xa9, 0x0f, 0xa2, 0xff, 0xcb, 0x05]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.reg.get_x(), 0x0a);
        assert!(cpu.reg.get_p().get_carry());
    }

    #[test]
    fn shx_masks_with_high_byte() {
        // LDX #$ff; LDY #$01; SHX $02ff,Y -> crosses to 0x0300, high byte replaced
        let (mut cpu, mut bus) = boot(&[0xa2, 0xff, 0xa0, 0x01, 0x9e, 0xff, 0x02]);
        run(&mut cpu, &mut bus, 3);
        // X & (0x02 + 1) = 0x03, stored at 0x0300 with high byte 0x03.
        assert_eq!(bus.mem[0x0300], 0x03);

        // No crossing: plain masked store.
        let (mut cpu, mut bus) = boot(&[0xa2, 0xff, 0xa0, 0x00, 0x9e, 0x10, 0x02]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(bus.mem[0x0210], 0x03);
    }

    #[test]
    fn jam_freezes_the_cpu() {
        let (mut cpu, mut bus) = boot(&[0x02, 0xea]);
        run(&mut cpu, &mut bus, 1);
        assert!(cpu.jammed());
        let pc = cpu.reg.get_pc();
        for _ in 0..10 {
            cpu.step(&mut bus).unwrap();
        }
        assert_eq!(cpu.reg.get_pc(), pc);

        cpu.reset();
        cpu.step_instruction(&mut bus).unwrap();
        assert!(!cpu.jammed());
        assert_eq!(cpu.reg.get_pc(), 0x8000);
    }

    #[test]
    fn halt_policy_reports_illegal_opcodes() {
        let mut bus = FlatBus::with_program(0x8000, &[0xea, 0xa7, 0x10]);
        let mut cpu = Cpu::new(IllegalOpcodes::Halt);
        cpu.step_instruction(&mut bus).unwrap();
        cpu.step_instruction(&mut bus).unwrap();
        match cpu.step_instruction(&mut bus) {
            Err(crate::error::Error::IllegalOpcode { opcode, pc }) => {
                assert_eq!(opcode, 0xa7);
                assert_eq!(pc, 0x8001);
            }
            other => panic!("expected illegal opcode, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn impossible_cycle_jams() {
        // PHA
        let (mut cpu, mut bus) = boot(&[0x48]);
        cpu.step(&mut bus).unwrap();
        cpu.cycle = cycle::T5;
        cpu.step(&mut bus).unwrap();
        assert!(cpu.jammed());
        assert!(bus.writes.is_empty());

        let cycles = cpu.cycles();
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.cycles(), cycles + 3);
        assert!(bus.writes.is_empty());
    }

    #[test]
    fn validate_timing_state() {
        let (mut cpu, _) = boot(&[0xea]);
        assert!(cpu.validate().is_ok());

        cpu.cycle = 0;
        assert!(matches!(cpu.validate(), Err(Error::InvalidSaveState(_))));

        cpu.cycle = cycle::T8;
        assert!(cpu.validate().is_ok());
        cpu.sequence = Sequence::Reset;
        assert!(matches!(cpu.validate(), Err(Error::InvalidSaveState(_))));

        cpu.cycle = cycle::T1;
        cpu.sequence = Sequence::Instruction;
        cpu.dmc_dma = Some(DmcDma { addr: 0xc000, remaining: 0 });
        assert!(matches!(cpu.validate(), Err(Error::InvalidSaveState(_))));

        cpu.dmc_dma = None;
        cpu.oam_dma = Some(OamDma { page: 0x02, setup: 0, step: 512, data: 0 });
        assert!(matches!(cpu.validate(), Err(Error::InvalidSaveState(_))));
    }
}
