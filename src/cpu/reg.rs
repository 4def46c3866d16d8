use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cpu::flags;
use crate::cpu::flags::Flags;
use crate::utils::bits;

// Programmer visible registers.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reg {
    a: u8,
    x: u8,
    y: u8,
    pc: u16,
    p: Flags,
    s: u8,
}

impl fmt::Debug for Reg {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let p = self.p;
        write!(formatter,
               "Regs | a: {:02x}, x: {:02x}, y: {:02x}, pc: {:04x}, s: {:02x}, p: {:02x} {}{}__{}{}{}{}",
               self.a, self.x, self.y, self.pc, self.s, p.0,
               if p.get_negative() { 'n' } else { '_' },
               if p.get_overflow() { 'v' } else { '_' },
               if p.get_decimal_mode() { 'd' } else { '_' },
               if p.get_interrupt_disable() { 'i' } else { '_' },
               if p.get_zero() { 'z' } else { '_' },
               if p.get_carry() { 'c' } else { '_' })
    }
}

// - get: read the register.
// - set: store without touching the flags.
// - write: store and update Zero and Negative.
impl Reg {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            p: flags::INTERRUPT_DISABLE | flags::UNUSED,
            s: 0,
        }
    }

    pub fn get_a(&self) -> u8 { self.a }
    pub fn get_x(&self) -> u8 { self.x }
    pub fn get_y(&self) -> u8 { self.y }
    pub fn get_s(&self) -> u8 { self.s }
    pub fn get_pc(&self) -> u16 { self.pc }
    pub fn get_pcl(&self) -> u8 { bits::low(self.pc) }
    pub fn get_pch(&self) -> u8 { bits::high(self.pc) }
    pub fn get_p(&self) -> Flags { self.p }
    pub fn get_p_mut(&mut self) -> &mut Flags { &mut self.p }
    pub fn get_stack_addr(&self) -> u16 { 0x0100 | self.s as u16 }

    pub fn set_a(&mut self, data: u8) { self.a = data }
    pub fn set_x(&mut self, data: u8) { self.x = data }
    pub fn set_y(&mut self, data: u8) { self.y = data }
    pub fn set_s(&mut self, data: u8) { self.s = data }
    pub fn set_pc(&mut self, pc: u16) { self.pc = pc }
    pub fn set_pcl(&mut self, pcl: u8) { self.pc = bits::set_low(self.pc, pcl) }
    pub fn set_pch(&mut self, pch: u8) { self.pc = bits::set_high(self.pc, pch) }
    pub fn set_next_pc(&mut self) { self.pc = self.pc.wrapping_add(1) }

    // Stack pointer stays inside page one.
    pub fn set_inc_s(&mut self, data: i8) { self.s = self.s.wrapping_add(data as u8) }

    // B and U are not stored in the register.
    pub fn set_p(&mut self, data: u8) {
        let mut p = Flags(data);
        p.copy(self.p, flags::STACK_ONLY);
        self.p = p;
    }

    pub fn write_a(&mut self, data: u8) {
        self.a = data;
        self.p.change_zero_negative(data);
    }

    pub fn write_x(&mut self, data: u8) {
        self.x = data;
        self.p.change_zero_negative(data);
    }

    pub fn write_y(&mut self, data: u8) {
        self.y = data;
        self.p.change_zero_negative(data);
    }
}

impl Default for Reg {
    fn default() -> Self { Self::new() }
}
