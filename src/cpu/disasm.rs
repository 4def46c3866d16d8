use crate::cpu::bus::CpuBus;
use crate::cpu::Cpu;
use crate::utils::bits;

// Operand layout of an instruction, for disassembly only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl Mode {
    pub fn len(self) -> u16 {
        match self {
            Mode::Implied | Mode::Accumulator => 1,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 3,
            _ => 2,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub mode: Mode,
    // False for the unofficial opcodes.
    pub official: bool,
}

const fn i(mnemonic: &'static str, mode: Mode, official: bool) -> Instruction {
    Instruction { mnemonic, mode, official }
}

use Mode::*;

pub static INSTRUCTIONS: [Instruction; 256] = [
    /* 00 */ i("BRK", Implied, true),
    /* 01 */ i("ORA", IndirectX, true),
    /* 02 */ i("JAM", Implied, false),
    /* 03 */ i("SLO", IndirectX, false),
    /* 04 */ i("NOP", ZeroPage, false),
    /* 05 */ i("ORA", ZeroPage, true),
    /* 06 */ i("ASL", ZeroPage, true),
    /* 07 */ i("SLO", ZeroPage, false),
    /* 08 */ i("PHP", Implied, true),
    /* 09 */ i("ORA", Immediate, true),
    /* 0A */ i("ASL", Accumulator, true),
    /* 0B */ i("ANC", Immediate, false),
    /* 0C */ i("NOP", Absolute, false),
    /* 0D */ i("ORA", Absolute, true),
    /* 0E */ i("ASL", Absolute, true),
    /* 0F */ i("SLO", Absolute, false),
    /* 10 */ i("BPL", Relative, true),
    /* 11 */ i("ORA", IndirectY, true),
    /* 12 */ i("JAM", Implied, false),
    /* 13 */ i("SLO", IndirectY, false),
    /* 14 */ i("NOP", ZeroPageX, false),
    /* 15 */ i("ORA", ZeroPageX, true),
    /* 16 */ i("ASL", ZeroPageX, true),
    /* 17 */ i("SLO", ZeroPageX, false),
    /* 18 */ i("CLC", Implied, true),
    /* 19 */ i("ORA", AbsoluteY, true),
    /* 1A */ i("NOP", Implied, false),
    /* 1B */ i("SLO", AbsoluteY, false),
    /* 1C */ i("NOP", AbsoluteX, false),
    /* 1D */ i("ORA", AbsoluteX, true),
    /* 1E */ i("ASL", AbsoluteX, true),
    /* 1F */ i("SLO", AbsoluteX, false),
    /* 20 */ i("JSR", Absolute, true),
    /* 21 */ i("AND", IndirectX, true),
    /* 22 */ i("JAM", Implied, false),
    /* 23 */ i("RLA", IndirectX, false),
    /* 24 */ i("BIT", ZeroPage, true),
    /* 25 */ i("AND", ZeroPage, true),
    /* 26 */ i("ROL", ZeroPage, true),
    /* 27 */ i("RLA", ZeroPage, false),
    /* 28 */ i("PLP", Implied, true),
    /* 29 */ i("AND", Immediate, true),
    /* 2A */ i("ROL", Accumulator, true),
    /* 2B */ i("ANC", Immediate, false),
    /* 2C */ i("BIT", Absolute, true),
    /* 2D */ i("AND", Absolute, true),
    /* 2E */ i("ROL", Absolute, true),
    /* 2F */ i("RLA", Absolute, false),
    /* 30 */ i("BMI", Relative, true),
    /* 31 */ i("AND", IndirectY, true),
    /* 32 */ i("JAM", Implied, false),
    /* 33 */ i("RLA", IndirectY, false),
    /* 34 */ i("NOP", ZeroPageX, false),
    /* 35 */ i("AND", ZeroPageX, true),
    /* 36 */ i("ROL", ZeroPageX, true),
    /* 37 */ i("RLA", ZeroPageX, false),
    /* 38 */ i("SEC", Implied, true),
    /* 39 */ i("AND", AbsoluteY, true),
    /* 3A */ i("NOP", Implied, false),
    /* 3B */ i("RLA", AbsoluteY, false),
    /* 3C */ i("NOP", AbsoluteX, false),
    /* 3D */ i("AND", AbsoluteX, true),
    /* 3E */ i("ROL", AbsoluteX, true),
    /* 3F */ i("RLA", AbsoluteX, false),
    /* 40 */ i("RTI", Implied, true),
    /* 41 */ i("EOR", IndirectX, true),
    /* 42 */ i("JAM", Implied, false),
    /* 43 */ i("SRE", IndirectX, false),
    /* 44 */ i("NOP", ZeroPage, false),
    /* 45 */ i("EOR", ZeroPage, true),
    /* 46 */ i("LSR", ZeroPage, true),
    /* 47 */ i("SRE", ZeroPage, false),
    /* 48 */ i("PHA", Implied, true),
    /* 49 */ i("EOR", Immediate, true),
    /* 4A */ i("LSR", Accumulator, true),
    /* 4B */ i("ALR", Immediate, false),
    /* 4C */ i("JMP", Absolute, true),
    /* 4D */ i("EOR", Absolute, true),
    /* 4E */ i("LSR", Absolute, true),
    /* 4F */ i("SRE", Absolute, false),
    /* 50 */ i("BVC", Relative, true),
    /* 51 */ i("EOR", IndirectY, true),
    /* 52 */ i("JAM", Implied, false),
    /* 53 */ i("SRE", IndirectY, false),
    /* 54 */ i("NOP", ZeroPageX, false),
    /* 55 */ i("EOR", ZeroPageX, true),
    /* 56 */ i("LSR", ZeroPageX, true),
    /* 57 */ i("SRE", ZeroPageX, false),
    /* 58 */ i("CLI", Implied, true),
    /* 59 */ i("EOR", AbsoluteY, true),
    /* 5A */ i("NOP", Implied, false),
    /* 5B */ i("SRE", AbsoluteY, false),
    /* 5C */ i("NOP", AbsoluteX, false),
    /* 5D */ i("EOR", AbsoluteX, true),
    /* 5E */ i("LSR", AbsoluteX, true),
    /* 5F */ i("SRE", AbsoluteX, false),
    /* 60 */ i("RTS", Implied, true),
    /* 61 */ i("ADC", IndirectX, true),
    /* 62 */ i("JAM", Implied, false),
    /* 63 */ i("RRA", IndirectX, false),
    /* 64 */ i("NOP", ZeroPage, false),
    /* 65 */ i("ADC", ZeroPage, true),
    /* 66 */ i("ROR", ZeroPage, true),
    /* 67 */ i("RRA", ZeroPage, false),
    /* 68 */ i("PLA", Implied, true),
    /* 69 */ i("ADC", Immediate, true),
    /* 6A */ i("ROR", Accumulator, true),
    /* 6B */ i("ARR", Immediate, false),
    /* 6C */ i("JMP", Indirect, true),
    /* 6D */ i("ADC", Absolute, true),
    /* 6E */ i("ROR", Absolute, true),
    /* 6F */ i("RRA", Absolute, false),
    /* 70 */ i("BVS", Relative, true),
    /* 71 */ i("ADC", IndirectY, true),
    /* 72 */ i("JAM", Implied, false),
    /* 73 */ i("RRA", IndirectY, false),
    /* 74 */ i("NOP", ZeroPageX, false),
    /* 75 */ i("ADC", ZeroPageX, true),
    /* 76 */ i("ROR", ZeroPageX, true),
    /* 77 */ i("RRA", ZeroPageX, false),
    /* 78 */ i("SEI", Implied, true),
    /* 79 */ i("ADC", AbsoluteY, true),
    /* 7A */ i("NOP", Implied, false),
    /* 7B */ i("RRA", AbsoluteY, false),
    /* 7C */ i("NOP", AbsoluteX, false),
    /* 7D */ i("ADC", AbsoluteX, true),
    /* 7E */ i("ROR", AbsoluteX, true),
    /* 7F */ i("RRA", AbsoluteX, false),
    /* 80 */ i("NOP", Immediate, false),
    /* 81 */ i("STA", IndirectX, true),
    /* 82 */ i("NOP", Immediate, false),
    /* 83 */ i("SAX", IndirectX, false),
    /* 84 */ i("STY", ZeroPage, true),
    /* 85 */ i("STA", ZeroPage, true),
    /* 86 */ i("STX", ZeroPage, true),
    /* 87 */ i("SAX", ZeroPage, false),
    /* 88 */ i("DEY", Implied, true),
    /* 89 */ i("NOP", Immediate, false),
    /* 8A */ i("TXA", Implied, true),
    /* 8B */ i("XAA", Immediate, false),
    /* 8C */ i("STY", Absolute, true),
    /* 8D */ i("STA", Absolute, true),
    /* 8E */ i("STX", Absolute, true),
    /* 8F */ i("SAX", Absolute, false),
    /* 90 */ i("BCC", Relative, true),
    /* 91 */ i("STA", IndirectY, true),
    /* 92 */ i("JAM", Implied, false),
    /* 93 */ i("SHA", IndirectY, false),
    /* 94 */ i("STY", ZeroPageX, true),
    /* 95 */ i("STA", ZeroPageX, true),
    /* 96 */ i("STX", ZeroPageY, true),
    /* 97 */ i("SAX", ZeroPageY, false),
    /* 98 */ i("TYA", Implied, true),
    /* 99 */ i("STA", AbsoluteY, true),
    /* 9A */ i("TXS", Implied, true),
    /* 9B */ i("TAS", AbsoluteY, false),
    /* 9C */ i("SHY", AbsoluteX, false),
    /* 9D */ i("STA", AbsoluteX, true),
    /* 9E */ i("SHX", AbsoluteY, false),
    /* 9F */ i("SHA", AbsoluteY, false),
    /* A0 */ i("LDY", Immediate, true),
    /* A1 */ i("LDA", IndirectX, true),
    /* A2 */ i("LDX", Immediate, true),
    /* A3 */ i("LAX", IndirectX, false),
    /* A4 */ i("LDY", ZeroPage, true),
    /* A5 */ i("LDA", ZeroPage, true),
    /* A6 */ i("LDX", ZeroPage, true),
    /* A7 */ i("LAX", ZeroPage, false),
    /* A8 */ i("TAY", Implied, true),
    /* A9 */ i("LDA", Immediate, true),
    /* AA */ i("TAX", Implied, true),
    /* AB */ i("LXA", Immediate, false),
    /* AC */ i("LDY", Absolute, true),
    /* AD */ i("LDA", Absolute, true),
    /* AE */ i("LDX", Absolute, true),
    /* AF */ i("LAX", Absolute, false),
    /* B0 */ i("BCS", Relative, true),
    /* B1 */ i("LDA", IndirectY, true),
    /* B2 */ i("JAM", Implied, false),
    /* B3 */ i("LAX", IndirectY, false),
    /* B4 */ i("LDY", ZeroPageX, true),
    /* B5 */ i("LDA", ZeroPageX, true),
    /* B6 */ i("LDX", ZeroPageY, true),
    /* B7 */ i("LAX", ZeroPageY, false),
    /* B8 */ i("CLV", Implied, true),
    /* B9 */ i("LDA", AbsoluteY, true),
    /* BA */ i("TSX", Implied, true),
    /* BB */ i("LAS", AbsoluteY, false),
    /* BC */ i("LDY", AbsoluteX, true),
    /* BD */ i("LDA", AbsoluteX, true),
    /* BE */ i("LDX", AbsoluteY, true),
    /* BF */ i("LAX", AbsoluteY, false),
    /* C0 */ i("CPY", Immediate, true),
    /* C1 */ i("CMP", IndirectX, true),
    /* C2 */ i("NOP", Immediate, false),
    /* C3 */ i("DCP", IndirectX, false),
    /* C4 */ i("CPY", ZeroPage, true),
    /* C5 */ i("CMP", ZeroPage, true),
    /* C6 */ i("DEC", ZeroPage, true),
    /* C7 */ i("DCP", ZeroPage, false),
    /* C8 */ i("INY", Implied, true),
    /* C9 */ i("CMP", Immediate, true),
    /* CA */ i("DEX", Implied, true),
    /* CB */ i("AXS", Immediate, false),
    /* CC */ i("CPY", Absolute, true),
    /* CD */ i("CMP", Absolute, true),
    /* CE */ i("DEC", Absolute, true),
    /* CF */ i("DCP", Absolute, false),
    /* D0 */ i("BNE", Relative, true),
    /* D1 */ i("CMP", IndirectY, true),
    /* D2 */ i("JAM", Implied, false),
    /* D3 */ i("DCP", IndirectY, false),
    /* D4 */ i("NOP", ZeroPageX, false),
    /* D5 */ i("CMP", ZeroPageX, true),
    /* D6 */ i("DEC", ZeroPageX, true),
    /* D7 */ i("DCP", ZeroPageX, false),
    /* D8 */ i("CLD", Implied, true),
    /* D9 */ i("CMP", AbsoluteY, true),
    /* DA */ i("NOP", Implied, false),
    /* DB */ i("DCP", AbsoluteY, false),
    /* DC */ i("NOP", AbsoluteX, false),
    /* DD */ i("CMP", AbsoluteX, true),
    /* DE */ i("DEC", AbsoluteX, true),
    /* DF */ i("DCP", AbsoluteX, false),
    /* E0 */ i("CPX", Immediate, true),
    /* E1 */ i("SBC", IndirectX, true),
    /* E2 */ i("NOP", Immediate, false),
    /* E3 */ i("ISC", IndirectX, false),
    /* E4 */ i("CPX", ZeroPage, true),
    /* E5 */ i("SBC", ZeroPage, true),
    /* E6 */ i("INC", ZeroPage, true),
    /* E7 */ i("ISC", ZeroPage, false),
    /* E8 */ i("INX", Implied, true),
    /* E9 */ i("SBC", Immediate, true),
    /* EA */ i("NOP", Implied, true),
    /* EB */ i("SBC", Immediate, false),
    /* EC */ i("CPX", Absolute, true),
    /* ED */ i("SBC", Absolute, true),
    /* EE */ i("INC", Absolute, true),
    /* EF */ i("ISC", Absolute, false),
    /* F0 */ i("BEQ", Relative, true),
    /* F1 */ i("SBC", IndirectY, true),
    /* F2 */ i("JAM", Implied, false),
    /* F3 */ i("ISC", IndirectY, false),
    /* F4 */ i("NOP", ZeroPageX, false),
    /* F5 */ i("SBC", ZeroPageX, true),
    /* F6 */ i("INC", ZeroPageX, true),
    /* F7 */ i("ISC", ZeroPageX, false),
    /* F8 */ i("SED", Implied, true),
    /* F9 */ i("SBC", AbsoluteY, true),
    /* FA */ i("NOP", Implied, false),
    /* FB */ i("ISC", AbsoluteY, false),
    /* FC */ i("NOP", AbsoluteX, false),
    /* FD */ i("SBC", AbsoluteX, true),
    /* FE */ i("INC", AbsoluteX, true),
    /* FF */ i("ISC", AbsoluteX, false),
];

// Disassemble the instruction at `pc` without side effects.
pub fn disassemble<B: CpuBus>(bus: &B, pc: u16) -> String {
    let op = bus.peek(pc);
    let instruction = &INSTRUCTIONS[op as usize];
    let b1 = bus.peek(pc.wrapping_add(1));
    let b2 = bus.peek(pc.wrapping_add(2));
    let word = bits::word(b2, b1);

    let operand = match instruction.mode {
        Implied => String::new(),
        Accumulator => "A".to_owned(),
        Immediate => format!("#${:02X}", b1),
        ZeroPage => format!("${:02X}", b1),
        ZeroPageX => format!("${:02X},X", b1),
        ZeroPageY => format!("${:02X},Y", b1),
        Absolute => format!("${:04X}", word),
        AbsoluteX => format!("${:04X},X", word),
        AbsoluteY => format!("${:04X},Y", word),
        Indirect => format!("(${:04X})", word),
        IndirectX => format!("(${:02X},X)", b1),
        IndirectY => format!("(${:02X}),Y", b1),
        Relative => format!("${:04X}", pc.wrapping_add(2).wrapping_add(b1 as i8 as u16)),
    };

    let bytes = (0..instruction.mode.len())
        .map(|offset| format!("{:02X}", bus.peek(pc.wrapping_add(offset))))
        .collect::<Vec<_>>()
        .join(" ");

    let line = format!("{:04X}  {:<8} {}{} {}",
                       pc, bytes, if instruction.official { ' ' } else { '*' }, instruction.mnemonic, operand);
    line.trim_end().to_owned()
}

// One line per instruction, in the layout of the well known CPU test logs.
pub fn trace_line<B: CpuBus>(cpu: &Cpu, bus: &B) -> String {
    let reg = &cpu.reg;
    format!("{:<47} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            disassemble(bus, reg.get_pc()),
            reg.get_a(), reg.get_x(), reg.get_y(), reg.get_p().0, reg.get_s(), cpu.cycles() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::bus::FlatBus;

    #[test]
    fn official_count() {
        assert_eq!(INSTRUCTIONS.iter().filter(|i| i.official).count(), 151);
    }

    #[test]
    fn disassembles_operands() {
        let mut bus = FlatBus::new();
        bus.load(0xc000, &[0x4c, 0xf5, 0xc5, 0xb1, 0x10, 0xd0, 0xfe, 0xa7, 0x20]);
        assert_eq!(disassemble(&bus, 0xc000), "C000  4C F5 C5  JMP $C5F5");
        assert_eq!(disassemble(&bus, 0xc003), "C003  B1 10     LDA ($10),Y");
        assert_eq!(disassemble(&bus, 0xc005), "C005  D0 FE     BNE $C005");
        assert_eq!(disassemble(&bus, 0xc007), "C007  A7 20    *LAX $20");
    }
}
