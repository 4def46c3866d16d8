// Timing states of an instruction.
// T1 fetches the opcode, the instruction body runs from T2.
// Finishing sets the cycle to NEXT_TO_LAST so the increment after it lands on T1 again.
pub const T1: u8 = 1;
pub const T2: u8 = 2;
pub const T3: u8 = 3;
pub const T4: u8 = 4;
pub const T5: u8 = 5;
pub const T6: u8 = 6;
pub const T7: u8 = 7;
pub const T8: u8 = 8;

pub const LAST: u8 = T1;
pub const NEXT_TO_LAST: u8 = LAST - 1;
