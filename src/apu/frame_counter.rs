use serde::{Deserialize, Serialize};

use crate::error::{ensure_state, Result};

// Last cycle of the five step sequence.
const LONGEST_SEQUENCE: u32 = 37282;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    FourStep,
    FiveStep,
}

// What the sequencer clocks on a given cycle. Half frames clock quarter frame units too.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Clock {
    None,
    Quarter,
    Half,
}

// NTSC frame sequencer, counted in CPU cycles since the last reset or $4017 write.
// Step   4-step   5-step
//  1      7457     7457   quarter
//  2     14913    14913   half
//  3     22371    22371   quarter
//  4     29829        -   half, IRQ on 29828..=29830
//  5         -    37281   half
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameCounter {
    mode: Mode,
    cycle: u32,
    inhibit: bool,
    pending: Option<u8>,
    delay: u8,
    pub irq: bool,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self { mode: Mode::FourStep, cycle: 0, inhibit: false, pending: None, delay: 0, irq: false }
    }
}

impl FrameCounter {
    // $4017 MI-- ----. The mode change lands 3 or 4 cycles later, the inhibit right away.
    pub fn write(&mut self, data: u8, odd_cycle: bool) {
        self.pending = Some(data);
        self.delay = if odd_cycle { 4 } else { 3 };
        self.inhibit = data & 0x40 != 0;
        if self.inhibit {
            self.irq = false;
        }
    }

    pub fn mode(&self) -> Mode { self.mode }

    // One CPU cycle.
    pub fn step(&mut self) -> Clock {
        let mut clock = self.advance();

        if let Some(data) = self.pending {
            self.delay -= 1;
            if self.delay == 0 {
                self.pending = None;
                self.cycle = 0;
                self.mode = if data & 0x80 != 0 { Mode::FiveStep } else { Mode::FourStep };
                if self.mode == Mode::FiveStep {
                    clock = Clock::Half;
                }
            }
        }

        clock
    }

    fn advance(&mut self) -> Clock {
        self.cycle += 1;
        match (self.mode, self.cycle) {
            (_, 7457) => Clock::Quarter,
            (_, 14913) => Clock::Half,
            (_, 22371) => Clock::Quarter,
            (Mode::FourStep, 29828) => {
                self.raise_irq();
                Clock::None
            }
            (Mode::FourStep, 29829) => {
                self.raise_irq();
                Clock::Half
            }
            (Mode::FourStep, 29830) => {
                self.raise_irq();
                self.cycle = 0;
                Clock::None
            }
            (Mode::FiveStep, 37281) => Clock::Half,
            (Mode::FiveStep, LONGEST_SEQUENCE) => {
                self.cycle = 0;
                Clock::None
            }
            _ => Clock::None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let delay = self.pending.is_none() || (1..=4).contains(&self.delay);
        ensure_state(self.cycle <= LONGEST_SEQUENCE && delay, "frame counter")
    }

    fn raise_irq(&mut self) {
        if !self.inhibit {
            self.irq = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(counter: &mut FrameCounter, cycles: u32) -> Vec<(u32, Clock)> {
        (1..=cycles)
            .filter_map(|cycle| match counter.step() {
                Clock::None => None,
                clock => Some((cycle, clock)),
            })
            .collect()
    }

    #[test]
    fn four_step_sequence() {
        let mut counter = FrameCounter::default();
        let clocks = run(&mut counter, 29830);
        assert_eq!(clocks, vec![
            (7457, Clock::Quarter),
            (14913, Clock::Half),
            (22371, Clock::Quarter),
            (29829, Clock::Half),
        ]);
        assert!(counter.irq);

        // The sequence repeats every 29830 cycles.
        let clocks = run(&mut counter, 7457);
        assert_eq!(clocks, vec![(7457, Clock::Quarter)]);
    }

    #[test]
    fn irq_inhibit() {
        let mut counter = FrameCounter::default();
        counter.write(0x40, false);
        run(&mut counter, 29830);
        assert!(!counter.irq);
    }

    #[test]
    fn inhibit_clears_pending_irq() {
        let mut counter = FrameCounter::default();
        run(&mut counter, 29829);
        assert!(counter.irq);
        counter.write(0x40, false);
        assert!(!counter.irq);
    }

    #[test]
    fn five_step_clocks_immediately_and_never_interrupts() {
        let mut counter = FrameCounter::default();
        counter.write(0x80, false);
        let clocks = run(&mut counter, 3);
        assert_eq!(clocks, vec![(3, Clock::Half)]);
        assert_eq!(counter.mode(), Mode::FiveStep);

        let clocks = run(&mut counter, 37282);
        assert_eq!(clocks.len(), 4);
        assert_eq!(clocks[3], (37281, Clock::Half));
        assert!(!counter.irq);
    }

    #[test]
    fn write_delay_depends_on_parity() {
        let mut counter = FrameCounter::default();
        counter.write(0x80, true);
        assert_eq!(run(&mut counter, 3), vec![]);
        assert_eq!(run(&mut counter, 1), vec![(1, Clock::Half)]);
    }
}
