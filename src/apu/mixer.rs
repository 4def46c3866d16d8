// Non-linear DAC approximation, precomputed.
// pulse_out = 95.52 / (8128 / (p1 + p2) + 100)
// tnd_out = 163.67 / (24329 / (3t + 2n + d) + 100)
#[derive(Clone)]
pub struct Mixer {
    pulse: [f32; 31],
    tnd: [f32; 203],
}

impl Mixer {
    pub fn new() -> Self {
        let mut pulse = [0.0; 31];
        for (n, out) in pulse.iter_mut().enumerate().skip(1) {
            *out = 95.52 / (8128.0 / n as f32 + 100.0);
        }
        let mut tnd = [0.0; 203];
        for (n, out) in tnd.iter_mut().enumerate().skip(1) {
            *out = 163.67 / (24329.0 / n as f32 + 100.0);
        }
        Self { pulse, tnd }
    }

    pub fn mix(&self, pulse1: u8, pulse2: u8, triangle: u8, noise: u8, dmc: u8) -> f32 {
        let pulse = self.pulse[(pulse1 + pulse2) as usize];
        let tnd = self.tnd[3 * triangle as usize + 2 * noise as usize + dmc as usize];
        pulse + tnd
    }
}

impl Default for Mixer {
    fn default() -> Self { Self::new() }
}
