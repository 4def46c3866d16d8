use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_state, Result};

// Bounded sample queue. A full queue drops its oldest sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
    dropped: u64,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: VecDeque::with_capacity(capacity), capacity, dropped: 0 }
    }

    pub fn push(&mut self, sample: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
            self.dropped += 1;
        }
        self.samples.push_back(sample);
    }

    pub fn drain_into(&mut self, out: &mut Vec<f32>) {
        out.extend(self.samples.drain(..));
    }

    pub fn len(&self) -> usize { self.samples.len() }
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }
    pub fn capacity(&self) -> usize { self.capacity }
    pub fn dropped(&self) -> u64 { self.dropped }

    // 0.0 empty, 1.0 full.
    pub fn fill(&self) -> f64 { self.samples.len() as f64 / self.capacity as f64 }

    // Dynamic rate control: 1 + d * (1 - 2 * fill).
    pub fn pitch(&self, delta: f64) -> f64 { 1.0 + delta * (1.0 - 2.0 * self.fill()) }

    pub fn validate(&self) -> Result<()> {
        ensure_state(self.capacity > 0 && self.samples.len() <= self.capacity, "sample buffer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let mut buffer = SampleBuffer::new(3);
        for sample in [1.0, 2.0, 3.0, 4.0] {
            buffer.push(sample);
        }
        let mut out = vec![];
        buffer.drain_into(&mut out);
        assert_eq!(out, vec![2.0, 3.0, 4.0]);
        assert_eq!(buffer.dropped(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn pitch_follows_fill() {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        let mut buffer = SampleBuffer::new(4);
        assert!(close(buffer.pitch(0.005), 1.005));
        buffer.push(0.0);
        buffer.push(0.0);
        assert!(close(buffer.pitch(0.005), 1.0));
        buffer.push(0.0);
        buffer.push(0.0);
        assert!(close(buffer.pitch(0.005), 0.995));
    }
}
