use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use chrono::Local;

use crate::error::{Error, Result};

// Whitespace separated rows, one per frame. Lines starting with '#' are comments.
pub struct DiagLog {
    writer: BufWriter<File>,
}

impl DiagLog {
    pub fn create<P: AsRef<Path>>(path: P, columns: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| Error::io(err, format!("creating {}", path.display())))?;
        let mut log = Self { writer: BufWriter::new(file) };
        log.line(&format!("# nesgym {}", Local::now().format("%Y-%m-%d %H:%M:%S")))?;
        log.line(&format!("# {}", columns))?;
        Ok(log)
    }

    // "frame time_ms"
    pub fn frame_time(path: impl AsRef<Path>) -> Result<Self> { Self::create(path, "frame time_ms") }

    // "frame buffer_fill pitch"
    pub fn audio_stats(path: impl AsRef<Path>) -> Result<Self> { Self::create(path, "frame buffer_fill pitch") }

    pub fn write_time(&mut self, frame: u64, time_ms: f64) -> Result<()> {
        self.line(&format!("{} {:.3}", frame, time_ms))
    }

    pub fn write_audio(&mut self, frame: u64, fill: f64, pitch: f64) -> Result<()> {
        self.line(&format!("{} {:.4} {:.6}", frame, fill, pitch))
    }

    fn line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line).map_err(|err| Error::io(err, "writing diagnostic log"))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|err| Error::io(err, "flushing diagnostic log"))
    }
}

// Wall time spent on a frame.
pub struct FrameTimer {
    start: Instant,
}

impl FrameTimer {
    pub fn start() -> Self { Self { start: Instant::now() } }

    pub fn elapsed_ms(&self) -> f64 { self.start.elapsed().as_secs_f64() * 1000.0 }
}

// Numeric rows of a log, comments skipped.
pub fn parse_rows(text: &str) -> Vec<Vec<f64>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split_whitespace().filter_map(|value| value.parse().ok()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_rows_after_comments() {
        let path = std::env::temp_dir().join(format!("nesgym-diag-{}.log", std::process::id()));
        {
            let mut log = DiagLog::audio_stats(&path).unwrap();
            log.write_audio(1, 0.5, 1.0).unwrap();
            log.write_audio(2, 0.25, 1.0025).unwrap();
            log.flush().unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(text.lines().nth(1).unwrap().starts_with("# frame buffer_fill pitch"));
        assert_eq!(parse_rows(&text), vec![vec![1.0, 0.5, 1.0], vec![2.0, 0.25, 1.0025]]);
    }

    #[test]
    fn timer_moves_forward() {
        let timer = FrameTimer::start();
        assert!(timer.elapsed_ms() >= 0.0);
    }
}
