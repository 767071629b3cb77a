/// Output sample rate of the beeper.
pub const BEEPER_SAMPLE_RATE: u32 = 44_100;

const AMPLITUDE: i32 = 8192;

/// One-bit speaker driven by port 0xFE bit 4.
///
/// The level is integrated over each output sample period (a box filter), so
/// pulses shorter than a sample still contribute proportionally.
pub struct BeeperDevice {
    level: bool,
    clock_hz: u64,
    sample_rate: u64,
    /// Frame-relative tact up to which samples have been produced.
    position: u64,
    high_tacts: u64,
    samples: Vec<i16>,
}

impl BeeperDevice {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            level: false,
            clock_hz: clock_hz as u64,
            sample_rate: BEEPER_SAMPLE_RATE as u64,
            position: 0,
            high_tacts: 0,
            samples: Vec::with_capacity(1024),
        }
    }

    pub fn reset(&mut self) {
        self.level = false;
        self.position = 0;
        self.high_tacts = 0;
        self.samples.clear();
    }

    /// Start a frame running at `clock_hz` (the nominal clock times the multiplier).
    pub fn begin_frame(&mut self, clock_hz: u64) {
        self.clock_hz = clock_hz;
        self.position = 0;
        self.high_tacts = 0;
        self.samples.clear();
    }

    pub fn level(&self) -> bool {
        self.level
    }

    /// Set the speaker level at frame-relative `tact`.
    pub fn write(&mut self, tact: u64, level: bool) {
        self.advance(tact);
        self.level = level;
    }

    pub fn end_frame(&mut self, frame_tacts: u64) {
        self.advance(frame_tacts);
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    fn sample_start(&self, index: u64) -> u64 {
        index * self.clock_hz / self.sample_rate
    }

    fn advance(&mut self, tact: u64) {
        while self.position < tact {
            let index = self.samples.len() as u64;
            let start = self.sample_start(index);
            let end = self.sample_start(index + 1);
            let step = end.min(tact) - self.position;
            if self.level {
                self.high_tacts += step;
            }
            self.position += step;
            if self.position == end {
                let width = (end - start).max(1);
                let ratio = self.high_tacts as i32 * 2 * AMPLITUDE / width as i32;
                self.samples.push((ratio - AMPLITUDE) as i16);
                self.high_tacts = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOCK: u32 = 3_500_000;

    #[test]
    fn one_frame_produces_expected_sample_count() {
        let mut beeper = BeeperDevice::new(CLOCK);
        beeper.begin_frame(CLOCK as u64);
        beeper.end_frame(69_888);
        // 69888 tacts at 3.5 MHz is 19.968 ms -> 880 whole samples.
        assert_eq!(beeper.samples().len(), 880);
        assert!(beeper.samples().iter().all(|&s| s == -8192));
    }

    #[test]
    fn level_changes_show_in_samples() {
        let mut beeper = BeeperDevice::new(CLOCK);
        beeper.begin_frame(CLOCK as u64);
        beeper.write(1000, true);
        beeper.write(2000, false);
        beeper.end_frame(3000);
        let samples = beeper.samples();
        assert_eq!(samples[0], -8192);
        assert!(samples.contains(&8192));
        assert_eq!(*samples.last().unwrap(), -8192);
    }

    #[test]
    fn partial_sample_is_averaged() {
        let mut beeper = BeeperDevice::new(CLOCK);
        beeper.begin_frame(CLOCK as u64);
        // First sample period is 79 tacts; high for the last 39 or so.
        beeper.write(40, true);
        beeper.end_frame(79);
        let s = beeper.samples()[0];
        assert!(s > -1000 && s < 1000, "sample {s}");
    }
}
