use std::time::Duration;

/// Per-frame timing figures, reset when the controller stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_count: u64,
    /// Host time spent executing the last frame.
    pub last_cpu_time: Duration,
    pub average_cpu_time: Duration,
    /// Host time from the start of the last frame to the start of the next, pacing included.
    pub last_frame_time: Duration,
    pub average_frame_time: Duration,
    total_cpu_time: Duration,
    total_frame_time: Duration,
}

impl FrameStats {
    pub(crate) fn record(&mut self, cpu_time: Duration, frame_time: Duration) {
        self.frame_count += 1;
        self.last_cpu_time = cpu_time;
        self.last_frame_time = frame_time;
        self.total_cpu_time += cpu_time;
        self.total_frame_time += frame_time;
        let n = self.frame_count.min(u32::MAX as u64) as u32;
        self.average_cpu_time = self.total_cpu_time / n;
        self.average_frame_time = self.total_frame_time / n;
    }

    /// A run that ended mid-frame: only the last CPU time changes.
    pub(crate) fn record_partial(&mut self, cpu_time: Duration) {
        self.last_cpu_time = cpu_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_follow_recorded_frames() {
        let mut stats = FrameStats::default();
        stats.record(Duration::from_millis(2), Duration::from_millis(20));
        stats.record(Duration::from_millis(4), Duration::from_millis(20));
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.last_cpu_time, Duration::from_millis(4));
        assert_eq!(stats.average_cpu_time, Duration::from_millis(3));
        assert_eq!(stats.average_frame_time, Duration::from_millis(20));
    }

    #[test]
    fn partial_frames_are_not_counted() {
        let mut stats = FrameStats::default();
        stats.record_partial(Duration::from_millis(1));
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.average_cpu_time, Duration::ZERO);
    }
}
