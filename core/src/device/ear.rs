/// Source for the EAR socket (bit 6 of port 0xFE reads), typically a tape player.
pub trait EarInput: Send {
    /// Signal level at absolute CPU clock `tacts`.
    fn level(&mut self, tacts: u64) -> bool;

    /// True while the source has data to play.
    fn is_active(&self) -> bool {
        true
    }
}

/// A list of pulse lengths in tacts, played from a start clock. The level
/// toggles at the end of every pulse; after the last one it stays put.
#[derive(Clone, Debug, Default)]
pub struct PulseEar {
    pulses: Vec<u32>,
    start: Option<u64>,
    index: usize,
    edge: u64,
    level: bool,
}

impl PulseEar {
    pub fn new(pulses: Vec<u32>) -> Self {
        Self {
            pulses,
            ..Self::default()
        }
    }

    /// Begin playback at CPU clock `tacts`.
    pub fn start(&mut self, tacts: u64) {
        self.start = Some(tacts);
        self.index = 0;
        self.edge = tacts + self.pulses.first().copied().unwrap_or(0) as u64;
        self.level = false;
    }
}

impl EarInput for PulseEar {
    fn level(&mut self, tacts: u64) -> bool {
        if self.start.is_none() {
            return false;
        }
        while self.index < self.pulses.len() && tacts >= self.edge {
            self.level = !self.level;
            self.index += 1;
            if let Some(&next) = self.pulses.get(self.index) {
                self.edge += next as u64;
            }
        }
        self.level
    }

    fn is_active(&self) -> bool {
        self.start.is_some() && self.index < self.pulses.len()
    }
}
