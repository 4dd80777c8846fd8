use crate::sound::DEFAULT_SAMPLE_RATE;

/// Construction-time options for [`crate::gameboy::GameBoy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// Deliver queued samples to the audio sink after each frame.
    pub sound_enabled: bool,
    /// Output rate of the sample queue in Hz.
    pub sample_rate: u32,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl EmulatorConfig {
    pub fn muted() -> Self {
        Self {
            sound_enabled: false,
            ..Self::default()
        }
    }
}
