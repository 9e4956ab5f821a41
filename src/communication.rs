use crate::dispatch::{SoundSource, Target};

/// what the ui thread asks the audio thread to do
#[derive(Debug)]
pub struct Message {
    pub kind: MessageType,
    pub target: Target,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, target: Target) -> Self {
        Self { kind, target }
    }
}

#[derive(Debug)]
pub enum MessageType {
    Play {
        source: SoundSource,
        volume: f32,
        looping: bool,
    },
    // if the alarm is stopped/disabled/removed
    Stop,
}
