use std::{
    collections::HashMap,
    error::Error as StdError,
    fs::File,
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use rodio::{source::SineWave, Decoder, OutputStreamBuilder, Sink, Source};

use crate::{
    communication::{Message, MessageType},
    dispatch::{AudioSink, PlaybackOutcome, SoundSource, Target},
    error::{Error, Result},
};

/// plays sounds on its own thread, one sink per alarm (plus one for previews).
///
/// If no output device can be opened the thread exits and every later
/// [`AudioSink::play`] reports [`PlaybackOutcome::Rejected`].
#[derive(Debug)]
pub struct Player {
    sender: Option<Sender<Message>>,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    /// `default_sound` is played for alarms without a (playable) sound of
    /// their own, without one a generated beep is used
    pub fn spawn(default_sound: Option<PathBuf>) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || run(&receiver, default_sound.as_deref()))
            .map_err(|source| Error::Spawn {
                name: "audio",
                source,
            })?;
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    fn send(&self, message: Message) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.send(message).is_ok())
    }
}

impl AudioSink for Player {
    fn play(
        &mut self,
        target: Target,
        source: SoundSource,
        volume: f32,
        looping: bool,
    ) -> PlaybackOutcome {
        let message = Message::new(
            MessageType::Play {
                source,
                volume,
                looping,
            },
            target,
        );
        if self.send(message) {
            PlaybackOutcome::Started
        } else {
            PlaybackOutcome::Rejected
        }
    }

    fn stop(&mut self, target: Target) {
        if !self.send(Message::new(MessageType::Stop, target)) {
            log::debug!("audio thread is gone, nothing to stop for {target:?}");
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        // hanging up ends the audio loop
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("audio thread panicked");
            }
        }
    }
}

fn run(receiver: &Receiver<Message>, default_sound: Option<&Path>) {
    let stream = match OutputStreamBuilder::open_default_stream() {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("couldn't open audio output, alarms will be silent: {e}");
            return;
        }
    };
    let mut sinks: HashMap<Target, Sink> = HashMap::new();
    for Message { kind, target } in receiver {
        match kind {
            MessageType::Play {
                source,
                volume,
                looping,
            } => {
                let sink = Sink::connect_new(stream.mixer());
                sink.set_volume(volume / 100.0);
                if let Err(e) = append(&sink, source, default_sound, looping) {
                    log::warn!("couldn't play sound for {target:?}: {e}");
                    continue;
                }
                sink.play();
                if let Some(previous) = sinks.insert(target, sink) {
                    previous.stop();
                }
                log::debug!("playing for {target:?}");
            }
            MessageType::Stop => {
                if let Some(sink) = sinks.remove(&target) {
                    sink.stop();
                    log::debug!("stopped {target:?}");
                }
            }
        }
        // one shot previews are done once their sink runs dry
        sinks.retain(|_, sink| !sink.empty());
    }
    log::debug!("audio thread exiting");
}

fn append(
    sink: &Sink,
    source: SoundSource,
    default_sound: Option<&Path>,
    looping: bool,
) -> Result<(), Box<dyn StdError>> {
    match source {
        SoundSource::Asset { data, .. } => push(sink, Decoder::new(Cursor::new(data))?, looping),
        SoundSource::Default => match default_sound.map(open) {
            Some(Ok(decoder)) => push(sink, decoder, looping),
            Some(Err(e)) => {
                log::warn!("couldn't load the default sound, beeping instead: {e}");
                push(sink, beep(), looping);
            }
            None => push(sink, beep(), looping),
        },
    }
    Ok(())
}

fn open(path: &Path) -> Result<Decoder<BufReader<File>>, Box<dyn StdError>> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?)
}

fn push<S: Source + Send + 'static>(sink: &Sink, source: S, looping: bool) {
    if looping {
        sink.append(source.repeat_infinite());
    } else {
        sink.append(source);
    }
}

fn beep() -> impl Source + Send + 'static {
    SineWave::new(880.0)
        .take_duration(Duration::from_millis(400))
        .amplify(0.3)
        .delay(Duration::from_millis(400))
}
