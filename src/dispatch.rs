//! Turning fired alarms into something the user notices.
//!
//! Every effect reports a plain outcome instead of an error. A denied
//! notification or a rejected playback is expected and never stops the
//! other alarms of the same tick from being handled.

use std::collections::BTreeSet;

use crate::{
    alarm::{Alarm, AlarmId},
    sound::{SoundData, SoundId, SoundRegistry},
};

/// what to play for an alarm
#[derive(Debug, Clone)]
pub enum SoundSource {
    /// the configured default sound, or a beep if there is none
    Default,
    Asset { name: String, data: SoundData },
}

impl SoundSource {
    /// the alarm's own sound if it is still registered and its audio is
    /// available, the default sound otherwise
    #[must_use]
    pub fn for_alarm(alarm: &Alarm, sounds: &SoundRegistry) -> Self {
        Self::resolve(alarm.sound, sounds)
    }

    #[must_use]
    pub fn resolve(sound: Option<SoundId>, sounds: &SoundRegistry) -> Self {
        sound
            .and_then(|id| sounds.resolve(id))
            .and_then(|asset| {
                asset.handle().map(|handle| Self::Asset {
                    name: asset.name.clone(),
                    data: handle.data(),
                })
            })
            .unwrap_or(Self::Default)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::Asset { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Alarm(AlarmId),
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Shown,
    /// the user hasn't allowed notifications, nothing was shown
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Started,
    /// no audio output is available right now
    Rejected,
}

pub trait Notifier {
    fn show(&mut self, title: &str, body: &str) -> NotifyOutcome;
}

pub trait AudioSink {
    /// starts playing `source` for `target`, replacing whatever it played.
    /// `looping` sounds keep playing until [`AudioSink::stop`].
    fn play(
        &mut self,
        target: Target,
        source: SoundSource,
        volume: f32,
        looping: bool,
    ) -> PlaybackOutcome;

    /// halts playback for `target`, playing it again starts from the
    /// beginning
    fn stop(&mut self, target: Target);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    pub alarm: AlarmId,
    pub notification: NotifyOutcome,
    pub playback: PlaybackOutcome,
}

#[derive(Debug)]
pub struct Dispatcher<N, A> {
    notifier: N,
    audio: A,
    ringing: BTreeSet<AlarmId>,
}

impl<N: Notifier, A: AudioSink> Dispatcher<N, A> {
    pub const fn new(notifier: N, audio: A) -> Self {
        Self {
            notifier,
            audio,
            ringing: BTreeSet::new(),
        }
    }

    /// notifies and starts the sound of every fired alarm. Each alarm counts
    /// as fired whatever the outcome of its effects.
    pub fn dispatch(&mut self, fired: &[Alarm], sounds: &SoundRegistry) -> Vec<Dispatched> {
        fired
            .iter()
            .map(|alarm| {
                let source = SoundSource::for_alarm(alarm, sounds);
                log::info!(
                    "alarm {} `{}` fired at {}, playing {}",
                    alarm.id,
                    alarm.display_label(),
                    alarm.bucket(),
                    source.name()
                );

                let notification = self
                    .notifier
                    .show(alarm.display_label(), &format!("It's {}", alarm.bucket()));
                if notification == NotifyOutcome::Denied {
                    log::debug!("notification for alarm {} skipped", alarm.id);
                }

                let playback = self
                    .audio
                    .play(Target::Alarm(alarm.id), source, alarm.volume, true);
                if playback == PlaybackOutcome::Rejected {
                    log::warn!("playback for alarm {} was rejected", alarm.id);
                }
                self.ringing.insert(alarm.id);

                Dispatched {
                    alarm: alarm.id,
                    notification,
                    playback,
                }
            })
            .collect()
    }

    pub fn stop(&mut self, alarm: AlarmId) {
        if self.ringing.remove(&alarm) {
            log::info!("stopped alarm {alarm}");
        }
        self.audio.stop(Target::Alarm(alarm));
    }

    pub fn stop_all(&mut self) {
        for alarm in std::mem::take(&mut self.ringing) {
            self.audio.stop(Target::Alarm(alarm));
        }
        self.audio.stop(Target::Preview);
    }

    /// plays a sound once so the user can hear it before picking it
    pub fn preview(&mut self, source: SoundSource) -> PlaybackOutcome {
        self.audio.play(Target::Preview, source, 100.0, false)
    }

    #[must_use]
    pub fn is_ringing(&self, alarm: AlarmId) -> bool {
        self.ringing.contains(&alarm)
    }

    pub fn ringing(&self) -> impl Iterator<Item = AlarmId> + '_ {
        self.ringing.iter().copied()
    }

    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    /// not asked yet
    #[default]
    Prompt,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub body: String,
}

/// notifications shown inside the clock window. Nothing is shown until the
/// user grants permission from the ui.
#[derive(Debug, Default)]
pub struct Toasts {
    permission: Permission,
    pending: Vec<Toast>,
}

impl Toasts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// only call this in response to the user clicking something
    pub fn request_permission(&mut self, granted: bool) -> Permission {
        self.permission = if granted {
            Permission::Granted
        } else {
            Permission::Denied
        };
        log::info!("notification permission: {:?}", self.permission);
        self.permission
    }

    #[must_use]
    pub const fn permission(&self) -> Permission {
        self.permission
    }

    #[must_use]
    pub fn pending(&self) -> &[Toast] {
        &self.pending
    }

    pub fn dismiss(&mut self, index: usize) -> Option<Toast> {
        (index < self.pending.len()).then(|| self.pending.remove(index))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Notifier for Toasts {
    fn show(&mut self, title: &str, body: &str) -> NotifyOutcome {
        if self.permission != Permission::Granted {
            return NotifyOutcome::Denied;
        }
        self.pending.push(Toast {
            title: title.to_string(),
            body: body.to_string(),
        });
        NotifyOutcome::Shown
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::{
        alarm::NewAlarm,
        sound::{SoundHandle, SoundMeta},
    };

    #[derive(Debug, Default)]
    struct RecordingAudio {
        reject: bool,
        played: Vec<(Target, String, bool)>,
        stopped: Vec<Target>,
    }

    impl AudioSink for RecordingAudio {
        fn play(
            &mut self,
            target: Target,
            source: SoundSource,
            _volume: f32,
            looping: bool,
        ) -> PlaybackOutcome {
            if self.reject {
                return PlaybackOutcome::Rejected;
            }
            self.played.push((target, source.name().to_string(), looping));
            PlaybackOutcome::Started
        }

        fn stop(&mut self, target: Target) {
            self.stopped.push(target);
        }
    }

    fn alarm(id: u64, sound: Option<SoundId>) -> Alarm {
        Alarm::new(
            AlarmId(id),
            NewAlarm {
                label: Some(format!("alarm {id}")),
                sound,
                ..NewAlarm::at(NaiveTime::from_hms_opt(7, 0, 0).unwrap())
            },
        )
    }

    fn granted() -> Toasts {
        let mut toasts = Toasts::new();
        toasts.request_permission(true);
        toasts
    }

    #[test]
    fn plays_the_alarms_sound_and_notifies() {
        let mut sounds = SoundRegistry::new();
        let bell = sounds.register("bell.mp3", SoundHandle::new(b"bell".to_vec()));
        let mut dispatcher = Dispatcher::new(granted(), RecordingAudio::default());

        let dispatched = dispatcher.dispatch(&[alarm(1, Some(bell))], &sounds);
        assert_eq!(
            dispatched,
            vec![Dispatched {
                alarm: AlarmId(1),
                notification: NotifyOutcome::Shown,
                playback: PlaybackOutcome::Started,
            }]
        );
        assert_eq!(
            dispatcher.audio.played,
            vec![(Target::Alarm(AlarmId(1)), "bell.mp3".to_string(), true)]
        );
        assert_eq!(
            dispatcher.notifier().pending(),
            &[Toast {
                title: "alarm 1".to_string(),
                body: "It's 07:00".to_string(),
            }]
        );
        assert!(dispatcher.is_ringing(AlarmId(1)));
    }

    #[test]
    fn missing_or_restored_sounds_use_the_default() {
        let sounds = SoundRegistry::from_metadata(vec![SoundMeta {
            id: SoundId(5),
            name: "old.mp3".to_string(),
        }]);
        let mut dispatcher = Dispatcher::new(granted(), RecordingAudio::default());
        let fired = [
            alarm(1, None),
            alarm(2, Some(SoundId(5))),
            alarm(3, Some(SoundId(6))),
        ];
        dispatcher.dispatch(&fired, &sounds);
        assert!(dispatcher
            .audio
            .played
            .iter()
            .all(|(_, name, _)| name == "default"));
        assert_eq!(dispatcher.audio.played.len(), 3);
    }

    #[test]
    fn denied_notifications_still_play() {
        let mut dispatcher = Dispatcher::new(Toasts::new(), RecordingAudio::default());
        let dispatched = dispatcher.dispatch(&[alarm(1, None)], &SoundRegistry::new());
        assert_eq!(dispatched[0].notification, NotifyOutcome::Denied);
        assert_eq!(dispatched[0].playback, PlaybackOutcome::Started);
        assert!(dispatcher.notifier().pending().is_empty());
    }

    #[test]
    fn rejected_playback_still_counts_as_fired() {
        let audio = RecordingAudio {
            reject: true,
            ..RecordingAudio::default()
        };
        let mut dispatcher = Dispatcher::new(granted(), audio);
        let fired = [alarm(1, None), alarm(2, None)];
        let dispatched = dispatcher.dispatch(&fired, &SoundRegistry::new());
        assert_eq!(dispatched.len(), 2);
        assert!(dispatched
            .iter()
            .all(|d| d.playback == PlaybackOutcome::Rejected));
        assert_eq!(dispatcher.notifier().pending().len(), 2);
        assert_eq!(dispatcher.ringing().count(), 2);
    }

    #[test]
    fn stop_halts_playback() {
        let mut dispatcher = Dispatcher::new(granted(), RecordingAudio::default());
        dispatcher.dispatch(&[alarm(1, None), alarm(2, None)], &SoundRegistry::new());

        dispatcher.stop(AlarmId(1));
        assert!(!dispatcher.is_ringing(AlarmId(1)));
        assert!(dispatcher.is_ringing(AlarmId(2)));

        dispatcher.stop_all();
        assert_eq!(dispatcher.ringing().count(), 0);
        assert_eq!(
            dispatcher.audio.stopped,
            vec![
                Target::Alarm(AlarmId(1)),
                Target::Alarm(AlarmId(2)),
                Target::Preview
            ]
        );
    }

    #[test]
    fn preview_plays_once() {
        let mut dispatcher = Dispatcher::new(Toasts::new(), RecordingAudio::default());
        assert_eq!(
            dispatcher.preview(SoundSource::Default),
            PlaybackOutcome::Started
        );
        assert_eq!(
            dispatcher.audio.played,
            vec![(Target::Preview, "default".to_string(), false)]
        );
        assert_eq!(dispatcher.ringing().count(), 0);
    }

    #[test]
    fn toasts_follow_permission() {
        let mut toasts = Toasts::new();
        assert_eq!(toasts.permission(), Permission::Prompt);
        assert_eq!(toasts.show("a", "b"), NotifyOutcome::Denied);
        toasts.request_permission(false);
        assert_eq!(toasts.show("a", "b"), NotifyOutcome::Denied);
        toasts.request_permission(true);
        assert_eq!(toasts.show("a", "b"), NotifyOutcome::Shown);
        assert!(toasts.dismiss(3).is_none());
        assert_eq!(toasts.dismiss(0).unwrap().title, "a");
        assert!(toasts.pending().is_empty());
    }
}
