use std::collections::HashSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::{
    alarm::{self, Alarm, AlarmId, NewAlarm},
    sound::{SoundHandle, SoundId, SoundMeta, SoundRegistry},
    store::{self, Store, ALARMS_KEY, SOUNDS_KEY, THEME_KEY},
    theme::{Theme, ThemeColor},
};

#[derive(Debug, Default, Deserialize)]
struct StoredAlarms {
    #[serde(default)]
    alarms: Vec<Alarm>,
}

#[derive(Serialize)]
struct AlarmsRef<'a> {
    alarms: &'a [Alarm],
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSounds {
    #[serde(default)]
    sounds: Vec<SoundMeta>,
}

/// all user state of the clock, mirrored into a [`Store`] on every change.
///
/// Loading never fails: anything missing or unreadable starts out empty.
/// Writes are best effort, a failed write is logged and the in memory state
/// stays authoritative.
#[derive(Debug)]
pub struct AlarmBoard<S: Store> {
    store: S,
    alarms: Vec<Alarm>,
    sounds: SoundRegistry,
    theme: Theme,
    next_id: u64,
}

impl<S: Store> AlarmBoard<S> {
    pub fn load(store: S) -> Self {
        let StoredAlarms { alarms: stored } = store::read_or_default(&store, ALARMS_KEY);
        let StoredSounds { sounds } = store::read_or_default(&store, SOUNDS_KEY);
        let theme = store::read_or_default(&store, THEME_KEY);
        let sounds = SoundRegistry::from_metadata(sounds);

        let mut seen = HashSet::new();
        let mut alarms = Vec::with_capacity(stored.len());
        for mut alarm in stored {
            if !seen.insert(alarm.id) {
                log::warn!("dropping alarm with duplicate id {}", alarm.id);
                continue;
            }
            if alarm.sound.is_some_and(|sound| !sounds.contains(sound)) {
                log::warn!("alarm {} referenced a missing sound", alarm.id);
                alarm.sound = None;
            }
            alarm.normalize();
            alarms.push(alarm);
        }
        let next_id = alarms.iter().map(|alarm| alarm.id.0.saturating_add(1)).max().unwrap_or(0);
        log::info!(
            "loaded {} alarms and {} sounds",
            alarms.len(),
            sounds.len()
        );

        Self {
            store,
            alarms,
            sounds,
            theme,
            next_id,
        }
    }

    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub fn alarm(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    #[must_use]
    pub const fn sounds(&self) -> &SoundRegistry {
        &self.sounds
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    pub fn add_alarm(&mut self, mut new: NewAlarm) -> AlarmId {
        new.sound = self.known_sound(new.sound);
        let alarms = &self.alarms;
        let id = AlarmId(store::allocate_id(&mut self.next_id, |id| {
            alarms.iter().any(|alarm| alarm.id.0 == id)
        }));
        let alarm = Alarm::new(id, new);
        log::info!("added alarm {id} `{}` at {}", alarm.display_label(), alarm.bucket());
        self.alarms.push(alarm);
        self.save_alarms();
        id
    }

    pub fn remove_alarm(&mut self, id: AlarmId) -> Option<Alarm> {
        let index = self.alarms.iter().position(|alarm| alarm.id == id)?;
        let alarm = self.alarms.remove(index);
        log::info!("removed alarm {id}");
        self.save_alarms();
        Some(alarm)
    }

    /// returns whether the alarm exists
    pub fn set_enabled(&mut self, id: AlarmId, enabled: bool) -> bool {
        self.update_alarm(id, |alarm| alarm.enabled = enabled)
    }

    /// flips the enabled flag, returning the new value
    pub fn toggle_alarm(&mut self, id: AlarmId) -> Option<bool> {
        let enabled = !self.alarm(id)?.enabled;
        self.set_enabled(id, enabled);
        Some(enabled)
    }

    /// unknown sounds fall back to the default sound
    pub fn set_alarm_sound(&mut self, id: AlarmId, sound: Option<SoundId>) -> bool {
        let sound = self.known_sound(sound);
        self.update_alarm(id, |alarm| alarm.sound = sound)
    }

    pub fn set_alarm_volume(&mut self, id: AlarmId, volume: f32) -> bool {
        let volume = alarm::clamp_volume(volume);
        self.update_alarm(id, |alarm| alarm.volume = volume)
    }

    pub fn edit_alarm(&mut self, id: AlarmId, mut edit: NewAlarm) -> bool {
        edit.sound = self.known_sound(edit.sound);
        self.update_alarm(id, |alarm| alarm.apply(edit))
    }

    pub fn clear_alarms(&mut self) {
        log::info!("clearing {} alarms", self.alarms.len());
        self.alarms.clear();
        self.save_alarms();
    }

    pub fn upload_sound(&mut self, name: impl Into<String>, handle: SoundHandle) -> SoundId {
        let id = self.sounds.register(name, handle);
        self.save_sounds();
        id
    }

    /// removes the sound and points every alarm that used it back at the
    /// default sound
    pub fn remove_sound(&mut self, id: SoundId) -> Option<SoundMeta> {
        let removed = self.sounds.remove(id)?;
        let mut changed = false;
        for alarm in self.alarms.iter_mut().filter(|alarm| alarm.sound == Some(id)) {
            alarm.sound = None;
            changed = true;
        }
        if changed {
            self.save_alarms();
        }
        self.save_sounds();
        Some(removed)
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme == theme {
            return;
        }
        self.theme = theme;
        if let Err(e) = store::write(&mut self.store, THEME_KEY, &self.theme) {
            log::error!("couldn't save theme: {e}");
        }
    }

    pub fn set_theme_color(&mut self, color: ThemeColor) {
        self.set_theme(Theme {
            color,
            ..self.theme
        });
    }

    pub fn toggle_theme_mode(&mut self) {
        self.set_theme(Theme {
            mode: !self.theme.mode,
            ..self.theme
        });
    }

    /// runs the scheduler against `now` and returns the alarms that fire.
    /// Fired markers only live in memory so nothing is written.
    pub fn tick(&mut self, now: NaiveTime) -> Vec<Alarm> {
        let tick = alarm::tick(now, &self.alarms);
        self.alarms = tick.alarms;
        tick.fired
    }

    fn known_sound(&self, sound: Option<SoundId>) -> Option<SoundId> {
        sound.filter(|&sound| {
            let known = self.sounds.contains(sound);
            if !known {
                log::warn!("sound {sound} doesn't exist, using the default sound");
            }
            known
        })
    }

    fn update_alarm(&mut self, id: AlarmId, update: impl FnOnce(&mut Alarm)) -> bool {
        let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return false;
        };
        update(alarm);
        self.save_alarms();
        true
    }

    fn save_alarms(&mut self) {
        let alarms = AlarmsRef {
            alarms: &self.alarms,
        };
        if let Err(e) = store::write(&mut self.store, ALARMS_KEY, &alarms) {
            log::error!("couldn't save alarms: {e}");
        }
    }

    fn save_sounds(&mut self) {
        let sounds = StoredSounds {
            sounds: self.sounds.metadata(),
        };
        if let Err(e) = store::write(&mut self.store, SOUNDS_KEY, &sounds) {
            log::error!("couldn't save sounds: {e}");
        }
    }
}
