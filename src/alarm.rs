use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sound::SoundId,
};

/// label shown for alarms that were not given one
pub const PLACEHOLDER_LABEL: &str = "Alarm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub u64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// wall clock time truncated to the minute, the unit alarms are compared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinuteBucket {
    hour: u32,
    minute: u32,
}

impl From<NaiveTime> for MinuteBucket {
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
        }
    }
}

impl fmt::Display for MinuteBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// parses `HH:MM` (24 hour) into a time with seconds set to zero
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| Error::InvalidTime(input.to_string()))
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

#[inline]
#[must_use]
pub const fn full_volume() -> f32 {
    100.0
}

/// everything the user picks when creating or editing an alarm
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlarm {
    pub time: NaiveTime,
    pub label: Option<String>,
    pub sound: Option<SoundId>,
    pub volume: f32,
    pub enabled: bool,
}

impl NewAlarm {
    #[must_use]
    pub const fn at(time: NaiveTime) -> Self {
        Self {
            time,
            label: None,
            sound: None,
            volume: full_volume(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    #[serde(with = "toml_datetime_compat")]
    pub time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "always_true")]
    pub enabled: bool,
    /// `None` (or a sound that no longer exists) means the default sound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<SoundId>,
    #[serde(default = "full_volume")]
    pub volume: f32,
    /// the bucket this alarm last fired in, cleared once the clock leaves it
    #[serde(skip)]
    pub(crate) last_fired: Option<MinuteBucket>,
}

impl Alarm {
    #[must_use]
    pub fn new(id: AlarmId, new: NewAlarm) -> Self {
        Self {
            id,
            time: truncate_to_minute(new.time),
            label: new.label.filter(|label| !label.trim().is_empty()),
            enabled: new.enabled,
            sound: new.sound,
            volume: clamp_volume(new.volume),
            last_fired: None,
        }
    }

    /// replaces everything the user can edit while keeping the id.
    /// The marker survives when the minute is unchanged, so an edit inside
    /// the firing minute doesn't ring the alarm again.
    pub fn apply(&mut self, edit: NewAlarm) {
        let last_fired = self.last_fired;
        *self = Self::new(self.id, edit);
        self.last_fired = last_fired.filter(|&marker| marker == self.bucket());
    }

    /// brings loaded values back into range, the same way [`Alarm::new`] does
    pub(crate) fn normalize(&mut self) {
        self.time = truncate_to_minute(self.time);
        if self.label.as_deref().is_some_and(|label| label.trim().is_empty()) {
            self.label = None;
        }
        self.volume = clamp_volume(self.volume);
    }

    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(PLACEHOLDER_LABEL)
    }

    #[must_use]
    pub fn bucket(&self) -> MinuteBucket {
        MinuteBucket::from(self.time)
    }

    #[must_use]
    pub const fn last_fired(&self) -> Option<MinuteBucket> {
        self.last_fired
    }

    fn should_fire(&self, now: MinuteBucket) -> bool {
        self.enabled && self.bucket() == now && self.last_fired != Some(now)
    }
}

/// `NaN` becomes full volume
pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        full_volume()
    } else {
        volume.clamp(0.0, 100.0)
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// result of one poll of the clock
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tick {
    /// alarms that fire now, already carrying their new marker
    pub fired: Vec<Alarm>,
    /// the whole list with markers updated
    pub alarms: Vec<Alarm>,
}

/// decides which alarms fire at `now`.
///
/// An enabled alarm fires once per matching minute: when it fires its marker
/// is set to the current bucket, and repeated polls in that bucket skip it.
/// Any marker from another bucket is cleared so the alarm rings again the
/// next time its minute comes around.
#[must_use]
pub fn tick(now: NaiveTime, alarms: &[Alarm]) -> Tick {
    let bucket = MinuteBucket::from(now);
    let mut fired = Vec::new();
    let alarms = alarms
        .iter()
        .map(|alarm| {
            let mut alarm = alarm.clone();
            if alarm.last_fired.is_some_and(|marker| marker != bucket) {
                alarm.last_fired = None;
            }
            if alarm.should_fire(bucket) {
                alarm.last_fired = Some(bucket);
                fired.push(alarm.clone());
            }
            alarm
        })
        .collect();
    Tick { fired, alarms }
}
