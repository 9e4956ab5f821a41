use chrono::{NaiveTime, Timelike};
use eframe::egui::{self, ComboBox, Window};

use crate::{
    alarm::{full_volume, Alarm, AlarmId, NewAlarm},
    sound::{SoundId, SoundRegistry},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOfDay {
    #[default]
    AM,
    PM,
}

/// the state of the alarm editor window
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmBuilder {
    /// `None` while creating a new alarm
    pub(crate) id: Option<AlarmId>,
    label: String,
    /// 1 to 12
    hour: u32,
    minute: u32,
    time_of_day: TimeOfDay,
    sound: Option<SoundId>,
    volume: f32,
    enabled: bool,
}

#[derive(Debug)]
pub enum EditingState {
    Cancelled,
    Editing,
    Done(NewAlarm),
}

impl AlarmBuilder {
    /// a new alarm starting at `now`
    #[must_use]
    pub fn at(now: NaiveTime) -> Self {
        let (pm, hour) = now.hour12();
        Self {
            id: None,
            label: String::new(),
            hour,
            minute: now.minute(),
            time_of_day: if pm { TimeOfDay::PM } else { TimeOfDay::AM },
            sound: None,
            volume: full_volume(),
            enabled: true,
        }
    }

    #[must_use]
    pub fn build(&self) -> NewAlarm {
        let hour = match self.time_of_day {
            TimeOfDay::AM => self.hour % 12,
            TimeOfDay::PM => self.hour % 12 + 12,
        };
        NewAlarm {
            time: NaiveTime::from_hms_opt(hour, self.minute.min(59), 0).unwrap_or_default(),
            label: Some(self.label.clone()),
            sound: self.sound,
            volume: self.volume,
            enabled: self.enabled,
        }
    }

    pub fn render_alarm_editor(
        &mut self,
        ctx: &egui::Context,
        sounds: &SoundRegistry,
    ) -> EditingState {
        let mut ret = EditingState::Editing;
        // if no alarm name set we need way to differentiate between different alarms
        let title = self
            .id
            .map_or_else(|| "new alarm".to_string(), |id| format!("editing alarm {id}"));
        Window::new(title).collapsible(false).show(ctx, |ui| {
            ui.add(egui::TextEdit::singleline(&mut self.label).hint_text("label"));
            ui.horizontal(|ui| {
                self.render_time_editor(ui);
                ui.separator();
                ui.vertical(|ui| {
                    sound_selector(ui, "editor sound", &mut self.sound, sounds);
                    volume_slider(ui, &mut self.volume);
                });
            });
            ui.horizontal(|ui| {
                if ui.button("done").clicked() {
                    ret = EditingState::Done(self.build());
                } else if ui.button("cancel").clicked() {
                    ret = EditingState::Cancelled;
                }
            });
        });
        ret
    }

    fn render_time_editor(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                stepper(ui, "Hour", &mut self.hour, 1, 12);
                stepper(ui, "Minute", &mut self.minute, 0, 59);
            });
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.time_of_day, TimeOfDay::AM, "AM");
                ui.selectable_value(&mut self.time_of_day, TimeOfDay::PM, "PM");
            });
        });
    }
}

impl From<&Alarm> for AlarmBuilder {
    fn from(alarm: &Alarm) -> Self {
        Self {
            id: Some(alarm.id),
            label: alarm.label.clone().unwrap_or_default(),
            sound: alarm.sound,
            volume: alarm.volume,
            enabled: alarm.enabled,
            ..Self::at(alarm.time)
        }
    }
}

/// up/down buttons around a number, wrapping at either end
fn stepper(ui: &mut egui::Ui, label: &str, value: &mut u32, min: u32, max: u32) {
    ui.vertical(|ui| {
        ui.label(label);
        if ui.button("Up").clicked() {
            *value = if *value >= max { min } else { *value + 1 };
        }
        ui.add(
            egui::DragValue::new(value)
                .range(min..=max)
                .custom_formatter(|n, _| format!("{n:02}")),
        );
        if ui.button("Down").clicked() {
            *value = if *value <= min { max } else { *value - 1 };
        }
    });
}

/// returns true if the user picked a different sound
pub(crate) fn sound_selector(
    ui: &mut egui::Ui,
    id_salt: impl std::hash::Hash,
    sound: &mut Option<SoundId>,
    sounds: &SoundRegistry,
) -> bool {
    let selected = sound
        .and_then(|id| sounds.resolve(id))
        .map_or_else(|| "default".to_string(), ToString::to_string);
    let before = *sound;
    ComboBox::from_id_salt(id_salt)
        .selected_text(selected)
        .show_ui(ui, |ui| {
            ui.selectable_value(sound, None, "default");
            for asset in sounds.iter() {
                ui.selectable_value(sound, Some(asset.id), asset.to_string());
            }
        });
    before != *sound
}

/// returns true if the volume changed
pub(crate) fn volume_slider(ui: &mut egui::Ui, volume: &mut f32) -> bool {
    ui.add(
        egui::Slider::new(volume, 0.0..=100.0)
            .integer()
            .suffix("%")
            .text("volume"),
    )
    .changed()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test_case(0, 5; "midnight")]
    #[test_case(7, 30; "morning")]
    #[test_case(12, 0; "noon")]
    #[test_case(23, 59; "late")]
    fn builder_keeps_the_time(hour: u32, minute: u32) {
        assert_eq!(AlarmBuilder::at(time(hour, minute)).build().time, time(hour, minute));
    }

    #[test]
    fn editing_keeps_alarm_settings() {
        let alarm = Alarm::new(
            AlarmId(3),
            NewAlarm {
                label: Some("work".to_string()),
                sound: Some(SoundId(1)),
                volume: 40.0,
                enabled: false,
                ..NewAlarm::at(time(18, 45))
            },
        );
        let builder = AlarmBuilder::from(&alarm);
        assert_eq!(builder.id, Some(AlarmId(3)));
        let rebuilt = Alarm::new(alarm.id, builder.build());
        assert_eq!(rebuilt, alarm);
    }
}
