#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::fmt::Write;

use alarm_edit::{AlarmBuilder, EditingState};
use chrono::NaiveTime;
use eframe::egui::{
    self, Button, CentralPanel, Grid, Layout, ScrollArea, SidePanel, TopBottomPanel, Window,
};

pub mod alarm;
/// implementation of alarm editing for egui
pub mod alarm_edit;
pub mod audio;
pub mod communication;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod sound;
pub mod state;
pub mod store;
pub mod theme;
pub mod ticker;

pub use alarm::{Alarm, AlarmId, MinuteBucket, NewAlarm};
pub use config::Config;
pub use error::{Error, Result};
pub use sound::{SoundHandle, SoundId, SoundRegistry};
pub use state::AlarmBoard;
pub use store::{FileStore, MemoryStore, Store};

use crate::{
    audio::Player,
    dispatch::{Dispatcher, Permission, SoundSource, Toasts},
    theme::ThemeMode,
    ticker::{SystemClock, Ticker},
};

/// formats with the user's format string, falling back to `HH:MM` if the
/// format is invalid
#[must_use]
pub fn format_time(time: NaiveTime, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", time.format(format)).is_err() {
        return MinuteBucket::from(time).to_string();
    }
    out.trim().to_string()
}

/// things the user asked for while the alarm list was drawn
enum AlarmAction {
    Delete(AlarmId),
    Toggle(AlarmId),
    SetSound(AlarmId, Option<SoundId>),
    SetVolume(AlarmId, f32),
    Edit(AlarmId),
    Stop(AlarmId),
}

enum SoundAction {
    Preview(Option<SoundId>),
    Remove(SoundId),
}

pub struct Clock {
    config: Config,
    board: AlarmBoard<FileStore>,
    dispatcher: Dispatcher<Toasts, Player>,
    ticker: Ticker,
    in_config: bool,
    editor: Option<AlarmBuilder>,
}

impl Clock {
    /// starts polling the clock, `wake` is called after every poll so the
    /// window can repaint
    pub fn new(
        config: Config,
        board: AlarmBoard<FileStore>,
        player: Player,
        wake: impl Fn() + Send + 'static,
    ) -> Result<Self> {
        let ticker = Ticker::start(config.poll_interval(), SystemClock, wake)?;
        Ok(Self {
            config,
            board,
            dispatcher: Dispatcher::new(Toasts::new(), player),
            ticker,
            in_config: false,
            editor: None,
        })
    }

    /// runs the scheduler on the newest clock sample since the last frame
    fn poll(&mut self) {
        let Some(now) = self.ticker.latest() else {
            return;
        };
        let fired = self.board.tick(now.time());
        if !fired.is_empty() {
            self.dispatcher.dispatch(&fired, self.board.sounds());
        }
    }

    fn render_settings(&mut self, ctx: &egui::Context) {
        let mut open = self.in_config;
        Window::new("settings ⚙")
            .open(&mut open)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("time format");
                    ui.text_edit_singleline(&mut self.config.time_format);
                });
                if ui.button("save").clicked() {
                    match Config::config_path().and_then(|path| self.config.save(path)) {
                        Ok(()) => log::info!("saved settings"),
                        Err(e) => log::error!("couldn't save settings: {e}"),
                    }
                }
                ui.separator();
                if ui
                    .add_enabled(!self.board.alarms().is_empty(), Button::new("clear all alarms"))
                    .clicked()
                {
                    self.dispatcher.stop_all();
                    self.board.clear_alarms();
                }
            });
        self.in_config = open;
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("time_and_ctrl").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let theme = self.board.theme();
                let theme_btn = ui.add(Button::new(if theme.mode == ThemeMode::Dark {
                    "🌞"
                } else {
                    "🌙"
                }));
                if theme_btn.clicked() {
                    self.board.toggle_theme_mode();
                }
                let mut color = theme.color;
                if ui
                    .color_edit_button_srgb(&mut color.0)
                    .on_hover_text("theme color")
                    .changed()
                {
                    self.board.set_theme_color(color);
                }

                let toasts = self.dispatcher.notifier_mut();
                match toasts.permission() {
                    Permission::Granted => {
                        if ui.button("🔔").on_hover_text("turn notifications off").clicked() {
                            toasts.request_permission(false);
                        }
                    }
                    Permission::Prompt | Permission::Denied => {
                        if ui.button("🔕").on_hover_text("allow notifications").clicked() {
                            toasts.request_permission(true);
                        }
                    }
                }

                if self.dispatcher.ringing().next().is_some()
                    && ui.button("⏹ stop").on_hover_text("stop all alarms").clicked()
                {
                    self.dispatcher.stop_all();
                    self.dispatcher.notifier_mut().clear();
                }

                ui.with_layout(Layout::right_to_left(egui::Align::Min), |ui| {
                    if ui.button("⚙").on_hover_text("settings").clicked() {
                        self.in_config = true;
                    }
                    let now = chrono::Local::now().naive_local().time();
                    ui.label(format!(
                        "Time: {}",
                        format_time(now, &self.config.time_format)
                    ));
                });
            });
        });
    }

    fn render_toasts(&mut self, ctx: &egui::Context) {
        let mut dismissed = None;
        let mut stop = false;
        for (i, toast) in self.dispatcher.notifier().pending().iter().enumerate() {
            Window::new("Alarm Triggered")
                .id(egui::Id::new(("toast", i)))
                .auto_sized()
                .collapsible(false)
                .show(ctx, |ui| {
                    ui.heading(&toast.title);
                    ui.label(&toast.body);
                    ui.horizontal(|ui| {
                        if ui.button("stop").clicked() {
                            stop = true;
                        }
                        if ui.button("dismiss").clicked() {
                            dismissed = Some(i);
                        }
                    });
                });
        }
        if stop {
            self.dispatcher.stop_all();
            self.dispatcher.notifier_mut().clear();
        } else if let Some(i) = dismissed {
            self.dispatcher.notifier_mut().dismiss(i);
        }
    }

    fn render_sounds(&mut self, ctx: &egui::Context) {
        let mut actions = Vec::new();
        SidePanel::right("sounds").show(ctx, |ui| {
            ui.heading("sounds");
            if ui.button("upload").on_hover_text("add alarm sounds").clicked() {
                self.upload_sounds();
            }
            ui.separator();
            ui.horizontal(|ui| {
                ui.label("default");
                if ui.button("▶").on_hover_text("preview").clicked() {
                    actions.push(SoundAction::Preview(None));
                }
            });
            for asset in self.board.sounds().iter() {
                ui.horizontal(|ui| {
                    ui.label(asset.to_string());
                    if ui.button("▶").on_hover_text("preview").clicked() {
                        actions.push(SoundAction::Preview(Some(asset.id)));
                    }
                    if ui.button("x").on_hover_text("remove sound").clicked() {
                        actions.push(SoundAction::Remove(asset.id));
                    }
                });
            }
        });
        for action in actions {
            match action {
                SoundAction::Preview(id) => {
                    let source = SoundSource::resolve(id, self.board.sounds());
                    self.dispatcher.preview(source);
                }
                SoundAction::Remove(id) => {
                    self.board.remove_sound(id);
                }
            }
        }
    }

    fn upload_sounds(&mut self) {
        let file_dialog = rfd::FileDialog::new()
            .set_title("Pick alarm sounds")
            .add_filter("audio", &["mp3", "wav", "ogg", "flac"]);
        let file_dialog = match directories::UserDirs::new()
            .and_then(|dirs| dirs.audio_dir().map(std::path::Path::to_path_buf))
        {
            Some(audio_path) => file_dialog.set_directory(audio_path),
            None => file_dialog,
        };
        for path in file_dialog.pick_files().unwrap_or_default() {
            match SoundHandle::from_file(&path) {
                Ok((name, handle)) => {
                    self.board.upload_sound(name, handle);
                }
                Err(e) => log::warn!("{e}"),
            }
        }
    }

    fn list_alarms(&self, ui: &mut egui::Ui) -> Vec<AlarmAction> {
        let mut actions = Vec::new();
        for alarm in self.board.alarms() {
            if ui.button("x").on_hover_text("delete alarm").clicked() {
                actions.push(AlarmAction::Delete(alarm.id));
            }
            ui.scope(|ui| {
                // gray out if alarm is disabled
                if !alarm.enabled {
                    ui.disable();
                }
                ui.label(alarm.display_label());
                ui.label(format_time(alarm.time, &self.config.time_format));
            });
            let mut enabled = alarm.enabled;
            if ui.checkbox(&mut enabled, "enabled").clicked() {
                actions.push(AlarmAction::Toggle(alarm.id));
            }
            let mut sound = alarm.sound;
            if alarm_edit::sound_selector(ui, ("sound", alarm.id), &mut sound, self.board.sounds())
            {
                actions.push(AlarmAction::SetSound(alarm.id, sound));
            }
            let mut volume = alarm.volume;
            if alarm_edit::volume_slider(ui, &mut volume) {
                actions.push(AlarmAction::SetVolume(alarm.id, volume));
            }
            if ui.button("edit").clicked() {
                actions.push(AlarmAction::Edit(alarm.id));
            }
            if self.dispatcher.is_ringing(alarm.id) && ui.button("⏰ stop").clicked() {
                actions.push(AlarmAction::Stop(alarm.id));
            }
            ui.end_row();
        }
        actions
    }

    fn apply(&mut self, action: AlarmAction) {
        match action {
            AlarmAction::Delete(id) => {
                // handle if alarm is currently active
                self.dispatcher.stop(id);
                self.board.remove_alarm(id);
            }
            AlarmAction::Toggle(id) => {
                if self.board.toggle_alarm(id) == Some(false) {
                    self.dispatcher.stop(id);
                }
            }
            AlarmAction::SetSound(id, sound) => {
                self.board.set_alarm_sound(id, sound);
            }
            AlarmAction::SetVolume(id, volume) => {
                self.board.set_alarm_volume(id, volume);
            }
            AlarmAction::Edit(id) => {
                self.editor = self.board.alarm(id).map(AlarmBuilder::from);
            }
            AlarmAction::Stop(id) => self.dispatcher.stop(id),
        }
    }

    fn render_editor(&mut self, ctx: &egui::Context) {
        let Some(editor) = &mut self.editor else {
            return;
        };
        match editor.render_alarm_editor(ctx, self.board.sounds()) {
            EditingState::Done(new_alarm) => {
                match editor.id {
                    Some(id) => {
                        // the time may have changed, so a ringing alarm is done
                        self.dispatcher.stop(id);
                        self.board.edit_alarm(id, new_alarm);
                    }
                    None => {
                        self.board.add_alarm(new_alarm);
                    }
                }
                self.editor = None;
            }
            EditingState::Cancelled => self.editor = None,
            EditingState::Editing => {}
        }
    }
}

impl eframe::App for Clock {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll();

        ctx.set_visuals(self.board.theme().into());
        // config window
        if self.in_config {
            self.render_settings(ctx);
        }
        // alarm creation and editing
        self.render_editor(ctx);
        self.render_toasts(ctx);
        // header
        self.render_header(ctx);
        self.render_sounds(ctx);
        // show all alarms
        CentralPanel::default().show(ctx, |ui| {
            if ui.button("+").on_hover_text("add alarm").clicked() {
                let now = chrono::Local::now().naive_local().time();
                self.editor = Some(AlarmBuilder::at(now));
            }

            let actions = ScrollArea::vertical()
                .show(ui, |ui| {
                    Grid::new("alarms")
                        .show(ui, |ui| self.list_alarms(ui))
                        .inner
                })
                .inner;
            for action in actions {
                self.apply(action);
            }
        });
    }
}
