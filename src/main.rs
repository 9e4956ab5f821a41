#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(
    clippy::use_self,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::missing_panics_doc
)]

use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use eframe::{egui::ViewportBuilder, run_native};
use roosty_alarms::{
    alarm::parse_time, audio::Player, AlarmBoard, AlarmId, Clock, Config, NewAlarm,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// use this config file instead of the default one
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// write a default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// add an alarm without opening the window
    NewAlarm {
        /// 24 hour time, e.g. 07:30
        time: String,
        #[clap(long, short)]
        label: Option<String>,
        #[clap(long)]
        disabled: bool,
    },
    /// print all alarms
    List,
    /// delete an alarm by id
    Remove { id: u64 },
    /// delete every alarm
    Clear,
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("roosty_alarms").expect("couldn't initialize logger");

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let config = Config::load(config_path.clone()).unwrap_or_else(|e| {
        log::warn!("{e}, using default settings");
        eprintln!("{e}, using default settings");
        Config::default()
    });

    match args.command {
        Some(Command::Init { force }) => {
            if force || !config_path.exists() {
                Config::new().save(config_path.clone())?;
                println!("wrote {}", config_path.display());
            } else {
                println!(
                    "{} already exists, use --force to overwrite it",
                    config_path.display()
                );
            }
            return Ok(());
        }
        Some(Command::NewAlarm {
            time,
            label,
            disabled,
        }) => {
            let mut board = AlarmBoard::load(config.store()?);
            let id = board.add_alarm(NewAlarm {
                label,
                enabled: !disabled,
                ..NewAlarm::at(parse_time(&time)?)
            });
            println!("added alarm {id}");
            return Ok(());
        }
        Some(Command::List) => {
            let board = AlarmBoard::load(config.store()?);
            for alarm in board.alarms() {
                let sound = alarm
                    .sound
                    .and_then(|id| board.sounds().resolve(id))
                    .map_or_else(|| "default".to_string(), |asset| asset.name.clone());
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    alarm.id,
                    alarm.bucket(),
                    if alarm.enabled { "on" } else { "off" },
                    sound,
                    alarm.display_label()
                );
            }
            return Ok(());
        }
        Some(Command::Remove { id }) => {
            let mut board = AlarmBoard::load(config.store()?);
            match board.remove_alarm(AlarmId(id)) {
                Some(alarm) => println!("removed alarm {} `{}`", alarm.id, alarm.display_label()),
                None => eprintln!("no alarm with id {id}"),
            }
            return Ok(());
        }
        Some(Command::Clear) => {
            AlarmBoard::load(config.store()?).clear_alarms();
            return Ok(());
        }
        None => {}
    }

    let board = AlarmBoard::load(config.store()?);
    let player = Player::spawn(config.default_sound.clone())?;
    // make app trnsparent
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder {
            transparent: Some(true),
            ..Default::default()
        },
        ..Default::default()
    };
    // run the gui
    run_native(
        "Roosty Alarms",
        native_options,
        Box::new(
            move |cc: &eframe::CreationContext<'_>| -> Result<
                Box<dyn eframe::App>,
                Box<dyn Error + Send + Sync>,
            > {
                let ctx = cc.egui_ctx.clone();
                let clock = Clock::new(config, board, player, move || ctx.request_repaint())?;
                Ok(Box::new(clock))
            },
        ),
    )
    .map_err(std::convert::Into::into)
}
