use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::NaiveDateTime;
use crossbeam_channel::{select, Receiver, Sender};

use crate::error::{Error, Result};

/// where the current wall clock time comes from
pub trait TimeSource: Send + 'static {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// samples a [`TimeSource`] at a fixed interval on a background thread.
///
/// The owner calls [`Ticker::latest`] and runs the scheduler on that one
/// sample, anything older is stale and skipped. Stopping (or dropping) the ticker ends the thread, samples already sent
/// stay readable.
#[derive(Debug)]
pub struct Ticker {
    stop: Option<Sender<()>>,
    samples: Receiver<NaiveDateTime>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// `wake` runs after every sample, the ui uses it to schedule a repaint
    pub fn start(
        interval: Duration,
        source: impl TimeSource,
        wake: impl Fn() + Send + 'static,
    ) -> Result<Self> {
        let (stop, stopped) = crossbeam_channel::bounded::<()>(0);
        let (sender, samples) = crossbeam_channel::unbounded();
        let ticks = crossbeam_channel::tick(interval);
        let handle = thread::Builder::new()
            .name("alarm-poll".to_string())
            .spawn(move || {
                log::debug!("polling the clock every {interval:?}");
                loop {
                    select! {
                        recv(ticks) -> _ => {
                            if sender.send(source.now()).is_err() {
                                break;
                            }
                            wake();
                        }
                        // nothing is ever sent, this fires once the owner hangs up
                        recv(stopped) -> _ => break,
                    }
                }
                log::debug!("stopped polling the clock");
            })
            .map_err(|source| Error::Spawn {
                name: "alarm-poll",
                source,
            })?;
        Ok(Self {
            stop: Some(stop),
            samples,
            handle: Some(handle),
        })
    }

    #[must_use]
    pub const fn samples(&self) -> &Receiver<NaiveDateTime> {
        &self.samples
    }

    /// drains the queue and returns only the newest sample, so a backlog built
    /// up while the owner wasn't polling never fires alarms late
    pub fn latest(&self) -> Option<NaiveDateTime> {
        self.samples.try_iter().last()
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn stop(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("alarm poll thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
