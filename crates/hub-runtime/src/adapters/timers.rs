//! Tokio-backed periodic timers.
//!
//! Each armed key owns one interval task. A tick is delivered to the
//! runtime as [`HubCommand::TimerFired`]; the hub handles it on its own
//! control flow like any other command.

use crate::ports::{TimerKey, TimerService};
use crate::runtime::HubCommand;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub struct TokioTimers {
    commands: mpsc::UnboundedSender<HubCommand>,
    tasks: HashMap<TimerKey, JoinHandle<()>>,
}

impl TokioTimers {
    pub fn new(commands: mpsc::UnboundedSender<HubCommand>) -> Self {
        Self {
            commands,
            tasks: HashMap::new(),
        }
    }

    /// Number of armed timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl TimerService for TokioTimers {
    fn arm(&mut self, key: TimerKey, period: Duration) {
        if let Some(previous) = self.tasks.remove(&key) {
            previous.abort();
        }
        let period = period.max(Duration::from_millis(1));
        let commands = self.commands.clone();
        let fired = key.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if commands.send(HubCommand::TimerFired(fired.clone())).is_err() {
                    debug!(timer = ?fired, "Runtime gone, timer stopped");
                    return;
                }
            }
        });
        self.tasks.insert(key, task);
    }

    fn cancel(&mut self, key: &TimerKey) {
        if let Some(task) = self.tasks.remove(key) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
