// Cooperative scheduler: per-tick tasks and fixed-interval tasks over a shared context

use crate::error::{SetupError, check_interval};
use crate::types::Continuation;

/// Slack for accumulated float time, so 5 x 0.1 counts as 0.5.
const TIME_EPSILON: f32 = 1e-5;

pub type Task<C> = Box<dyn FnMut(&mut C, f32) -> Continuation>;

enum Cadence {
    EveryTick,
    Every { interval: f32, elapsed: f32 },
}

struct Scheduled<C> {
    name: String,
    cadence: Cadence,
    task: Task<C>,
    stopped: bool,
}

/// Runs tasks against a context `C`. Every task runs to completion and
/// returns whether it wants to run again.
pub struct Scheduler<C> {
    tasks: Vec<Scheduled<C>>,
    ticks: u64,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            ticks: 0,
        }
    }

    /// Run `task` every `interval` time units. The first run happens one
    /// full interval after registration.
    pub fn every(
        &mut self,
        name: impl Into<String>,
        interval: f32,
        task: impl FnMut(&mut C, f32) -> Continuation + 'static,
    ) -> Result<(), SetupError> {
        let interval = check_interval("task interval", interval)?;
        self.tasks.push(Scheduled {
            name: name.into(),
            cadence: Cadence::Every {
                interval,
                elapsed: 0.0,
            },
            task: Box::new(task),
            stopped: false,
        });
        Ok(())
    }

    /// Run `task` once per `advance`, passing the tick's `dt`.
    pub fn every_tick(
        &mut self,
        name: impl Into<String>,
        task: impl FnMut(&mut C, f32) -> Continuation + 'static,
    ) {
        self.tasks.push(Scheduled {
            name: name.into(),
            cadence: Cadence::EveryTick,
            task: Box::new(task),
            stopped: false,
        });
    }

    /// Advance time by `dt`: per-tick tasks first, then every interval task
    /// as often as its accumulated time allows.
    pub fn advance(&mut self, ctx: &mut C, dt: f32) {
        self.ticks += 1;

        for scheduled in self.tasks.iter_mut() {
            if let Cadence::EveryTick = scheduled.cadence {
                if (scheduled.task)(ctx, dt) == Continuation::Stop {
                    scheduled.stopped = true;
                }
            }
        }

        for scheduled in self.tasks.iter_mut() {
            let Cadence::Every { interval, elapsed } = &mut scheduled.cadence else {
                continue;
            };
            if scheduled.stopped {
                continue;
            }
            *elapsed += dt;
            while *elapsed + TIME_EPSILON >= *interval {
                *elapsed -= *interval;
                if (scheduled.task)(ctx, *interval) == Continuation::Stop {
                    scheduled.stopped = true;
                    break;
                }
            }
        }

        self.tasks.retain(|scheduled| !scheduled.stopped);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }
}
