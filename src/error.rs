use crate::scheduler::PluginId;
use thiserror::Error;

/// Rejected scheduling call. Never fatal to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("plugin {0} was never registered")]
    UnknownPlugin(PluginId),
    #[error("no list entry refers to plugin {0}")]
    NoMatchingEntry(PluginId),
    #[error("invalid schedule: cycle {cycle}, shift {shift} (need cycle >= 1 and shift < cycle)")]
    InvalidSchedule { cycle: u32, shift: u32 },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("bus is already initialized")]
    AlreadyInitialized,
    #[error("bus is not initialized")]
    NotInitialized,
    #[error("failed to allocate {requested} entries for {what}")]
    Allocation { what: &'static str, requested: usize },
    #[error("invalid observation type {0:?}: expected a 3-character RINEX code")]
    InvalidObsType(String),
    #[error("{requested} observation types exceed the limit of {max}")]
    TooManyObsTypes { requested: usize, max: usize },
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
