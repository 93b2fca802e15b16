// Scheduler module: trigger-time detection and the dispatch state machine

pub mod engine;

pub use engine::{DispatchState, Scheduler, SchedulerConfig, SchedulerEngine};
