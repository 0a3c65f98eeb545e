//! Scheduler layer for the dispatcher
//!
//! Turns queued jobs into platform tasks: the poll loop decides when it is
//! safe to take work, the command builder and sizing heuristic decide what
//! the task looks like.

pub mod command;
pub mod poller;
pub mod sizing;

pub use poller::JobPoller;
