// Scheduler module: job table, clock and the broadcaster loop

pub mod clock;
pub mod engine;
pub mod job;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    Broadcaster, BroadcasterConfig, ShutdownHandle, FILE_ROTATION_JOB, HEARTBEAT_JOB,
    REMOTE_SYNC_JOB,
};
pub use job::{Job, JobAction};
