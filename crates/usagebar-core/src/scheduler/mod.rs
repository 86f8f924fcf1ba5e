//! When to poll: a two-cadence state machine and the task that drives it.

mod clock;
mod driver;
mod machine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{PollCommand, PollDriver, PollEvent};
pub use machine::{Cadence, PollMode, PollScheduler, Tick};
