//! Command collection on landed sessions.
//!
//! Once a hop lands on a device, the driver redispatches the session to
//! the device's platform, sends the collection plan one command at a time
//! and hands the raw responses back as a
//! [`RawOutputBundle`](crate::extract::RawOutputBundle). When the device is
//! done, `exit` unwinds the session to the previous hop.

mod builder;
mod command;
mod plan;
mod redispatch;
pub(crate) mod response;

pub use builder::{JumpSession, SessionBuilder};
pub use command::{CommandDriver, DriverConfig};
pub use plan::{CommandSpec, standard_plan};
pub use redispatch::Redispatch;
pub use response::CommandOutput;
