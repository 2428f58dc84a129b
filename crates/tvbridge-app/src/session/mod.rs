//! Device session: connection, polling, power cycling and actions

mod connection;
mod dispatch;
mod playback;
mod poller;
mod power;
#[allow(clippy::module_inception)]
mod session;
mod strategy;


pub use connection::connection_event;
pub use dispatch::{failure_reason, LOCAL_SHELL_PREFIX};
pub use playback::{PlaybackDebounce, PlaybackProbe, ProbeSet, PROBE_DISABLE_THRESHOLD};
pub use poller::Emission;
pub use session::Session;
pub use strategy::{AppDetectionStrategy, AppQuery};
