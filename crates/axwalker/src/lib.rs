//! axwalker - privileged accessibility walker
//!
//! The walker runs as its own executable so the accessibility grant belongs
//! to it. `stagehand` spawns it once per request; see
//! [`axtree::protocol`] for the command-line contract.

pub mod dispatch;
pub mod host;
pub mod platform;

pub use dispatch::{run, Command, Reply};
pub use host::{Host, SnapshotHost};
pub use platform::LiveHost;
