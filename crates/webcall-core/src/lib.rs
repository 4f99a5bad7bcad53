//! webcall-core — shared types, cookie and frame formats, configuration.
//! All other WebCall crates depend on this one.

pub mod caller;
pub mod config;
pub mod cookie;
pub mod frame;
pub mod id;

pub use caller::CallerInfo;
pub use frame::{Frame, FrameError, FrameTag};
pub use id::ConnectionId;
