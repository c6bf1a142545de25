//! Application services layer.
//!
//! The session coordinator sits between the presentation surface and the
//! SDK / network infrastructure.

pub mod session_coordinator;
pub mod session_runtime;

pub use session_coordinator::{
    SessionCoordinator, SessionDependencies, SessionInput, SessionSnapshot,
};
pub use session_runtime::{spawn_session, SessionHandle};
