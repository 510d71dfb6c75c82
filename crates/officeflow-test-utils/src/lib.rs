//! Fakes and fixtures shared by the Officeflow test suites.

pub mod backend;
pub mod connector;
pub mod fixtures;

pub use backend::{BackendCall, MemoryBackend};
pub use connector::{ScriptedConnector, SessionFeed};
