//! Poll-and-forward orchestration.

mod connector;
mod error;
mod runner;
mod state;
mod tracker;

pub use connector::{Connector, RunSummary};
pub use error::ConnectorError;
pub use runner::{run_all, AuditLogForwarder, RunReport};
pub use state::{RunState, RunStateMachine};
pub use tracker::HighWaterMark;
