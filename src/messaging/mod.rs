//! Messaging between the orchestrator and page contexts
//!
//! - `protocol` - request, response and event wire types
//! - `agent` - the page-side task that owns the DOM
//! - `link` - the orchestrator-side connection with timeouts and re-injection

pub mod agent;
pub mod link;
pub mod protocol;

pub use agent::{HandlerReply, Inbound, PageAgent, PageCommand, PageHandle, SpawnedAgent};
pub use link::{PageConnection, PageLink, ScriptInjector};
pub use protocol::{kinds, DetectReport, FieldSummary, PageEvent, PageRequest, PageResponse};
