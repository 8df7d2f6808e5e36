pub mod debug;
pub mod health;
pub mod messages;
pub mod pipeline;
pub mod router;
pub mod server;
pub mod state;
pub mod webhook;

pub use pipeline::{FailureKind, MessagePipeline, PipelineOutcome, SkipReason};
pub use server::GatewayServer;
pub use state::{AppState, SharedState};
