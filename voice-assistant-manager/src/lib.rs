pub mod actor;
pub mod handlers;
pub mod server;
pub mod state;

pub use actor::{AgentActor, AgentFactory, AgentHandle, AgentNamespace};
pub use server::{build_router, run_server};
pub use state::{AgentCommand, AppState};
