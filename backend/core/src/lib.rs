pub mod descriptor;
pub mod error;
pub mod rpc;
pub mod task;
pub mod traits;

pub use descriptor::{AgentCapabilities, AgentDescriptor};
pub use error::{DelegationError, DelegationResult};
pub use task::{TaskRequest, TaskResult, TaskState};
pub use traits::{ReasoningLoop, Skill};
