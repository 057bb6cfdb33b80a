// SPDX-License-Identifier: MIT

pub mod context;
pub mod executor;
pub mod graph;
pub mod loader;
pub mod types;
pub mod validator;

pub use context::ExecutionContext;
pub use executor::{WorkflowExecutor, SYNTHESIS_TASK};
pub use loader::WorkflowLoader;
pub use types::{Edge, Node, WorkflowDefinition, DEFAULT_NODE_TIMEOUT};
pub use validator::DagValidator;
