// SPDX-License-Identifier: MIT

//! DAG workflow orchestration for AI agents
//!
//! `adk` holds the agent contracts and error types, `kinetic` the engine:
//! configuration, the agent directory, audit logging and the workflow
//! validator/executor.

pub mod adk;
pub mod kinetic;
