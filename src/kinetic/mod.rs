// SPDX-License-Identifier: MIT

pub mod audit;
pub mod config;
pub mod directory;
pub mod workflow;
