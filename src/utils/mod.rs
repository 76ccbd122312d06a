//! Shared utilities for the topicline binaries.

pub mod bootstrap;
