//! Cross-module scenario tests for the lifecycle jobs.
//!
//! These drive the transitioners end to end against in-memory collaborators,
//! with fault-injecting wrappers where a scenario needs a failure.

#[cfg(test)]
mod lifecycle_scenarios;
