//! Lifecycle jobs for an event photo-sharing platform.
//!
//! After an event ends it moves through a grace period (attendees can still
//! scan their faces), a download period (the organizer can download photos),
//! and is finally archived with every photo, blob copy, and face collection
//! purged. The jobs in [`jobs`] drive those transitions; [`db`] and
//! [`services`] hold the stores and external services they operate on.

pub mod config;
pub mod db;
pub mod jobs;
pub mod models;
pub mod observability;
pub mod services;

#[cfg(test)]
mod tests;
