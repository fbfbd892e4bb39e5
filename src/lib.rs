//! Personal task manager: tasks with checklists, categories, knowledge
//! notes, CSV import/export and a JSON API.
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod mailer;
pub mod status;
pub mod types;
pub mod web;
