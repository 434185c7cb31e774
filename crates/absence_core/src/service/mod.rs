//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and lookup calls into use-case level APIs.
//! - Keep presentation layers decoupled from storage details.

pub mod absence_registry;
