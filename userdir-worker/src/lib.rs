//! # userdir Worker Library
//!
//! Consumes the task queue written by the API and runs each task through
//! the handler registered for its name.
//!
//! ## Modules
//!
//! - `config`: worker settings loaded from the environment
//! - `handlers`: the `TaskHandler` trait, the handler registry and the built-in handlers
//! - `orchestrator`: the dequeue and dispatch loop
//!
//! ## Example
//!
//! ```
//! use userdir_worker::handlers::HandlerRegistry;
//!
//! let registry = HandlerRegistry::with_defaults();
//! assert!(registry.get("generate_bio").is_some());
//! ```

pub mod config;
pub mod handlers;
pub mod orchestrator;
