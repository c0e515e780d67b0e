//! # userdir API Server Library
//!
//! HTTP front end of the user directory: user CRUD plus a trigger that
//! hands bio generation to the task queue.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors with JSON rejections
//! - `routes`: API route handlers
//! - `validation`: Payload validation

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod validation;
