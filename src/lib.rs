//! ISP Chat Intake Library
//!
//! Chat-command engine that lets field agents register clients and payments
//! against the client registry, plus the webhook plumbing that feeds it.
//!
//! # Modules
//!
//! - `api`: HTTP-facing handlers.
//! - `core`: Command engine (parsing, resolution, upsert, payments, replies).
//! - `integrations`: Registry client and chat transport models.
//! - `config`: Configuration management.
//! - `dispatcher`: Command routing.
//! - `errors`: Error handling types.
//! - `field_classifier`: `cliente` segment classification.
//! - `handlers`: Shared state and health check.
//! - `models`: Core data models.
//! - `normalize`: Text normalization and IP detection.
//! - `payment_parser`: `pago` argument extraction.
//! - `payments`: Payment registration.
//! - `registry`: Client registry contract.
//! - `registry_client`: HTTP client for the registry.
//! - `replies`: User-facing reply text.
//! - `resolver`: Name-or-IP client resolution.
//! - `upsert`: Client create-or-update.
//! - `webhook_handler`: Chat webhook handler.
//! - `webhook_models`: Chat webhook payload models.

pub mod api;
pub mod core;
pub mod integrations;

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod field_classifier;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod payment_parser;
pub mod payments;
pub mod registry;
pub mod registry_client;
pub mod replies;
pub mod resolver;
pub mod upsert;
pub mod webhook_handler;
pub mod webhook_models;
