//! Loan Scoring Orchestration Library
//!
//! This library provides the core functionality for a multi-party
//! credit-decision workflow: a lending orchestrator (LMS) that owns the loan
//! state machine, a credential broker that registers with the scoring engine
//! at startup and proxies transaction data under mutual authentication, and
//! the scoring engine's two-phase initiate/poll API.
//!
//! # Modules
//!
//! - `bank`: Banking gateway (core banking system) client.
//! - `broker`: Credential broker state, registration, and HTTP surface.
//! - `config`: Per-service configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: Lending orchestrator HTTP handlers.
//! - `lending`: Scoring client and retry policy for the orchestrator.
//! - `models`: Core data models and wire payloads.
//! - `scoring`: Scoring engine state, score math, and HTTP surface.
//! - `store`: Repository traits and in-memory implementations.

pub mod bank;
pub mod broker;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod lending;
pub mod models;
pub mod scoring;
pub mod store;
