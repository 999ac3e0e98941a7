//! Nexus - Multi-Tenant Admin Service
//!
//! This crate is the backend of the Nexus admin console: clients, workflow
//! nodes and agents, billing plans, credentials, workflow exceptions,
//! onboarding surveys, and the client onboarding pipeline.
//!
//! The service surface is an HTTP JSON API over Postgres, with three
//! delegated externals: a generative-text API (chat testing, survey
//! analysis, proposal drafting), a key-value secret vault (credential
//! values are stored by key, never in rows), and a shell-invoked document
//! compiler (proposal PDFs).
//!
//! ## Quick Start
//!
//! ```rust
//! use nexus::pipeline::StepCatalog;
//!
//! let catalog = StepCatalog::default();
//! let action = catalog.next_actionable(&[]).expect("fresh run has a next step");
//! assert_eq!(action.step_order, catalog.steps()[0].step_order);
//! ```

// Runtime configuration (environment + step catalog file)
pub mod config;

// Onboarding pipeline: step catalog and progress advancement
pub mod pipeline;

// Generative-text integration (chat testing, survey analysis, proposals)
pub mod ai;

// External secret vault for credential values
pub mod vault;

// Shell-invoked document compiler for proposal PDFs
pub mod render;

// Database services (when enabled)
#[cfg(feature = "database")]
pub mod database;

// REST API surface
#[cfg(feature = "server")]
pub mod api;
