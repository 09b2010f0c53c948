//! # Docket
//!
//! A single-session document retrieval pipeline: upload one document,
//! index it for similarity search, and retrieve the most relevant
//! passages per question for an external language model to answer from.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────────────────┐   ┌───────────────┐
//! │  Upload   │──▶│  DocumentSession        │──▶│  Storage root  │
//! │ (CLI)    │   │  extract→chunk→embed    │   │ documents/     │
//! └──────────┘   │  →index→save            │   │ index/         │
//!                └───────────┬─────────────┘   └───────────────┘
//!                            │ top-k passages
//!                            ▼
//!                     ┌─────────────┐
//!                     │   Answer     │
//!                     │  backend     │
//!                     └─────────────┘
//! ```
//!
//! The index is rebuilt from scratch on every document change — never
//! patched in place — so a replaced or evicted document can never leak
//! stale passages into later results.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`chunk`] | Boundary-aware text chunking |
//! | [`embedding`] | Embedding providers (hash, openai) |
//! | [`index`] | In-memory similarity index |
//! | [`store`] | Atomic index persistence |
//! | [`session`] | Active-document slot lifecycle |
//! | [`answer`] | Answer-generation collaborator |
//! | [`error`] | Retrieval error kinds |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod models;
pub mod session;
pub mod store;
