//! vaultmind - AI chat and semantic search over a vault of Markdown notes
//!
//! The crate has two engines and the plumbing they share:
//!
//! - [`conversation`]: streaming question/answer sessions with window memory
//!   and cooperative mid-stream abort
//! - [`search`] on top of [`vector`] and [`ids`]: per-note embeddings with
//!   change detection, persisted to a single JSON file and queried by
//!   cosine distance
//!
//! Model access goes through [`provider`], the host application (notes,
//! metadata, notifications) through [`host`].

pub mod config;
pub mod conversation;
pub mod host;
pub mod ids;
pub mod logging;
pub mod pricing;
pub mod provider;
pub mod search;
pub mod tokens;
pub mod util;
pub mod vector;

#[cfg(test)]
pub(crate) mod testing;
