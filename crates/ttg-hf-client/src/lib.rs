//! Client for Hugging Face services.
//!
//! Covers the four things the backend needs from Hugging Face:
//! - Video generation through the hosted inference router
//! - Token validation
//! - Trending text-to-video model discovery
//! - Snapshot file listing and streaming downloads

pub mod client;
pub mod error;
pub mod types;

pub use client::{HfClient, HfClientConfig};
pub use error::{HfError, HfResult};
pub use types::{InferencePayload, RepoFile, TokenValidation};
