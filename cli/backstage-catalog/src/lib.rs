//! HTTP client for the Backstage software catalog API.
//!
//! This crate provides:
//! - HTTP transport layers: static header injection, bounded retries and
//!   per-attempt timeouts
//! - A thin client for the catalog entity and location endpoints that hands
//!   back the HTTP status alongside the decoded value
//! - Wire types for catalog entities and the kind specific specs
//!
//! ## Usage
//!
//! ```ignore
//! use backstage_catalog::{CatalogClient, CatalogClientConfig, ClientTrait};
//! use backstage_catalog::types::GroupSpec;
//!
//! let config = CatalogClientConfig {
//!     base_url: "https://demo.backstage.io".to_string(),
//!     retries: 3,
//!     ..Default::default()
//! };
//!
//! let client = CatalogClient::new(config)?;
//! let response = client.get_entity::<GroupSpec>("Group", "default", "team-a").await?;
//! ```

mod client;
mod config;
mod error;
pub mod transport;
pub mod types;

pub use client::{CatalogClient, CatalogResponse, ClientTrait, build_transport};
pub use config::{CatalogClientConfig, DEFAULT_TIMEOUT};
pub use error::{CatalogClientError, TransportError, display_chain};
