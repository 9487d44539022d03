//! Declarative reads of Backstage catalog entities.
//!
//! Reads of single entities and of entity listings can be given a fallback
//! value. If the catalog cannot serve the read, the fallback is used instead
//! and the failure is reported as a warning rather than an error. This keeps
//! consumers working while the catalog is unavailable or an entity does not
//! exist yet.
//!
//! ```ignore
//! use backstage_provider::{Provider, ProviderAttributes, ReadRequest};
//! use backstage_provider::kind::GroupKind;
//!
//! let provider = Provider::configure(&ProviderAttributes {
//!     base_url: Some("https://demo.backstage.io".to_string()),
//!     ..Default::default()
//! })?;
//! let response = provider.read::<GroupKind>(ReadRequest::new("team-a")).await;
//! ```

pub mod data_source;
pub mod diagnostics;
pub mod entity_ref;
pub mod fallback;
pub mod kind;
pub mod location;
pub mod provider;
pub mod read;
pub mod state;

pub use data_source::{EntitiesRequest, ReadRequest};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use fallback::{EntitiesFallback, FALLBACK_ID, Fallback};
pub use location::LocationState;
pub use provider::{Provider, ProviderAttributes, ProviderConfigError, ProviderSettings};
pub use read::Response;
