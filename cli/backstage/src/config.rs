use std::path::Path;

use anyhow::{Context, Result};
use backstage_catalog::types::{
    ApiSpec,
    ComponentSpec,
    DomainSpec,
    GroupSpec,
    LocationSpec,
    ResourceSpec,
    SystemSpec,
    UserSpec,
};
use backstage_provider::{EntitiesRequest, ProviderAttributes, ReadRequest};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::debug;

/// Declaration file read when none is given.
pub const DEFAULT_DECLARATIONS_FILE: &str = "backstage.toml";

/// Provider settings and the reads to perform, as declared in a TOML file.
///
/// ```toml
/// [provider]
/// base_url = "https://demo.backstage.io"
///
/// [[group]]
/// name = "team-a"
///
/// [group.fallback]
/// name = "team-a"
/// spec = { type = "team" }
///
/// [[entities]]
/// filters = ["kind=component"]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declarations {
    #[serde(default)]
    pub provider: ProviderAttributes,
    #[serde(default)]
    pub component: Vec<ReadRequest<ComponentSpec>>,
    #[serde(default)]
    pub api: Vec<ReadRequest<ApiSpec>>,
    #[serde(default)]
    pub group: Vec<ReadRequest<GroupSpec>>,
    #[serde(default)]
    pub user: Vec<ReadRequest<UserSpec>>,
    #[serde(default)]
    pub resource: Vec<ReadRequest<ResourceSpec>>,
    #[serde(default)]
    pub system: Vec<ReadRequest<SystemSpec>>,
    #[serde(default)]
    pub domain: Vec<ReadRequest<DomainSpec>>,
    #[serde(default)]
    pub location: Vec<ReadRequest<LocationSpec>>,
    #[serde(default)]
    pub entities: Vec<EntitiesRequest>,
}

impl Declarations {
    /// Load declarations from the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading declarations");
        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()
            .with_context(|| format!("Could not read declarations from '{}'", path.display()))?;

        config
            .try_deserialize()
            .with_context(|| format!("Could not parse declarations in '{}'", path.display()))
    }

    /// Number of declared reads.
    pub fn count(&self) -> usize {
        self.component.len()
            + self.api.len()
            + self.group.len()
            + self.user.len()
            + self.resource.len()
            + self.system.len()
            + self.domain.len()
            + self.location.len()
            + self.entities.len()
    }
}
