use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use backstage_provider::kind::{
    ApiKind,
    ComponentKind,
    DomainKind,
    EntityKind,
    GroupKind,
    LocationKind,
    ResourceKind,
    SystemKind,
    UserKind,
};
use backstage_provider::{Provider, ReadRequest};
use bpaf::Bpaf;
use tracing::instrument;

use super::{configure_provider, finish, print_json};

/// Entity kinds that can be read individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Component,
    Api,
    Group,
    User,
    Resource,
    System,
    Domain,
    Location,
}

#[derive(Debug)]
pub struct UnknownKind(String);

impl Display for UnknownKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown kind '{}', expected one of: component, api, group, user, resource, system, domain, location",
            self.0
        )
    }
}

impl FromStr for KindArg {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "component" => Ok(KindArg::Component),
            "api" => Ok(KindArg::Api),
            "group" => Ok(KindArg::Group),
            "user" => Ok(KindArg::User),
            "resource" => Ok(KindArg::Resource),
            "system" => Ok(KindArg::System),
            "domain" => Ok(KindArg::Domain),
            "location" => Ok(KindArg::Location),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

#[derive(Bpaf, Clone, Debug)]
pub struct Get {
    /// Declaration file to take the provider settings from
    #[bpaf(short, long, argument("FILE"))]
    file: Option<PathBuf>,

    /// Namespace of the entity (default: the provider's default namespace)
    #[bpaf(short, long, argument("NAMESPACE"))]
    namespace: Option<String>,

    /// Kind of the entity, e.g. 'component' or 'group'
    #[bpaf(positional("KIND"))]
    kind: KindArg,

    /// Name of the entity
    #[bpaf(positional("NAME"))]
    name: String,
}

impl Get {
    #[instrument(name = "get", skip_all, fields(kind = ?self.kind, name = %self.name))]
    pub async fn handle(self) -> Result<()> {
        let provider = configure_provider(self.file.as_deref())?;
        match self.kind {
            KindArg::Component => self.read::<ComponentKind>(&provider).await,
            KindArg::Api => self.read::<ApiKind>(&provider).await,
            KindArg::Group => self.read::<GroupKind>(&provider).await,
            KindArg::User => self.read::<UserKind>(&provider).await,
            KindArg::Resource => self.read::<ResourceKind>(&provider).await,
            KindArg::System => self.read::<SystemKind>(&provider).await,
            KindArg::Domain => self.read::<DomainKind>(&provider).await,
            KindArg::Location => self.read::<LocationKind>(&provider).await,
        }
    }

    async fn read<K: EntityKind>(&self, provider: &Provider) -> Result<()> {
        let request = ReadRequest {
            namespace: self.namespace.clone(),
            ..ReadRequest::new(self.name.clone())
        };
        let response = provider.read::<K>(request).await;
        if let Some(state) = finish(response, &format!("read {} '{}'", K::KIND, self.name))? {
            print_json(&state)?;
        }
        Ok(())
    }
}
