use std::path::PathBuf;

use anyhow::{Result, bail};
use backstage_catalog::ClientTrait;
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
use backstage_provider::state::{EntitiesState, EntityState};
use backstage_provider::{Diagnostics, Provider, ReadRequest, Response};
use bpaf::Bpaf;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{configure_from, print_diagnostics, print_json};
use crate::config::{DEFAULT_DECLARATIONS_FILE, Declarations};

#[derive(Bpaf, Clone, Debug)]
pub struct Read {
    /// Declaration file listing the provider settings and the reads to perform
    #[bpaf(
        short,
        long,
        argument("FILE"),
        fallback(PathBuf::from(DEFAULT_DECLARATIONS_FILE))
    )]
    file: PathBuf,
}

/// States of all declared reads, in declaration order.
///
/// A read that failed without a fallback is `null`.
#[derive(Debug, Default, Serialize)]
pub struct ReadOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    component: Vec<Option<EntityState<<ComponentKind as EntityKind>::Spec>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    api: Vec<Option<EntityState<<ApiKind as EntityKind>::Spec>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    group: Vec<Option<EntityState<<GroupKind as EntityKind>::Spec>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    user: Vec<Option<EntityState<<UserKind as EntityKind>::Spec>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    resource: Vec<Option<EntityState<<ResourceKind as EntityKind>::Spec>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<Option<EntityState<<SystemKind as EntityKind>::Spec>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    domain: Vec<Option<EntityState<<DomainKind as EntityKind>::Spec>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    location: Vec<Option<EntityState<<LocationKind as EntityKind>::Spec>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entities: Vec<Option<EntitiesState>>,
}

impl Read {
    #[instrument(name = "read", skip_all, fields(file = %self.file.display()))]
    pub async fn handle(self) -> Result<()> {
        let declarations = Declarations::load(&self.file)?;
        let provider = configure_from(&declarations.provider)?;
        debug!(reads = declarations.count(), "performing declared reads");

        let (output, diagnostics) = run(&provider, declarations).await;

        print_diagnostics(&diagnostics);
        print_json(&output)?;
        if diagnostics.has_error() {
            bail!("{} declared read(s) failed", diagnostics.errors().count());
        }
        Ok(())
    }
}

/// Collect the states of responses and merge their diagnostics.
fn collect<T>(responses: Vec<Response<T>>, diagnostics: &mut Diagnostics) -> Vec<Option<T>> {
    responses
        .into_iter()
        .map(|response| {
            diagnostics.append(response.diagnostics);
            response.state
        })
        .collect()
}

async fn read_all<K: EntityKind, C: ClientTrait>(
    provider: &Provider<C>,
    requests: Vec<ReadRequest<K::Spec>>,
) -> Vec<Response<EntityState<K::Spec>>> {
    join_all(
        requests
            .into_iter()
            .map(|request| provider.read::<K>(request)),
    )
    .await
}

/// Perform every read in `declarations` concurrently.
///
/// Reads are independent, a failed read does not affect the others.
pub(crate) async fn run<C: ClientTrait>(
    provider: &Provider<C>,
    declarations: Declarations,
) -> (ReadOutput, Diagnostics) {
    let (component, api, group, user, resource, system, domain, location, entities) = futures::join!(
        read_all::<ComponentKind, C>(provider, declarations.component),
        read_all::<ApiKind, C>(provider, declarations.api),
        read_all::<GroupKind, C>(provider, declarations.group),
        read_all::<UserKind, C>(provider, declarations.user),
        read_all::<ResourceKind, C>(provider, declarations.resource),
        read_all::<SystemKind, C>(provider, declarations.system),
        read_all::<DomainKind, C>(provider, declarations.domain),
        read_all::<LocationKind, C>(provider, declarations.location),
        join_all(
            declarations
                .entities
                .into_iter()
                .map(|request| provider.read_entities(request))
        ),
    );

    let mut diagnostics = Diagnostics::new();
    let output = ReadOutput {
        component: collect(component, &mut diagnostics),
        api: collect(api, &mut diagnostics),
        group: collect(group, &mut diagnostics),
        user: collect(user, &mut diagnostics),
        resource: collect(resource, &mut diagnostics),
        system: collect(system, &mut diagnostics),
        domain: collect(domain, &mut diagnostics),
        location: collect(location, &mut diagnostics),
        entities: collect(entities, &mut diagnostics),
    };
    (output, diagnostics)
}
