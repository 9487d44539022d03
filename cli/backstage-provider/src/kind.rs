//! The entity kinds that can be read individually.

use std::fmt::Debug;

use backstage_catalog::types::{
    ApiSpec,
    ComponentSpec,
    DEFAULT_API_VERSION,
    DomainSpec,
    GroupSpec,
    LocationSpec,
    ResourceSpec,
    SystemSpec,
    UserSpec,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Static description of a catalog entity kind.
///
/// A single generic read is instantiated per kind, the kind only contributes
/// its name, its default API version and the shape of its spec.
pub trait EntityKind {
    /// Kind name as used in catalog paths and diagnostics, e.g. `Component`.
    const KIND: &'static str;
    /// API version assumed when a fallback does not name one.
    const API_VERSION: &'static str = DEFAULT_API_VERSION;

    type Spec: DeserializeOwned + Serialize + Clone + Default + Debug + PartialEq;
}

macro_rules! entity_kinds {
    ($($(#[$meta:meta])* $marker:ident => $kind:literal, $spec:ty;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $marker;

            impl EntityKind for $marker {
                const KIND: &'static str = $kind;

                type Spec = $spec;
            }
        )*
    };
}

entity_kinds! {
    /// A piece of software, e.g. a service or a website.
    ComponentKind => "Component", ComponentSpec;
    /// An interface exposed by a component.
    ApiKind => "API", ApiSpec;
    GroupKind => "Group", GroupSpec;
    UserKind => "User", UserSpec;
    /// Infrastructure a component needs at runtime.
    ResourceKind => "Resource", ResourceSpec;
    SystemKind => "System", SystemSpec;
    DomainKind => "Domain", DomainSpec;
    /// A marker referencing other places to look for catalog data.
    LocationKind => "Location", LocationSpec;
}
