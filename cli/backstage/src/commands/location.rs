use std::path::PathBuf;

use anyhow::Result;
use backstage_provider::LocationState;
use bpaf::Bpaf;
use tracing::instrument;

use super::{configure_provider, finish, print_json};
use crate::utils::message;

#[derive(Bpaf, Clone, Debug)]
pub enum LocationCommands {
    /// Register a catalog-info file as a location
    #[bpaf(command)]
    Create {
        /// Declaration file to take the provider settings from
        #[bpaf(short, long, argument("FILE"))]
        file: Option<PathBuf>,

        /// URL of the catalog-info file
        #[bpaf(positional("TARGET"))]
        target: String,
    },

    /// Show a registered location
    #[bpaf(command)]
    Show {
        /// Declaration file to take the provider settings from
        #[bpaf(short, long, argument("FILE"))]
        file: Option<PathBuf>,

        /// Id of the location
        #[bpaf(positional("ID"))]
        id: String,
    },

    /// Remove a registered location
    #[bpaf(command)]
    Delete {
        /// Declaration file to take the provider settings from
        #[bpaf(short, long, argument("FILE"))]
        file: Option<PathBuf>,

        /// Id of the location
        #[bpaf(positional("ID"))]
        id: String,
    },
}

impl LocationCommands {
    #[instrument(name = "location", skip_all)]
    pub async fn handle(self) -> Result<()> {
        match self {
            LocationCommands::Create { file, target } => {
                let provider = configure_provider(file.as_deref())?;
                let response = provider.create_location(&target).await;
                if let Some(state) = finish(response, "create location")? {
                    message::created(format_args!(
                        "Registered location '{}' for {}",
                        state.id, state.target
                    ));
                    print_json(&state)?;
                }
            },
            LocationCommands::Show { file, id } => {
                let provider = configure_provider(file.as_deref())?;
                let response = provider.read_location(LocationState::with_id(id)).await;
                if let Some(state) = finish(response, "read location")? {
                    print_json(&state)?;
                }
            },
            LocationCommands::Delete { file, id } => {
                let provider = configure_provider(file.as_deref())?;
                let response = provider.delete_location(&id).await;
                finish(response, "delete location")?;
                message::deleted(format_args!("Removed location '{id}'"));
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bpaf::Parser;

    use super::*;

    #[test]
    fn parses_subcommands() {
        let create = location_commands()
            .to_options()
            .run_inner(&["create", "https://example.com/catalog-info.yaml"])
            .unwrap();
        assert!(matches!(
            create,
            LocationCommands::Create { file: None, ref target } if target == "https://example.com/catalog-info.yaml"
        ));

        let delete = location_commands()
            .to_options()
            .run_inner(&["delete", "-f", "backstage.toml", "b5a6c7d8"])
            .unwrap();
        assert!(matches!(
            delete,
            LocationCommands::Delete { file: Some(_), ref id } if id == "b5a6c7d8"
        ));
    }
}
