mod get;
mod location;
mod read;

use std::path::Path;

use anyhow::{Result, bail};
use backstage_provider::{Diagnostics, Provider, ProviderAttributes, Response};
use bpaf::Bpaf;
use indoc::indoc;
use serde::Serialize;

use crate::config::Declarations;
use crate::utils::message;

const BACKSTAGE_DESCRIPTION: &str = indoc! {"
    Read entities from a Backstage software catalog.

    Reads can declare a fallback that is used if the catalog cannot serve them.
    A failed read with a fallback is reported as a warning, without one it is an error."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(
    options,
    descr(BACKSTAGE_DESCRIPTION),
    footer("Provider settings can also be given as BACKSTAGE_* environment variables.")
)]
pub struct BackstageCli(#[bpaf(external(backstage_args))] pub BackstageArgs);

/// Main args parser
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)]
pub struct BackstageArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    #[bpaf(external(commands))]
    command: Commands,
}

impl BackstageArgs {
    pub async fn handle(self) -> Result<()> {
        match self.command {
            Commands::Read(args) => args.handle().await,
            Commands::Get(args) => args.handle().await,
            Commands::Location(args) => args.handle().await,
        }
    }
}

#[derive(Bpaf, Clone, Debug)]
enum Commands {
    /// Perform all reads declared in a declaration file
    #[bpaf(command)]
    Read(#[bpaf(external(read::read))] read::Read),

    /// Read a single entity
    #[bpaf(command)]
    Get(#[bpaf(external(get::get))] get::Get),

    /// Register, show and remove catalog locations
    #[bpaf(command)]
    Location(#[bpaf(external(location::location_commands))] location::LocationCommands),
}

/// Configure the provider from the `[provider]` table of `file`, or from the
/// environment alone if no file is given.
fn configure_provider(file: Option<&Path>) -> Result<Provider> {
    let attributes = match file {
        Some(file) => Declarations::load(file)?.provider,
        None => ProviderAttributes::default(),
    };
    configure_from(&attributes)
}

fn configure_from(attributes: &ProviderAttributes) -> Result<Provider> {
    match Provider::configure(attributes) {
        Ok(provider) => Ok(provider),
        Err(diagnostics) => {
            print_diagnostics(&diagnostics);
            bail!("Invalid provider configuration");
        },
    }
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        message::diagnostic(diagnostic);
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the diagnostics and state of a single operation.
///
/// Fails if any diagnostic is an error.
fn finish<T>(response: Response<T>, description: &str) -> Result<Option<T>> {
    print_diagnostics(&response.diagnostics);
    if response.diagnostics.has_error() {
        bail!("Failed to {description}");
    }
    Ok(response.state)
}
