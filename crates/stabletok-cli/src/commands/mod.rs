use crate::commands::{adapt::AdaptArgs, build::BuildArgs, cat::CatArgs, inspect::InspectArgs};

pub mod adapt;
pub mod build;
pub mod cat;
pub mod inspect;

/// Subcommands for stabletok-cli
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build a stable vocabulary from a token list.
    Build(BuildArgs),

    /// Act as a streaming segmenter.
    Cat(CatArgs),

    /// Stream a corpus through the adaptive monitor.
    Adapt(AdaptArgs),

    /// Summarize a vocabulary or persisted state.
    Inspect(InspectArgs),
}

impl Commands {
    /// Run the subcommand.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Commands::Build(cmd) => cmd.run(),
            Commands::Cat(cmd) => cmd.run(),
            Commands::Adapt(cmd) => cmd.run(),
            Commands::Inspect(cmd) => cmd.run(),
        }
    }
}
