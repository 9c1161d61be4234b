use std::io::Write;

use stabletok::{
    VocabMapping,
    allocation::build_stable_mapping,
    vocab::io::{read_token_lines, write_json_vocab, write_token_list},
};

use crate::input_output::{InputArgs, OutputArgs};

/// Output format for a built vocabulary.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum VocabFormat {
    /// A JSON ``token -> id`` object.
    #[default]
    Json,

    /// One token per line, in id order.
    Lines,
}

/// Args for the build command.
#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Optional JSON config file; only the allocator section is used.
    #[arg(long, default_value = None)]
    config: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = VocabFormat::Json)]
    format: VocabFormat,

    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    output: OutputArgs,
}

impl BuildArgs {
    /// Run the build command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config = match &self.config {
            Some(path) => stabletok::StabletokConfig::from_json_path(path)?,
            None => Default::default(),
        };

        let tokens = read_token_lines(self.input.open_reader()?)?;
        let mapping: VocabMapping<u32> = build_stable_mapping(tokens, &config.allocator)?;

        let mut writer = self.output.open_writer()?;
        match self.format {
            VocabFormat::Json => write_json_vocab(&mapping, &mut writer)?,
            VocabFormat::Lines => write_token_list(&mapping, &mut writer)?,
        }
        writer.flush()?;

        log::info!("wrote {} tokens", mapping.len());
        Ok(())
    }
}
