use std::io::{BufRead, Write};

use crate::{
    input_output::{InputArgs, OutputArgs},
    vocab_source::VocabSourceArgs,
};

/// Args for the adapt command.
#[derive(clap::Args, Debug)]
pub struct AdaptArgs {
    #[command(flatten)]
    source: VocabSourceArgs,

    /// Where to save the adapted state.
    #[arg(long, default_value = None)]
    save_state: Option<String>,

    // Corpus to stream through the monitor, one text per line.
    #[command(flatten)]
    input: InputArgs,

    // Adaptation summaries, as JSON lines.
    #[command(flatten)]
    output: OutputArgs,
}

impl AdaptArgs {
    /// Run the adapt command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let loaded = self.source.load()?;
        let monitor = loaded.monitor()?;
        let initial_size = loaded.store.size();

        let reader = self.input.open_reader()?;
        let mut writer = self.output.open_writer()?;

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (_, summary) = monitor.tokenize_with_adaptation(&line, &loaded.updater)?;
            if let Some(summary) = summary {
                serde_json::to_writer(&mut writer, &summary)?;
                writeln!(writer)?;
            }
        }
        writer.flush()?;

        let stats = monitor.stats();
        log::info!(
            "observed {} tokens ({} unknown); {} adaptation events; vocab {} -> {}",
            stats.total_tokens_seen,
            stats.total_unknown_seen,
            stats.adaptation_events,
            initial_size,
            loaded.store.size()
        );

        if let Some(path) = &self.save_state {
            loaded.updater.save_state(path)?;
        }
        Ok(())
    }
}
