use std::{collections::BTreeMap, io::Write};

use serde::Serialize;
use stabletok::{TokenCategory, updater::CommitRecord};

use crate::{input_output::OutputArgs, vocab_source::VocabSourceArgs};

/// Args for the inspect command.
#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    source: VocabSourceArgs,

    /// Include the commit history.
    #[arg(long, action=clap::ArgAction::SetTrue)]
    history: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Serialize)]
struct VocabReport {
    size: usize,
    unk_id: u32,
    max_id: Option<u32>,
    trie_nodes: usize,
    estimated_memory_bytes: usize,
    categories: BTreeMap<TokenCategory, usize>,
    commits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<Vec<CommitRecord>>,
}

impl InspectArgs {
    /// Run the inspect command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let loaded = self.source.load()?;
        let snapshot = loaded.store.snapshot();
        let mapping = snapshot.mapping();

        let mut categories = BTreeMap::new();
        for record in mapping.records() {
            *categories.entry(record.category()).or_insert(0) += 1;
        }

        let history = loaded.updater.history();
        let report = VocabReport {
            size: snapshot.size(),
            unk_id: snapshot.unk_id(),
            max_id: mapping.max_token(),
            trie_nodes: snapshot.index().node_count(),
            estimated_memory_bytes: snapshot.estimated_memory_bytes(),
            categories,
            commits: history.len(),
            history: self.history.then_some(history),
        };

        let mut writer = self.output.open_writer()?;
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
