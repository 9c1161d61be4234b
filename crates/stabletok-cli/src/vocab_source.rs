use std::{path::Path, sync::Arc};

use stabletok::{
    AdaptiveMonitor, StableIdAllocator, StabletokConfig, TransactionalUpdater, VocabMapping,
    VocabStore,
    updater::PersistedState,
    vocab::io::{load_json_vocab_path, load_token_list_path},
};

/// Vocabulary and configuration source arg group.
#[derive(clap::Args, Debug)]
pub struct VocabSourceArgs {
    /// Optional JSON config file; missing fields take their defaults.
    #[arg(long, default_value = None)]
    config: Option<String>,

    /// Vocabulary file; ``.json`` files are read as JSON vocabs, anything
    /// else as a token-per-line list.
    #[arg(long, default_value = None, conflicts_with = "state")]
    vocab: Option<String>,

    /// Persisted state file, as written by ``adapt --save-state``.
    #[arg(long, default_value = None)]
    state: Option<String>,
}

/// A loaded vocabulary, with the components built over it.
pub struct LoadedVocab {
    pub config: StabletokConfig,
    pub store: Arc<VocabStore<u32>>,
    pub updater: TransactionalUpdater<u32>,
}

impl LoadedVocab {
    /// Build a monitor over the store.
    pub fn monitor(&self) -> Result<AdaptiveMonitor<u32>, Box<dyn std::error::Error>> {
        Ok(AdaptiveMonitor::new(
            self.store.clone(),
            self.config.monitor.clone(),
        )?)
    }
}

impl VocabSourceArgs {
    /// Load the config, or the default config.
    pub fn load_config(&self) -> Result<StabletokConfig, Box<dyn std::error::Error>> {
        Ok(match &self.config {
            Some(path) => StabletokConfig::from_json_path(path)?,
            None => StabletokConfig::default(),
        })
    }

    /// Load the vocabulary and build the store and updater.
    pub fn load(&self) -> Result<LoadedVocab, Box<dyn std::error::Error>> {
        let config = self.load_config()?;
        let allocator = StableIdAllocator::new(config.allocator.clone())?;

        let (mapping, history) = match (&self.vocab, &self.state) {
            (Some(path), _) => (load_vocab_file(path, &config)?, Vec::new()),
            (None, Some(path)) => {
                let doc = PersistedState::load_path(path)?;
                let mapping = doc.restore_mapping(allocator.policy())?;
                (mapping, doc.history)
            }
            (None, None) => return Err("one of --vocab or --state is required".into()),
        };
        log::info!("loaded {} tokens", mapping.len());

        let store = Arc::new(VocabStore::new(mapping, config.store.clone())?);
        let updater =
            TransactionalUpdater::new(store.clone(), allocator, config.updater.clone())?
                .with_history(history);

        Ok(LoadedVocab {
            config,
            store,
            updater,
        })
    }
}

fn load_vocab_file(
    path: &str,
    config: &StabletokConfig,
) -> Result<VocabMapping<u32>, Box<dyn std::error::Error>> {
    let policy = &config.allocator.policy;
    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    Ok(if is_json {
        load_json_vocab_path(path, policy)?
    } else {
        load_token_list_path(path, policy)?
    })
}
