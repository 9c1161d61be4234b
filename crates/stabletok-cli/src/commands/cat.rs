use std::io::{BufRead, Write};

use stabletok::VocabStore;

use crate::{
    input_output::{InputArgs, OutputArgs},
    vocab_source::VocabSourceArgs,
};

/// The cat mode.
#[derive(Debug, Clone, Copy)]
pub enum CatMode {
    Encode,
    Decode,
}

/// Mode selection for the cat command.
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub struct CatModeArgs {
    /// Encode from text to tokens.
    #[arg(long, action=clap::ArgAction::SetTrue)]
    encode: bool,

    /// Decode from tokens to text.
    #[arg(long, action=clap::ArgAction::SetTrue)]
    decode: bool,
}

impl CatModeArgs {
    /// Get the mode; the arg group guarantees exactly one flag is set.
    pub fn mode(&self) -> CatMode {
        if self.decode {
            CatMode::Decode
        } else {
            CatMode::Encode
        }
    }
}

/// Args for the cat command.
#[derive(clap::Args, Debug)]
pub struct CatArgs {
    #[command(flatten)]
    source: VocabSourceArgs,

    #[command(flatten)]
    mode: CatModeArgs,

    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    output: OutputArgs,
}

impl CatArgs {
    /// Run the cat command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let loaded = self.source.load()?;

        let mut reader = self.input.open_reader()?;
        let mut writer = self.output.open_writer()?;

        match self.mode.mode() {
            CatMode::Encode => run_cat_encode(&mut reader, &mut writer, &loaded.store)?,
            CatMode::Decode => run_cat_decode(&mut reader, &mut writer, &loaded.store)?,
        }

        Ok(())
    }
}

fn run_cat_encode(
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
    store: &VocabStore<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Read lines, but keep the end-of-line characters.
    let mut line = String::new();
    while reader.read_line(&mut line)? > 0 {
        let tokens = store.tokenize(&line);

        for (idx, token) in tokens.iter().enumerate() {
            write!(writer, "{}{}", if idx == 0 { "" } else { " " }, token)?;
        }
        writeln!(writer)?;
        writer.flush()?;
        line.clear();
    }
    Ok(())
}

fn run_cat_decode(
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
    store: &VocabStore<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    for line in reader.lines() {
        let tokens = line?
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<u32>, _>>()?;

        writer.write_all(&store.decode_to_bytes(&tokens))?;
        writer.flush()?;
    }
    Ok(())
}
