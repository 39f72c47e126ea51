use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use rt04f::data::export::{write_json_lines, write_turns_csv};
use rt04f::data::preprocess::Preprocessor;
use rt04f::{registry, Config, Preprocessors, Subset};

/// Inspect the protocols of the RT04F database
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Subset to read: train, development or test (trn/dev/tst accepted)
    #[arg(default_value = "development")]
    subset: String,

    /// Protocol name
    #[arg(short, long, default_value = "RT04F.SpeakerDiarization.TV")]
    protocol: String,

    /// Directory holding the .uem/.mdtm files (overrides --config and RT04F_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Print subset statistics instead of the files
    #[arg(long)]
    stats: bool,

    /// Extra key computed from a template, e.g. audio=/wav/{uri}.wav
    #[arg(long = "preprocess", value_name = "KEY=TEMPLATE")]
    preprocess: Vec<String>,

    /// List registered protocols and exit
    #[arg(long)]
    list: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// One JSON object per file
    Json,
    /// One CSV row per speaker turn
    Csv,
}

fn parse_preprocessors(entries: &[String]) -> Result<Preprocessors> {
    let mut preprocessors = Preprocessors::new();
    for entry in entries {
        let (key, template) = entry
            .split_once('=')
            .with_context(|| format!("preprocessor '{entry}' is not KEY=TEMPLATE"))?;
        preprocessors.insert(key, Preprocessor::template(template))?;
    }
    Ok(preprocessors)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::resolve(args.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    let registry = registry(config);

    if args.list {
        info!("data directory: {}", registry.config().data_dir.display());
        for database in registry.databases() {
            for (task, protocol) in registry.protocols(database) {
                println!("{database}.{task}.{protocol}");
            }
        }
        return Ok(());
    }

    let subset: Subset = args.subset.parse()?;
    let preprocessors = parse_preprocessors(&args.preprocess)?;
    let protocol = registry
        .get_protocol_by_name(&args.protocol, preprocessors)
        .with_context(|| format!("opening protocol {}", args.protocol))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.stats {
        let stats = protocol
            .stats(subset)
            .with_context(|| format!("reading {subset} subset"))?;
        serde_json::to_writer_pretty(&mut out, &stats)?;
        writeln!(out)?;
        return Ok(());
    }

    let files = protocol
        .subset(subset)
        .with_context(|| format!("reading {subset} subset"))?;
    let written = match args.format {
        Format::Json => write_json_lines(&mut out, files),
        Format::Csv => write_turns_csv(&mut out, files),
    }
    .with_context(|| format!("exporting {subset} subset"))?;
    out.flush()?;
    info!("{}: wrote {written} {} entries", args.protocol, subset);
    Ok(())
}
