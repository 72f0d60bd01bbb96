use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use vizsim::prelude::*;
use vizsim::ImageId;

/// Content-based image retrieval over a directory of images
#[derive(Parser, Debug)]
#[command(name = "vizsim")]
#[command(about = "Describe images and find visually similar ones", long_about = None)]
struct Args {
    /// JSON configuration file (extractor settings, weights, min_confidence)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the descriptor set of one image as JSON
    Describe {
        image: PathBuf,
    },
    /// Rank the images of a directory by similarity to a query
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Query image file
    #[arg(long, required_unless_present = "query_id", conflicts_with = "query_id")]
    query: Option<PathBuf>,

    /// Use an image of the corpus (by file name) as the query
    #[arg(long)]
    query_id: Option<String>,

    /// Query with one detected object of the query image instead of the whole image
    #[arg(long)]
    object_index: Option<usize>,

    /// Directory of corpus images
    #[arg(long)]
    corpus: PathBuf,

    /// Number of results
    #[arg(short, long, default_value_t = 10)]
    k: usize,

    /// Ranking mode: whole or object
    #[arg(long, default_value = "whole")]
    mode: RankMode,

    /// Only consider images containing an object of this class
    #[arg(long)]
    object_class: Option<String>,

    /// JSON file mapping image file names to detected objects
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Include per-channel breakdowns and ranking stats
    #[arg(long)]
    explain: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::load_or_default(args.config.as_deref())
        .with_context(|| format!("invalid configuration {:?}", args.config))?;
    let extractor = DescriptorExtractor::new(config.extractor.clone())?;

    match args.command {
        Command::Describe { image } => {
            let descriptors = extractor.extract_path(&FsImageLoader, &image)?;
            print_json(&descriptors)
        }
        Command::Search(search) => run_search(&config, &extractor, search),
    }
}

fn run_search(config: &AppConfig, extractor: &DescriptorExtractor, args: SearchArgs) -> anyhow::Result<()> {
    let detections = match &args.detections {
        Some(path) => load_detections(path)?,
        None => HashMap::new(),
    };
    let objects_for = |path: &Path| -> Option<Vec<DetectedObject>> {
        let name = path.file_name()?.to_string_lossy();
        detections.get(name.as_ref()).cloned()
    };

    let ingestor = Ingestor::new(extractor, &FsImageLoader).with_min_confidence(config.min_confidence);

    let paths = list_images(&args.corpus)
        .with_context(|| format!("cannot list corpus directory {}", args.corpus.display()))?;
    info!("Ingesting {} images from {}", paths.len(), args.corpus.display());

    let corpus = InMemoryCorpus::new();
    for (path, outcome) in ingestor.ingest_batch_with(&paths, &objects_for) {
        let inserted = outcome.and_then(|ingested| {
            report_gaps(&path, &ingested);
            corpus.insert(ingested.record)
        });
        if let Err(e) = inserted {
            warn!(path = %path.display(), "skipped: {}", e);
        }
    }
    info!("Corpus ready: {} images", corpus.count());

    let query = match (&args.query, &args.query_id) {
        (Some(path), _) => {
            // Random id so the query never shadows a corpus file name
            let ingested = ingestor.ingest_path_with_objects(ImageId::random(), path, objects_for(path))?;
            report_gaps(path, &ingested);
            Arc::new(ingested.record)
        }
        (None, Some(id)) => corpus
            .get(&ImageId::from(id.as_str()))
            .ok_or_else(|| Error::ImageNotFound(id.clone()))?,
        (None, None) => anyhow::bail!("either --query or --query-id is required"),
    };

    let mut request = RankRequest::new(args.k).with_mode(args.mode);
    if let Some(class_label) = args.object_class {
        request = request.with_class_filter(class_label);
    }

    let ranker = SimilarityRanker::new(DescriptorComparator::new(config.weights)?);
    if args.explain {
        let response = ranker.search_existing(&query, args.object_index, &corpus, &request)?;
        print_json(&response)
    } else {
        let results = ranker.rank_existing(&query, args.object_index, &corpus, &request)?;
        print_json(&results)
    }
}

fn report_gaps(path: &Path, ingested: &Ingested) {
    for failure in &ingested.failures {
        match failure.object_index {
            Some(index) => warn!(path = %path.display(), object = index, "{}", failure.error),
            None => warn!(path = %path.display(), "{}", failure.error),
        }
    }
}

fn load_detections(path: &Path) -> anyhow::Result<HashMap<String, Vec<DetectedObject>>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read detections {}", path.display()))?;
    let detections = serde_json::from_str(&json)
        .with_context(|| format!("malformed detections {}", path.display()))?;
    Ok(detections)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
