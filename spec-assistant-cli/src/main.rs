mod input;
mod render;
mod review;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use spec_assistant_core::{
    BackendClient, ExportFormat, ExtractionRun, ReviewPolicy, ReviewSession, SavedExtraction,
    DEFAULT_BACKEND_URL,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::render::render_history;
use crate::review::{run_review, ExportTarget, ReviewEnd};

/// Spec Assistant: extract specification keys from PDFs and review them
#[derive(Parser, Debug)]
#[command(name = "spec-assistant")]
#[command(about = "Extract specification keys from PDFs and review them", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "SPEC_ASSISTANT_URL", default_value = DEFAULT_BACKEND_URL)]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload PDF documents and print their file ids
    Upload(UploadArgs),
    /// Run a key extraction and save the results, with the requested key order, as JSON
    Extract(ExtractArgs),
    /// Review extraction results key by key, then export them
    Review(ReviewArgs),
    /// List stored extraction runs
    History,
}

#[derive(Parser, Debug)]
struct UploadArgs {
    /// PDF files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// File id returned by `upload` (repeatable)
    #[arg(long = "file-id", required = true)]
    file_ids: Vec<String>,

    /// Key to extract (repeatable)
    #[arg(long = "key", required = true)]
    keys: Vec<String>,

    /// Language for extracted values
    #[arg(long, default_value = "en", value_parser = ["en", "de"])]
    language: String,

    /// Write the results here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ReviewArgs {
    /// Saved extraction results (output of `extract -o`)
    #[arg(long, conflicts_with = "file_ids")]
    results: Option<PathBuf>,

    /// Run a fresh extraction over these file ids (repeatable)
    #[arg(long = "file-id")]
    file_ids: Vec<String>,

    /// Keys to review, in review order (repeatable)
    #[arg(long = "key")]
    keys: Vec<String>,

    /// Language for extracted values
    #[arg(long, default_value = "en", value_parser = ["en", "de"])]
    language: String,

    /// Export document format: xlsx or pdf
    #[arg(long, default_value_t = ExportFormat::Xlsx)]
    format: ExportFormat,

    /// Where to write the export [default: extracted_keys.<format>]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Refuse edits that leave a key empty
    #[arg(long)]
    reject_empty_edits: bool,
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn run_upload(client: &BackendClient, args: UploadArgs) -> Result<()> {
    let paths: Vec<&Path> = args.files.iter().map(PathBuf::as_path).collect();
    let upload = client.upload_pdfs(&paths)?;

    for file in &upload.processed {
        let name = file.original_filename.as_deref().unwrap_or(&file.filename);
        println!("{}\t{}\t{} page(s)", file.file_id, name, file.total_pages);
    }
    for failed in &upload.failed {
        eprintln!("Failed to process: {}", failed);
    }
    if upload.processed.is_empty() {
        return Err(anyhow!("No files were processed"));
    }
    Ok(())
}

fn run_extract(client: &BackendClient, args: ExtractArgs) -> Result<()> {
    let response = client.extract_keys(&args.file_ids, &args.keys, &args.language)?;
    let saved = SavedExtraction::new(&args.keys, response);
    let pretty = serde_json::to_string_pretty(&saved).context("Failed to format results")?;

    match args.output {
        Some(path) => {
            fs::write(&path, pretty)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote extraction results to {}", path.display());
        }
        None => println!("{}", pretty),
    }
    Ok(())
}

fn load_run(client: &BackendClient, args: &ReviewArgs) -> Result<ExtractionRun> {
    if let Some(path) = &args.results {
        let saved = read_json(path)?;
        if args.keys.is_empty() {
            return Ok(ExtractionRun::from_saved_response(&saved));
        }
        let results = SavedExtraction::from_value(&saved)
            .map(|saved| saved.results)
            .unwrap_or(saved);
        return Ok(ExtractionRun::from_response(args.keys.clone(), &results));
    }

    if args.file_ids.is_empty() || args.keys.is_empty() {
        bail!("Pass --results, or at least one --file-id and one --key");
    }
    let response = client.extract_keys(&args.file_ids, &args.keys, &args.language)?;
    Ok(ExtractionRun::from_response(args.keys.clone(), &response))
}

fn run_review_command(client: &BackendClient, args: ReviewArgs) -> Result<()> {
    let run = load_run(client, &args)?;
    if run.is_empty() {
        bail!("Nothing to review: the extraction has no keys");
    }

    let policy = ReviewPolicy {
        allow_empty_edits: !args.reject_empty_edits,
    };
    let mut session = ReviewSession::start(run, policy);
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(args.format.default_filename()));
    let target = ExportTarget {
        format: args.format,
        output,
        file_ids: args.file_ids,
        language: args.language,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let end = run_review(&mut session, client, &target, stdin.lock(), &mut stdout)?;
    stdout.flush()?;

    if end == ReviewEnd::EndOfInput && !session.all_reviewed() {
        warn!("{} key(s) left unreviewed", session.pending_count());
    }
    Ok(())
}

fn run_history(client: &BackendClient) -> Result<()> {
    let records = client.list_extraction_results()?;
    println!("{}", render_history(&records));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let client = BackendClient::new(&cli.url)?;

    match cli.command {
        Commands::Upload(args) => run_upload(&client, args),
        Commands::Extract(args) => run_extract(&client, args),
        Commands::Review(args) => run_review_command(&client, args),
        Commands::History => run_history(&client),
    }
}
