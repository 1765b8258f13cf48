use anyhow::Result;
use clap::Parser;
use futures_util::StreamExt;
use s2_tci::report::Report;
use s2_tci::selection::{selection_toml, Selection};
use s2_tci::session::Session;
use s2_tci::tci::get_tci;
use s2_tci::{FetchResult, Mode};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const REPORT_FILE: &str = "tci_report.json";

/// Retrieve Sentinel-2 true colour images for an area of interest.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Selection file describing what to retrieve
    #[arg(short, long, default_value = "./inputs/selection.toml")]
    selection: PathBuf,

    /// Override the selection's output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Override the selection's concurrency limit
    #[arg(short, long)]
    max_in_flight: Option<usize>,

    /// Keep images in memory instead of writing them to disk
    #[arg(long)]
    stream: bool,

    #[arg(long, env = "DHUS_USER")]
    user: Option<String>,

    #[arg(long, env = "DHUS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Write a selection template to the given path and exit
    #[arg(long)]
    write_template: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "info,s2_tci=debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = &args.write_template {
        Selection::from_template(&selection_toml())?.write(path)?;
        info!(path = %path.display(), "wrote selection template");
        return Ok(());
    }

    let mut selection = Selection::read(&args.selection)?;
    if let Some(output_dir) = args.output_dir {
        selection.output_dir = output_dir;
    }
    if let Some(max_in_flight) = args.max_in_flight {
        selection.max_in_flight = max_in_flight;
    }

    let client = reqwest::Client::builder().build()?;
    let session = match (&args.user, &args.password) {
        (Some(user), Some(password)) => Session::with_credentials(client, user, password),
        _ => Session::new(client),
    };
    let session = Arc::new(session);

    if args.stream {
        let mut images = get_tci(session, &selection, Mode::Stream).await?;
        let total = images.len();
        while let Some(result) = images.next().await {
            if let FetchResult::Bytes(bytes) = result {
                info!(size = bytes.len(), "[{}/{}] received image", images.yielded(), total);
            }
        }
        info!(
            images = images.yielded(),
            skipped = images.skipped().len(),
            "retrieved images"
        );
        return Ok(());
    }

    let output_dir = selection.output_dir.clone();
    let mode = Mode::Download {
        output_dir: output_dir.clone(),
        skip: selection.skip_set(),
    };
    let mut downloads = get_tci(session, &selection, mode).await?;
    let total = downloads.len();

    let mut files = vec![];
    while let Some(result) = downloads.next().await {
        if let FetchResult::FilePath(path) = result {
            info!(path = %path.display(), "[{}/{}] file ready", downloads.yielded(), total);
            files.push(path);
        }
    }
    info!(
        files = files.len(),
        skipped = downloads.skipped().len(),
        "downloaded files"
    );

    Report::new(total, files, downloads.skipped()).write(output_dir.join(REPORT_FILE))?;
    Ok(())
}
