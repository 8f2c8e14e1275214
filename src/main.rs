use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use digicam::capture::FileCaptureSource;
use digicam::config::{DEFAULT_ENDPOINT, PipelineConfig};
use digicam::filter::FilterKind;
use digicam::remote::RequestEncoding;
use digicam::session::CaptureSession;
use digicam::store::fs::FsMediaStore;

/// Drive the capture-and-filter pipeline from the command line:
/// "capture" an image file, optionally run it through the remote filter
/// endpoint, and save the result into a local media library.
#[derive(Parser, Debug)]
#[command(name = "digicam")]
#[command(about = "📷 Capture, filter via a remote endpoint, and save to the DigiCam album")]
struct Args {
    /// Image file to capture as the camera frame
    input: PathBuf,

    /// Filter to apply before saving
    #[arg(short, long, value_enum)]
    filter: Option<FilterKind>,

    /// Remote filter endpoint URL
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Request body encoding for filter calls
    #[arg(long, value_enum, default_value_t = RequestEncoding::Json)]
    encoding: RequestEncoding,

    /// Media library directory
    #[arg(short, long, default_value = "./library")]
    library: PathBuf,

    /// Remote call timeout in seconds (0 = wait forever)
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Also build the per-filter preview strip
    #[arg(long)]
    previews: bool,

    /// Discard instead of saving (dry run of the filter round-trip)
    #[arg(long)]
    discard: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = PipelineConfig {
        endpoint: args.endpoint,
        encoding: args.encoding,
        ..PipelineConfig::default()
    };
    config.timeout = match args.timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    let store = FsMediaStore::open(&args.library)
        .await
        .with_context(|| format!("opening library at {}", args.library.display()))?;
    let mut session = CaptureSession::builder()
        .camera(FileCaptureSource::single(args.input))
        .store(store)
        .config(config)
        .build()?;

    if let Some(last) = session.refresh_last_saved().await? {
        println!("Last shot: {}", last);
    }

    session.capture().await.context("capture failed")?;

    if args.previews {
        let previews = session.refresh_previews().await?;
        println!("Previews: {}/{} available", previews.len(), FilterKind::ALL.len());
        for (filter, preview) in previews.iter() {
            println!("  {:<11} {}", filter, preview);
        }
    }

    if let Some(filter) = args.filter {
        session
            .apply_filter(filter)
            .await
            .with_context(|| format!("applying filter '{}'", filter))?;
        println!("Applied '{}' filter", filter);
    }

    if args.discard {
        session.discard(true);
        println!("Capture discarded");
        return Ok(());
    }

    let asset = session.save().await.context("save failed")?;
    println!("Saved {} -> {}", asset.id, asset.path.display());
    Ok(())
}
