use anyhow::Context;
use clap::Parser;
use liveness_capture::capture::{CameraBackend, CameraSession, DeviceId, Facing, SyntheticBackend};
use liveness_capture::liveness::capture_documents;
use liveness_capture::submission::{write_bundle, ApplicantFields, SubmissionForm};
use liveness_capture::{begin_liveness_capture, DeviceSelection, LivenessConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// List available cameras and exit
    #[arg(long)]
    list: bool,

    /// Camera id to record with (default: best match for --facing)
    #[arg(short, long)]
    device: Option<String>,

    /// Preferred camera facing when no device is given
    #[arg(long, value_enum, default_value_t = FacingArg::Front)]
    facing: FacingArg,

    /// Camera id for the ID card photos (default: --device, else the back camera)
    #[arg(long)]
    document_device: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to write the submission bundle to
    #[arg(short, long, default_value = "liveness-submission")]
    output: PathBuf,

    /// Use the synthetic camera instead of real hardware
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Give up waiting for a full rotation after this many seconds
    #[arg(long, default_value_t = 30)]
    max_secs: u64,

    #[arg(long, default_value = "")]
    national_code: String,

    #[arg(long, default_value = "")]
    birth_date: String,

    #[arg(long, default_value = "")]
    mobile: String,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FacingArg {
    Front,
    Back,
}

impl From<FacingArg> for Facing {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::Front => Facing::Front,
            FacingArg::Back => Facing::Back,
        }
    }
}

#[cfg(feature = "native")]
fn native_backend() -> anyhow::Result<Arc<dyn CameraBackend>> {
    Ok(Arc::new(liveness_capture::capture::native::NativeBackend::new()))
}

#[cfg(not(feature = "native"))]
fn native_backend() -> anyhow::Result<Arc<dyn CameraBackend>> {
    anyhow::bail!("built without the `native` feature; use --synthetic or rebuild with --features native")
}

fn backend(synthetic: bool) -> anyhow::Result<Arc<dyn CameraBackend>> {
    if synthetic {
        return Ok(Arc::new(SyntheticBackend::demo()));
    }
    native_backend()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    liveness_capture::init_tracing();
    let args = Args::parse();

    let backend = backend(args.synthetic)?;

    if args.list {
        let devices = CameraSession::new(backend.clone()).list_devices()?;
        println!("Available Cameras:");
        println!("{:<24} | {:<30}", "Id", "Name");
        println!("{}", "-".repeat(57));
        for (index, device) in devices.iter().enumerate() {
            println!("{:<24} | {:<30}", device.id.to_string(), device.display_name(index));
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => LivenessConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => LivenessConfig::default(),
    };

    let selection = match &args.device {
        Some(id) => DeviceSelection::Device(DeviceId::new(id.as_str())),
        None => DeviceSelection::Preferred(args.facing.into()),
    };

    // ID card photos come first, on their own camera session
    let document_device = match (&args.document_device, &args.device) {
        (Some(id), _) | (None, Some(id)) => DeviceId::new(id.as_str()),
        (None, None) => {
            let devices = CameraSession::new(backend.clone()).list_devices()?;
            CameraSession::select_preferred(&devices, Facing::Back)
                .map(|d| d.id.clone())
                .context("no camera available for document photos")?
        }
    };
    println!("Capturing ID card photos with {document_device}...");
    let documents = capture_documents(
        backend.clone(),
        &document_device,
        &config.capture,
        config.warmup_timeout(),
    )
    .await
    .context("capturing document photos")?;

    let mut session = begin_liveness_capture(backend, selection, documents, config)
        .await
        .context("opening camera")?;
    println!("Recording with {} ({})", session.device().label, session.device().id);

    session.start_recording().await.context("starting recording")?;

    let deadline = Instant::now() + Duration::from_secs(args.max_secs);
    let mut last_prompt = None;
    while !session.progress().complete() && Instant::now() < deadline {
        let prompt = session.prompt();
        if last_prompt != Some(prompt) {
            println!("{}", prompt.instruction());
            last_prompt = Some(prompt);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let progress = session.progress();
    if !progress.complete() {
        println!(
            "Head rotation incomplete after {}s (center={}, left={}, right={})",
            args.max_secs, progress.center, progress.left, progress.right
        );
    }

    let artifacts = session.stop_recording().await.context("stopping recording")?;
    let form = SubmissionForm::new(
        artifacts,
        ApplicantFields {
            national_code: args.national_code,
            birth_date: args.birth_date,
            mobile: args.mobile,
        },
    );

    let manifest = write_bundle(&form, &args.output)
        .with_context(|| format!("writing bundle to {}", args.output.display()))?;
    for entry in &manifest.files {
        println!("{:<18} {:<20} {:>10} bytes", entry.field, entry.file_name, entry.size);
    }
    println!("Submission bundle written to {}", args.output.display());

    Ok(())
}
