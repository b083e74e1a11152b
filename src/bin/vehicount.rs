use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use vehicount::{
    AppConfig, AudioStripper, FfmpegLogLevel, FfmpegStripper, MediaProbe,
    NoticeLevel, OperationType, ProgressCallback, ProgressInfo, Session, SessionReport,
    UploadedVideo, VideoFetcher,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vehicount serve --backend-url http://localhost:5000\n  vehicount process traffic.mp4 --backend-url http://localhost:5000 --out result.html\n  vehicount strip-audio input.mp4 output.mp4\n  vehicount completions zsh > _vehicount";

#[derive(Debug, Parser)]
#[command(
    name = "vehicount",
    version,
    about = "Upload traffic videos for vehicle counting and play back the results",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web UI.
    #[command(
        about = "Run the web UI",
        after_help = "Examples:\n  vehicount serve --backend-url http://localhost:5000\n  vehicount serve --backend-url http://10.0.0.5:5000 --bind 0.0.0.0:8501 --timeout 120"
    )]
    Serve {
        /// Base URL of the vehicle-counting backend.
        #[arg(long)]
        backend_url: String,
        /// Address to listen on.
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Directory for downloaded and re-encoded videos.
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
        /// Largest accepted upload in MiB.
        #[arg(long, default_value_t = 200)]
        max_upload_mb: usize,
        /// Backend request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Run one video through the pipeline from the terminal.
    #[command(
        about = "Process a single video",
        after_help = "Examples:\n  vehicount process traffic.mp4 --backend-url http://localhost:5000\n  vehicount process traffic.avi --backend-url http://localhost:5000 --out result.html --json"
    )]
    Process {
        /// Local .mp4 or .avi file.
        input: PathBuf,
        /// Base URL of the vehicle-counting backend.
        #[arg(long)]
        backend_url: String,
        /// Directory for downloaded and re-encoded videos.
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
        /// Write the rendered result page to this file.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the result as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Re-encode a video without its audio track.
    #[command(
        about = "Remove audio from a video",
        after_help = "Examples:\n  vehicount strip-audio input.mp4 output.mp4"
    )]
    StripAudio {
        /// Input video.
        input: PathBuf,
        /// Output MP4 path.
        output: PathBuf,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        vehicount::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn build_config(
    backend_url: String,
    scratch_dir: Option<PathBuf>,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::new(backend_url)?;
    if let Some(dir) = scratch_dir {
        config = config.with_scratch_dir(dir);
    }
    Ok(config)
}

/// Drives an indicatif bar from pipeline progress.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let label = match info.operation {
            OperationType::Download => "downloading",
            OperationType::AudioStrip => "removing audio",
            _ => "working",
        };
        match info.percentage {
            Some(percentage) => self.bar.set_message(format!("{label} {percentage:.0}%")),
            None => self.bar.set_message(format!("{label} ({})", info.current)),
        }
    }
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_report(report: &SessionReport) {
    for notice in &report.notices {
        let line = match notice.level {
            NoticeLevel::Success => notice.message.green(),
            NoticeLevel::Info => notice.message.normal(),
            NoticeLevel::Warning => notice.message.yellow(),
            NoticeLevel::Error => notice.message.red().bold(),
        };
        println!("{line}");
    }

    if let Some(series) = &report.frequency {
        for window in series.windows() {
            println!("  {window}");
        }
    }
}

fn report_json(report: &SessionReport) -> serde_json::Value {
    json!({
        "count": report.vehicle_count,
        "frequency_data": report.frequency.as_ref().map(|series| series.buckets().to_vec()),
        "duration_seconds": report.duration.map(|duration| duration.as_secs_f64()),
        "download": report.download.as_ref().map(|link| link.path.display().to_string()),
        "notices": report.notices.iter().map(|notice| json!({
            "level": format!("{:?}", notice.level).to_lowercase(),
            "message": notice.message,
        })).collect::<Vec<_>>(),
    })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Serve {
            backend_url,
            bind,
            scratch_dir,
            max_upload_mb,
            timeout,
        } => {
            let mut config = build_config(backend_url, scratch_dir)?
                .with_max_upload_bytes(max_upload_mb.saturating_mul(1024 * 1024));
            if let Some(address) = bind {
                config = config.with_bind_address(address);
            }
            if let Some(seconds) = timeout {
                config = config.with_timeout(Duration::from_secs(seconds));
            }

            let session = Session::new(&config)?;
            println!(
                "{} http://{}",
                "serving".green().bold(),
                config.bind_address()
            );
            vehicount::server::serve(config, session).await?;
        }
        Commands::Process {
            input,
            backend_url,
            scratch_dir,
            out,
            json,
        } => {
            if let Some(path) = &out {
                ensure_writable_path(path, cli.global.overwrite)?;
            }

            let config = build_config(backend_url, scratch_dir)?;
            let file_name = input
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or(format!("invalid input path: {}", input.display()))?
                .to_string();
            let upload = UploadedVideo::new(file_name, fs::read(&input)?)?;

            let bar = spinner();
            bar.set_message(format!("uploading {}", upload.file_name()));
            let progress: Arc<dyn ProgressCallback> = Arc::new(TerminalProgress::new(bar.clone()));

            let session = Session::new(&config)?;
            let fetcher = VideoFetcher::new(session.backend().clone(), config.scratch_dir())
                .with_progress(progress.clone());
            let session = session
                .with_fetcher(fetcher)
                .with_stripper(Arc::new(FfmpegStripper::new().with_progress(progress)));

            let report = session.run(Some(upload)).await;
            bar.finish_and_clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
            } else {
                print_report(&report);
            }

            if let Some(path) = &out {
                let page = vehicount::render_page(&report)?;
                fs::write(path, page.as_str())?;
                if !json {
                    println!("{} {}", "saved".green().bold(), path.display());
                }
            }

            if report.has_errors() {
                return Err("processing failed".into());
            }
        }
        Commands::StripAudio { input, output } => {
            ensure_writable_path(&output, cli.global.overwrite)?;

            let bar = spinner();
            bar.set_message("removing audio");
            let stripper =
                FfmpegStripper::new().with_progress(Arc::new(TerminalProgress::new(bar.clone())));
            let (source, target) = (input.clone(), output.clone());
            let duration =
                tokio::task::spawn_blocking(move || stripper.strip(&source, &target)).await??;
            bar.finish_and_clear();

            println!(
                "{} {} ({:.2}s)",
                "saved".green().bold(),
                output.display(),
                duration.as_secs_f64()
            );
            let summary = MediaProbe::probe(&output)?;
            if let Some(video) = &summary.video {
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    video.width, video.height, video.frames_per_second, video.codec,
                );
            }
            println!("Audio streams: {}", summary.audio_streams);
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "vehicount", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
