use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcript_api::cli::{Cli, Commands};
use yt_transcript_api::config::{Config, LogFormat};
use yt_transcript_api::extractors::{TranscriptSource, YtDlpGateway};
use yt_transcript_api::server::{self, AppState};
use yt_transcript_api::utils::{format_file_size, is_valid_language, is_youtube_url};
use yt_transcript_api::{output, ScratchDir, TranscriptError};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match (&cli.command, cli.config.as_deref()) {
        // `config` may initialise a file that does not exist yet
        (Commands::Config { show: false }, Some(path)) if !path.exists() => Config::default(),
        (_, explicit) => Config::load(explicit)?,
    };

    init_tracing(config.logging.format, cli.verbose);

    let scratch = Arc::new(ScratchDir::new(
        config.scratch_dir(),
        config.scratch.max_age_hours,
    ));
    let gateway = Arc::new(YtDlpGateway::new(
        config.tool.yt_dlp_path.clone(),
        scratch.clone(),
    ));

    match cli.command {
        Commands::Serve { host, port } => {
            if !gateway.check_available().await {
                tracing::warn!(
                    "{} is not callable; transcript requests will fail until it is installed",
                    gateway.program()
                );
            }

            scratch.ensure()?;
            let report = scratch.purge_stale().await?;
            tracing::info!(
                "Start-up sweep removed {} stale entries from {}",
                report.removed.len(),
                scratch.root().display()
            );

            if let Some(minutes) = config.scratch.sweep_interval_minutes {
                scratch
                    .clone()
                    .spawn_sweeper(Duration::from_secs(minutes.saturating_mul(60)));
            }

            let addr = format!(
                "{}:{}",
                host.unwrap_or_else(|| config.server.host.clone()),
                port.unwrap_or(config.server.port)
            );
            let state = AppState::new(gateway, &config.tool.default_language);

            server::serve(&addr, state).await?;
        }
        Commands::Extract {
            url,
            lang,
            format,
            output,
        } => {
            let lang = request_language(lang, &config)?;
            if !is_youtube_url(&url) {
                return Err(TranscriptError::InvalidUrl(url).into());
            }

            let progress = spinner(cli.quiet, "Extracting captions with yt-dlp...");
            let result = gateway.extract_captions(&url, &lang).await;
            finish(progress, "Extraction complete");
            let result = result?;

            tracing::info!(
                "Extracted {} segments for {}",
                result.total_segments,
                result.video_id
            );

            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &format).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, &format)?;
                }
            }
        }
        Commands::Download { url, lang, format } => {
            let lang = request_language(lang, &config)?;
            if !is_youtube_url(&url) {
                return Err(TranscriptError::InvalidUrl(url).into());
            }

            let progress = spinner(cli.quiet, "Downloading captions with yt-dlp...");
            let download = gateway.download_captions(&url, &lang, format).await;
            finish(progress, "Download complete");
            let download = download?;

            println!(
                "Captions saved to: {} ({})",
                download.file_path.display(),
                format_file_size(download.file_size)
            );
            println!(
                "Files older than {}h are removed by the scratch sweep",
                config.scratch.max_age_hours
            );
        }
        Commands::Info { video_id, rich } => {
            if rich {
                let metadata = gateway.fetch_rich_metadata(&video_id).await?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?
                );
            } else {
                let info = gateway.fetch_basic_info(&video_id).await?;
                println!("Title:       {}", info.title);
                println!("Duration:    {}", info.duration);
                println!("Uploader:    {}", info.uploader);
                println!("Upload date: {}", info.upload_date);
                println!("URL:         {}", info.url);
            }
        }
        Commands::Cleanup { max_age_hours, dir } => {
            let scratch = ScratchDir::new(
                dir.unwrap_or_else(|| config.scratch_dir()),
                max_age_hours.unwrap_or(config.scratch.max_age_hours),
            );

            let report = scratch.purge_stale().await?;
            println!(
                "Removed {} stale entries from {}",
                report.removed.len(),
                scratch.root().display()
            );
            if report.failed > 0 {
                eprintln!("⚠️  {} entries could not be removed", report.failed);
            }
        }
        Commands::Check => match gateway.version().await {
            Some(version) => println!("{} {} is available", gateway.program(), version),
            None => return Err(TranscriptError::ToolUnavailable.into()),
        },
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                if path.exists() {
                    println!("Configuration already exists at: {}", path.display());
                } else {
                    config.save(&path)?;
                    println!("Default configuration written to: {}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default_filter = if verbose {
        "yt_transcript_api=debug,tower_http=debug"
    } else {
        "yt_transcript_api=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn request_language(lang: Option<String>, config: &Config) -> Result<String> {
    let lang = lang.unwrap_or_else(|| config.tool.default_language.clone());
    if !is_valid_language(&lang) {
        return Err(
            TranscriptError::InvalidRequest(format!("'{lang}' is not a valid language code")).into(),
        );
    }
    Ok(lang)
}

fn spinner(quiet: bool, message: &'static str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    Some(progress)
}

fn finish(progress: Option<ProgressBar>, message: &'static str) {
    if let Some(progress) = progress {
        progress.finish_with_message(message);
    }
}
