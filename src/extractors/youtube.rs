use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{
    CommandRunner, DownloadedCaptions, SubtitleFormat, SystemRunner, ToolOutput,
    TranscriptResult, TranscriptSource, VideoInfo, VideoMetadata,
};
use crate::captions::vtt;
use crate::storage::ScratchDir;
use crate::utils::{extract_video_id, is_valid_video_id};
use crate::{Result, TranscriptError};

pub const YT_DLP: &str = "yt-dlp";

/// Fields printed for basic info, one `--print` each so every value lands on its own line
const BASIC_INFO_TEMPLATES: [&str; 4] = [
    "%(title)s",
    "%(duration)s",
    "%(uploader)s",
    "%(upload_date)s",
];

const UNTITLED: &str = "Untitled";
const UNKNOWN: &str = "Unknown";

/// Caption gateway backed by the yt-dlp command line tool
pub struct YtDlpGateway {
    program: String,
    runner: Arc<dyn CommandRunner>,
    scratch: Arc<ScratchDir>,
}

impl YtDlpGateway {
    pub fn new(program: impl Into<String>, scratch: Arc<ScratchDir>) -> Self {
        Self::with_runner(program, scratch, Arc::new(SystemRunner))
    }

    pub fn with_runner(
        program: impl Into<String>,
        scratch: Arc<ScratchDir>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            runner,
            scratch,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The version string yt-dlp reports, if it can be called
    pub async fn version(&self) -> Option<String> {
        match self.runner.run(&self.program, vec!["--version".into()]).await {
            Ok(output) if output.success => Some(output.stdout.trim().to_string()),
            _ => None,
        }
    }

    async fn ensure_available(&self) -> Result<()> {
        if self.check_available().await {
            Ok(())
        } else {
            Err(TranscriptError::ToolUnavailable.into())
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<ToolOutput> {
        let output = self
            .runner
            .run(&self.program, args)
            .await
            .map_err(|e| TranscriptError::ToolInvocationFailure(e.to_string()))?;
        Ok(output)
    }

    async fn dump_json(&self, video_id: &str) -> Result<VideoMetadata> {
        let output = self
            .run(vec![
                "--dump-json".into(),
                "--no-playlist".into(),
                "--skip-download".into(),
                "--".into(),
                watch_url(video_id),
            ])
            .await?;

        if !output.success {
            return Err(TranscriptError::MetadataParseFailure(last_error_line(&output.stderr)).into());
        }

        VideoMetadata::from_json(video_id, &output.stdout)
    }

    /// Ask yt-dlp for the auto-captions of `url` and locate the file it wrote in `dir`
    async fn fetch_captions(
        &self,
        url: &str,
        lang: &str,
        video_id: &str,
        dir: &Path,
        format: SubtitleFormat,
    ) -> Result<PathBuf> {
        let template = dir.join(format!("{video_id}.{lang}"));
        let mut args: Vec<String> = vec![
            "--write-auto-sub".into(),
            "--sub-lang".into(),
            lang.into(),
            "--sub-format".into(),
            "vtt".into(),
            "--skip-download".into(),
            "--no-playlist".into(),
            "--output".into(),
            template.to_string_lossy().into_owned(),
        ];
        if format.needs_conversion() {
            args.push("--convert-subs".into());
            args.push(format.as_str().into());
        }
        args.push("--".into());
        args.push(url.into());

        tracing::info!("Requesting {} captions for {} as {}", lang, video_id, format);
        let output = self.run(args).await?;

        match find_subtitle_file(dir, video_id, lang, format.extension()).await? {
            Some(path) => {
                if !output.success {
                    tracing::warn!(
                        "yt-dlp reported an error but produced {}: {}",
                        path.display(),
                        last_error_line(&output.stderr)
                    );
                }
                Ok(path)
            }
            None if !output.success => {
                Err(TranscriptError::ToolInvocationFailure(last_error_line(&output.stderr)).into())
            }
            None => Err(TranscriptError::CaptionsNotFound {
                video_id: video_id.to_string(),
                lang: lang.to_string(),
            }
            .into()),
        }
    }
}

#[async_trait]
impl TranscriptSource for YtDlpGateway {
    async fn check_available(&self) -> bool {
        self.version().await.is_some()
    }

    async fn fetch_basic_info(&self, video_id: &str) -> Result<VideoInfo> {
        self.ensure_available().await?;

        if !is_valid_video_id(video_id) {
            return Err(TranscriptError::InvalidUrl(format!("invalid video ID '{video_id}'")).into());
        }

        let url = watch_url(video_id);
        let mut args = Vec::new();
        for template in BASIC_INFO_TEMPLATES {
            args.push("--print".to_string());
            args.push(template.to_string());
        }
        args.extend(["--skip-download", "--no-playlist", "--"].map(String::from));
        args.push(url.clone());

        let output = self.run(args).await?;
        if !output.success {
            return Err(TranscriptError::ToolInvocationFailure(last_error_line(&output.stderr)).into());
        }

        let mut lines = output.stdout.lines();
        Ok(VideoInfo {
            video_id: video_id.to_string(),
            title: field_or(lines.next(), UNTITLED),
            duration: field_or(lines.next(), UNKNOWN),
            uploader: field_or(lines.next(), UNKNOWN),
            upload_date: field_or(lines.next(), UNKNOWN),
            url,
        })
    }

    async fn fetch_rich_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        self.ensure_available().await?;

        match self.dump_json(video_id).await {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                tracing::warn!(
                    "Rich metadata unavailable for {}, falling back to basic info: {:#}",
                    video_id,
                    e
                );
                let info = self
                    .fetch_basic_info(video_id)
                    .await
                    .context("Basic info fallback failed")?;
                Ok(VideoMetadata::from_basic(&info))
            }
        }
    }

    async fn extract_captions(&self, url: &str, lang: &str) -> Result<TranscriptResult> {
        self.ensure_available().await?;
        let video_id = resolve_video_id(url)?;

        let workdir = self.scratch.request_dir(&video_id, lang)?;
        let file = self
            .fetch_captions(url, lang, &video_id, workdir.path(), SubtitleFormat::Vtt)
            .await?;

        let bytes = tokio::fs::read(&file)
            .await
            .with_context(|| format!("Failed to read subtitle file {}", file.display()))?;
        let raw_content = String::from_utf8_lossy(&bytes).into_owned();

        if let Err(e) = tokio::fs::remove_file(&file).await {
            tracing::warn!("Failed to remove {}: {}", file.display(), e);
        }
        if let Err(e) = workdir.close() {
            tracing::warn!("Failed to remove request directory: {}", e);
        }

        let segments = vtt::parse(&raw_content);
        tracing::info!("Parsed {} caption segments for {}", segments.len(), video_id);

        let source = match self.fetch_rich_metadata(&video_id).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!("Returning transcript without metadata: {:#}", e);
                None
            }
        };

        Ok(TranscriptResult {
            video_id,
            language: lang.to_string(),
            total_segments: segments.len(),
            segments,
            raw_content,
            source,
        })
    }

    async fn download_captions(
        &self,
        url: &str,
        lang: &str,
        format: SubtitleFormat,
    ) -> Result<DownloadedCaptions> {
        self.ensure_available().await?;
        let video_id = resolve_video_id(url)?;

        let dir = self.scratch.persistent_dir(&video_id, lang)?;
        let file = match self.fetch_captions(url, lang, &video_id, &dir, format).await {
            Ok(file) => file,
            Err(e) => {
                // Failed downloads leave no directory behind.
                if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                    tracing::warn!("Failed to remove {}: {}", dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        let file_size = tokio::fs::metadata(&file)
            .await
            .with_context(|| format!("Failed to stat {}", file.display()))?
            .len();
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::info!("Downloaded {} ({} bytes)", file.display(), file_size);

        Ok(DownloadedCaptions {
            video_id,
            language: lang.to_string(),
            format,
            file_name,
            file_path: file,
            file_size,
            downloaded_at: Utc::now(),
        })
    }
}

fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

fn resolve_video_id(url: &str) -> Result<String> {
    extract_video_id(url).ok_or_else(|| TranscriptError::InvalidUrl(url.to_string()).into())
}

/// yt-dlp prints `NA` for fields it does not know
fn field_or(value: Option<&str>, placeholder: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && v != "NA" => v.to_string(),
        _ => placeholder.to_string(),
    }
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("exited with a non-zero status")
        .to_string()
}

async fn find_subtitle_file(
    dir: &Path,
    video_id: &str,
    lang: &str,
    extension: &str,
) -> Result<Option<PathBuf>> {
    let suffix = format!(".{extension}");
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read {}", dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(video_id) && name.contains(lang) && name.ends_with(&suffix) {
            return Ok(Some(entry.path()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::command::MockCommandRunner;
    use std::io;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    const VTT: &str = "WEBVTT\nKind: captions\nLanguage: es\n\n\
00:00:00.000 --> 00:00:02.000 align:start position:0%\n\
hola<00:00:01.000><c> a todos</c>\n\n\
00:00:02.000 --> 00:00:04.000\n\
esto es una prueba\n";

    const JSON: &str = r#"{"id":"dQw4w9WgXcQ","title":"Rich title","channel":"Channel","duration":212,"view_count":42}"#;

    /// Canned yt-dlp behaviour for one test
    #[derive(Clone, Copy)]
    struct FakeTool {
        installed: bool,
        captions: Option<&'static [u8]>,
        json: Option<&'static str>,
        basic: Option<&'static str>,
    }

    impl Default for FakeTool {
        fn default() -> Self {
            Self {
                installed: true,
                captions: Some(VTT.as_bytes()),
                json: Some(JSON),
                basic: Some("Basic title\n125\nUploader\n20230615\n"),
            }
        }
    }

    fn option_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    impl FakeTool {
        fn runner(self) -> MockCommandRunner {
            let mut runner = MockCommandRunner::new();
            runner
                .expect_run()
                .returning(move |_program: &str, args: Vec<String>| {
                    let has = |flag: &str| args.iter().any(|a| a == flag);

                    if has("--version") {
                        return if self.installed {
                            Ok(ToolOutput::ok("2024.08.06\n"))
                        } else {
                            Err(io::Error::from(io::ErrorKind::NotFound))
                        };
                    }
                    if has("--dump-json") {
                        return Ok(self
                            .json
                            .map(ToolOutput::ok)
                            .unwrap_or_else(|| ToolOutput::failed("ERROR: Sign in to confirm")));
                    }
                    if has("--print") {
                        return Ok(self
                            .basic
                            .map(ToolOutput::ok)
                            .unwrap_or_else(|| ToolOutput::failed("ERROR: Video unavailable")));
                    }
                    if has("--write-auto-sub") {
                        if let Some(content) = self.captions {
                            let template = option_value(&args, "--output").unwrap();
                            let ext = option_value(&args, "--convert-subs").unwrap_or("vtt");
                            std::fs::write(format!("{template}.{ext}"), content).unwrap();
                        }
                        return Ok(ToolOutput::ok(""));
                    }
                    Ok(ToolOutput::failed("unexpected invocation"))
                });
            runner
        }
    }

    fn gateway(tool: FakeTool) -> (tempfile::TempDir, YtDlpGateway) {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = Arc::new(ScratchDir::new(tmp.path(), 24));
        let gateway = YtDlpGateway::with_runner(YT_DLP, scratch, Arc::new(tool.runner()));
        (tmp, gateway)
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    fn error_of(err: &anyhow::Error) -> &TranscriptError {
        err.downcast_ref::<TranscriptError>().expect("domain error")
    }

    #[tokio::test]
    async fn test_extract_parses_and_deletes_file() {
        let (tmp, gateway) = gateway(FakeTool::default());

        let result = tokio_test::assert_ok!(gateway.extract_captions(URL, "es").await);

        assert_eq!(result.video_id, "dQw4w9WgXcQ");
        assert_eq!(result.language, "es");
        assert_eq!(result.total_segments, 2);
        assert_eq!(result.segments[0].text, "hola a todos");
        assert_eq!(result.segments[0].end_time, "00:00:02.000");
        assert_eq!(result.raw_content, VTT);
        assert_eq!(result.source.unwrap().title, "Rich title");
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_extract_falls_back_to_basic_info() {
        let (_tmp, gateway) = gateway(FakeTool {
            json: None,
            ..FakeTool::default()
        });

        let result = gateway.extract_captions(URL, "es").await.unwrap();
        let source = result.source.unwrap();

        assert_eq!(source.title, "Basic title");
        assert_eq!(source.duration_formatted, "02:05");
        assert_eq!(source.view_count, 0);
        assert!(source.thumbnail_url.contains("dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_extract_deletes_file_when_metadata_fails() {
        let (tmp, gateway) = gateway(FakeTool {
            json: None,
            basic: None,
            ..FakeTool::default()
        });

        let result = gateway.extract_captions(URL, "es").await.unwrap();

        assert!(result.source.is_none());
        assert_eq!(result.total_segments, 2);
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_extract_tolerates_invalid_utf8() {
        let (tmp, gateway) = gateway(FakeTool {
            captions: Some(&b"WEBVTT\n\n00:00:00.000 --> 00:00:01.000\ncaf\xe9 con leche\n"[..]),
            ..FakeTool::default()
        });

        let result = tokio_test::assert_ok!(gateway.extract_captions(URL, "es").await);

        assert_eq!(result.total_segments, 1);
        assert_eq!(result.segments[0].text, "caf\u{FFFD} con leche");
        assert!(result.raw_content.contains('\u{FFFD}'));
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_extract_without_captions() {
        let (tmp, gateway) = gateway(FakeTool {
            captions: None,
            ..FakeTool::default()
        });

        let err = tokio_test::assert_err!(gateway.extract_captions(URL, "fr").await);

        assert!(matches!(
            error_of(&err),
            TranscriptError::CaptionsNotFound { lang, .. } if lang == "fr"
        ));
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_url() {
        let (_tmp, gateway) = gateway(FakeTool::default());

        let err = gateway
            .extract_captions("https://vimeo.com/123", "es")
            .await
            .unwrap_err();

        assert!(matches!(error_of(&err), TranscriptError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_every_operation_requires_the_tool() {
        let (_tmp, gateway) = gateway(FakeTool {
            installed: false,
            ..FakeTool::default()
        });

        assert!(!gateway.check_available().await);

        let errors = [
            gateway.extract_captions(URL, "es").await.unwrap_err(),
            gateway
                .download_captions(URL, "es", SubtitleFormat::Vtt)
                .await
                .unwrap_err(),
            gateway.fetch_basic_info("dQw4w9WgXcQ").await.unwrap_err(),
            gateway.fetch_rich_metadata("dQw4w9WgXcQ").await.unwrap_err(),
        ];
        for err in &errors {
            assert!(matches!(error_of(err), TranscriptError::ToolUnavailable));
        }
    }

    #[tokio::test]
    async fn test_download_keeps_converted_file() {
        let (tmp, gateway) = gateway(FakeTool::default());

        let download = gateway
            .download_captions(URL, "en", SubtitleFormat::Srt)
            .await
            .unwrap();

        assert_eq!(download.file_name, "dQw4w9WgXcQ.en.srt");
        assert_eq!(download.file_size, VTT.len() as u64);
        assert_eq!(download.format, SubtitleFormat::Srt);
        assert!(download.file_path.starts_with(tmp.path()));
        assert!(download.file_path.exists());
    }

    #[tokio::test]
    async fn test_download_failure_leaves_no_directory() {
        let (tmp, gateway) = gateway(FakeTool {
            captions: None,
            ..FakeTool::default()
        });

        let err = gateway
            .download_captions(URL, "en", SubtitleFormat::Vtt)
            .await
            .unwrap_err();

        assert!(matches!(error_of(&err), TranscriptError::CaptionsNotFound { .. }));
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_basic_info_placeholders() {
        let (_tmp, gateway) = gateway(FakeTool {
            basic: Some("Title | with pipe\nNA\n\n20230615\n"),
            ..FakeTool::default()
        });

        let info = gateway.fetch_basic_info("dQw4w9WgXcQ").await.unwrap();

        assert_eq!(info.title, "Title | with pipe");
        assert_eq!(info.duration, "Unknown");
        assert_eq!(info.uploader, "Unknown");
        assert_eq!(info.upload_date, "20230615");
        assert_eq!(info.url, URL);
    }

    #[tokio::test]
    async fn test_basic_info_rejects_malformed_id() {
        let (_tmp, gateway) = gateway(FakeTool::default());

        let err = gateway.fetch_basic_info("--exec rm").await.unwrap_err();

        assert!(matches!(error_of(&err), TranscriptError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_version() {
        let (_tmp, gateway) = gateway(FakeTool::default());

        assert_eq!(gateway.version().await.as_deref(), Some("2024.08.06"));
    }

    #[test]
    fn test_last_error_line() {
        assert_eq!(
            last_error_line("WARNING: x\nERROR: [youtube] abc: Video unavailable\n\n"),
            "ERROR: [youtube] abc: Video unavailable"
        );
        assert_eq!(last_error_line(""), "exited with a non-zero status");
    }
}
