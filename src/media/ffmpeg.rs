use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use super::{AudioCodec, MediaEngine, ProbeInfo, TrimRange};

/// Media engine backed by ffmpeg/ffprobe subprocesses
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    /// Pass subprocess stderr through instead of discarding it
    pub verbose: bool,
}

impl FfmpegEngine {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn run_ffmpeg(&self, args: &[&str]) -> Result<()> {
        debug!("ffmpeg {}", args.join(" "));
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y").args(args).stdout(Stdio::null());
        if !self.verbose {
            cmd.stderr(Stdio::null());
        }

        let status = cmd.status().context("failed to spawn ffmpeg")?;
        if !status.success() {
            bail!("ffmpeg exited with {} (args: {})", status, args.join(" "));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
}

impl MediaEngine for FfmpegEngine {
    fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        let output = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .context("failed to spawn ffprobe")?;
        if !output.status.success() {
            bail!("ffprobe failed for {}", path.display());
        }

        let probed: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("unparseable ffprobe output for {}", path.display()))?;

        let duration_secs: f64 = probed
            .format
            .duration
            .as_deref()
            .unwrap_or("0")
            .parse()
            .with_context(|| format!("unparseable duration for {}", path.display()))?;

        let codec = probed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
            .and_then(|s| s.codec_name.clone())
            .unwrap_or_default();

        Ok(ProbeInfo {
            duration_ms: (duration_secs * 1000.0) as u64,
            codec,
            tags: probed.format.tags,
        })
    }

    fn transcode(
        &self,
        src: &Path,
        dest: &Path,
        codec: AudioCodec,
        trim: Option<TrimRange>,
    ) -> Result<()> {
        let src = src.to_string_lossy();
        let dest = dest.to_string_lossy();
        let mut args = vec!["-i", src.as_ref()];

        let (start, end);
        if let Some(range) = trim {
            start = format!("{:.6}", range.start_secs);
            end = format!("{:.6}", range.end_secs);
            args.extend(["-ss", &start, "-to", &end]);
        }

        args.extend(["-c:a", codec.as_arg(), "-vn"]);
        if dest.ends_with(".m4a") || dest.ends_with(".mp4") || dest.ends_with(".m4b") {
            args.extend(["-f", "mp4"]);
        }
        args.push(dest.as_ref());
        self.run_ffmpeg(&args)
    }

    fn concat_tracks(&self, list_file: &Path, dest: &Path) -> Result<()> {
        let list = list_file.to_string_lossy();
        let dest = dest.to_string_lossy();
        self.run_ffmpeg(&[
            "-f", "concat", "-safe", "0", "-i", list.as_ref(),
            "-codec", "copy", "-vn", "-f", "mp4", dest.as_ref(),
        ])
    }

    fn bind_metadata(&self, metadata_file: &Path, input: &Path, output: &Path) -> Result<()> {
        let meta = metadata_file.to_string_lossy();
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.run_ffmpeg(&[
            "-i", input.as_ref(), "-i", meta.as_ref(),
            "-map_metadata", "1", "-codec", "copy", "-f", "mp4", output.as_ref(),
        ])
    }

    fn bind_chapters(&self, chapters_file: &Path, input: &Path, output: &Path) -> Result<()> {
        let chapters = chapters_file.to_string_lossy();
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.run_ffmpeg(&[
            "-i", input.as_ref(), "-i", chapters.as_ref(),
            "-map_chapters", "1", "-codec", "copy", "-f", "mp4", output.as_ref(),
        ])
    }

    fn extract_metadata(&self, input: &Path, output: &Path) -> Result<()> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.run_ffmpeg(&["-i", input.as_ref(), "-f", "ffmetadata", output.as_ref()])
    }

    fn embed_cover(&self, input: &Path, cover: &Path, output: &Path) -> Result<()> {
        let input = input.to_string_lossy();
        let cover = cover.to_string_lossy();
        let output = output.to_string_lossy();
        self.run_ffmpeg(&[
            "-i", input.as_ref(), "-i", cover.as_ref(),
            "-map", "0", "-map", "1",
            "-c", "copy", "-disposition:v:0", "attached_pic", "-f", "mp4", output.as_ref(),
        ])
    }

    fn split_segments(&self, src: &Path, out_pattern: &Path, segment_secs: u64) -> Result<()> {
        let src = src.to_string_lossy();
        let out = out_pattern.to_string_lossy();
        let segment_time = segment_secs.to_string();
        self.run_ffmpeg(&[
            "-i", src.as_ref(),
            "-f", "segment", "-segment_time", &segment_time,
            "-c", "copy", "-reset_timestamps", "1", out.as_ref(),
        ])
    }

    fn silence_scan(&self, src: &Path, floor_db: i32, min_silence_secs: f64) -> Result<String> {
        let filter = format!("silencedetect=noise={}dB:d={}", floor_db, min_silence_secs);
        debug!("ffmpeg silence scan: {}", filter);
        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(src)
            .args(["-af", &filter, "-f", "null", "-"])
            .output()
            .context("failed to spawn ffmpeg")?;
        if !output.status.success() {
            bail!("ffmpeg silence scan failed for {}", src.display());
        }

        // silencedetect reports on stderr
        Ok(format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ))
    }
}
