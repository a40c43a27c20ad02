mod ffmpeg;

pub use ffmpeg::FfmpegEngine;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

/// Probed facts about one media file
#[derive(Debug, Clone, Default)]
pub struct ProbeInfo {
    pub duration_ms: u64,
    /// Primary audio codec name (e.g. "aac", "mp3")
    pub codec: String,
    /// Container-level tags as a flat string map
    pub tags: HashMap<String, String>,
}

impl ProbeInfo {
    /// Case-insensitive tag lookup; probing tools are inconsistent about
    /// tag key casing across container formats
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Target codec handling for a transcode invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// Re-encode to aac
    Aac,
    /// Stream copy without re-encoding
    Copy,
}

impl AudioCodec {
    pub fn as_arg(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Copy => "copy",
        }
    }
}

/// Time range, in seconds, to trim a transcode invocation to
#[derive(Debug, Clone, Copy)]
pub struct TrimRange {
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Boundary to the external media-processing engine. The core only hands
/// over file paths and tuning arguments and receives success/failure plus
/// probed facts; everything inside the container is the engine's problem.
pub trait MediaEngine: Sync {
    /// Probe a file for its duration, primary audio codec and tags
    fn probe(&self, path: &Path) -> Result<ProbeInfo>;

    /// Convert one source file into an mp4-contained audio file
    fn transcode(
        &self,
        src: &Path,
        dest: &Path,
        codec: AudioCodec,
        trim: Option<TrimRange>,
    ) -> Result<()>;

    /// Concatenate the files named in a track-list file into one container,
    /// stream-copying the audio
    fn concat_tracks(&self, list_file: &Path, dest: &Path) -> Result<()>;

    /// Bind an ffmetadata file's global metadata and chapters onto input
    fn bind_metadata(&self, metadata_file: &Path, input: &Path, output: &Path) -> Result<()>;

    /// Map only the chapter records from an ffmetadata file onto input
    fn bind_chapters(&self, chapters_file: &Path, input: &Path, output: &Path) -> Result<()>;

    /// Extract embedded metadata/chapters into an ffmetadata file
    fn extract_metadata(&self, input: &Path, output: &Path) -> Result<()>;

    /// Attach a cover image to the container
    fn embed_cover(&self, input: &Path, cover: &Path, output: &Path) -> Result<()>;

    /// Split a file into fixed-duration segments named by out_pattern
    fn split_segments(&self, src: &Path, out_pattern: &Path, segment_secs: u64) -> Result<()>;

    /// Run a silence scan, returning the engine's raw diagnostic output
    fn silence_scan(&self, src: &Path, floor_db: i32, min_silence_secs: f64) -> Result<String>;
}
