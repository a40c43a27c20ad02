use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::book::Book;
use crate::config::{is_audio_file, M4B_EXT};
use crate::meta::MetaTemplate;
use crate::pattern;

/// Cooperative early-shutdown flag shared with the transcode pipeline. The
/// dispatcher stops submitting new jobs once set; in-flight engine calls
/// run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Validated inputs for one conversion job, merged from config file,
/// environment and CLI flags
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    pub source_files_path: PathBuf,
    pub path_pattern: String,
    pub output_file_pattern: String,
    pub output_path_pattern: String,
    pub scratch_files_path: Option<PathBuf>,
    pub jobs: usize,
    pub verbose_transcode: bool,
    pub external_chapters: bool,
}

/// Per-job state: the scratch directory and the files inside it, the
/// discovered source corpus, and the rendered output placement.
///
/// The scratch directory is owned as a TempDir so it is released when the
/// context is dropped, including on early termination paths.
pub struct JobContext {
    pub jobs: usize,
    pub path_pattern: String,
    pub output_file_pattern: String,
    pub output_path_pattern: String,
    pub source_files_path: PathBuf,
    pub verbose_transcode: bool,
    pub external_chapters: bool,
    /// Rendered output directory
    pub output_path: PathBuf,
    /// Rendered output filename
    pub output_file: String,
    /// Immutable metadata template used when compiling the chapters file
    pub template: MetaTemplate,

    scratch: TempDir,
    tracks_file: File,
    source_files: Vec<PathBuf>,
    transcode_files: Vec<PathBuf>,
    cover_image: Option<PathBuf>,
    description_file: Option<PathBuf>,
    cancel: CancelToken,
}

impl JobContext {
    /// Provision scratch space and discover source files
    pub fn new(opts: JobOptions) -> Result<Self> {
        let scratch_parent = opts
            .scratch_files_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        let scratch = tempfile::Builder::new()
            .prefix("scratch-dir")
            .tempdir_in(&scratch_parent)
            .with_context(|| format!("failed to create scratch dir in {:?}", scratch_parent))?;

        let tracks_file = File::create(scratch.path().join("tracks.txt"))
            .context("failed to create tracks list file")?;
        File::create(scratch.path().join("chapters.ini"))
            .context("failed to create chapters file")?;

        // transcode destinations and split segments live in separate
        // subdirectories; a segment adopted as a source must never share a
        // path with its own transcode destination
        std::fs::create_dir(scratch.path().join("out"))
            .context("failed to create transcode output dir")?;
        std::fs::create_dir(scratch.path().join("split"))
            .context("failed to create split segment dir")?;

        let mut job = Self {
            jobs: opts.jobs.max(1),
            path_pattern: opts.path_pattern,
            output_file_pattern: opts.output_file_pattern,
            output_path_pattern: opts.output_path_pattern,
            source_files_path: opts.source_files_path,
            verbose_transcode: opts.verbose_transcode,
            external_chapters: opts.external_chapters,
            output_path: PathBuf::new(),
            output_file: format!("book.{}", M4B_EXT),
            template: MetaTemplate::new(),
            scratch,
            tracks_file,
            source_files: Vec::new(),
            transcode_files: Vec::new(),
            cover_image: None,
            description_file: None,
            cancel: CancelToken::default(),
        };
        job.gather_source_files()?;

        Ok(job)
    }

    /// Scan the source path for valid audio files plus any cover image and
    /// description file living alongside them
    fn gather_source_files(&mut self) -> Result<()> {
        for entry in WalkDir::new(&self.source_files_path) {
            let entry = entry.with_context(|| {
                format!(
                    "error walking source file path {}",
                    self.source_files_path.display()
                )
            })?;
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            if is_audio_file(path) {
                debug!("{} is valid, adding to list", path.display());
                self.source_files.push(path.to_path_buf());
            } else {
                warn!("{} has an unsupported extension", path.display());
            }

            let base = entry.file_name().to_string_lossy();
            match base.as_ref() {
                "cover.jpg" | "cover.png" | "folder.jpg" | "folder.png" => {
                    self.cover_image = Some(path.to_path_buf());
                }
                "description.txt" | "comment.txt" => {
                    debug!("{} description file found", path.display());
                    self.description_file = Some(path.to_path_buf());
                }
                _ => {}
            }
        }

        // deterministic track order regardless of directory iteration order
        self.source_files.sort();

        Ok(())
    }

    /// Render output placement from the configured patterns. Author and
    /// title are mandatory for any output naming.
    pub fn set_output_filename(&mut self, book: &Book) -> Result<()> {
        if book.author.is_empty() || book.title.is_empty() {
            bail!("both author and title must be set to render output naming");
        }

        self.output_path =
            PathBuf::from(pattern::render_output_path(book, &self.output_path_pattern)?);
        self.output_file = pattern::render_output_filename(book, &self.output_file_pattern);

        Ok(())
    }

    /// Append one destination track to the persistent concat list consumed
    /// by the combine step
    pub fn add_to_track_list(&mut self, path: &Path) -> Result<()> {
        writeln!(self.tracks_file, "file '{}'", path.display())
            .context("failed to append to tracks list file")?;
        Ok(())
    }

    /// Resolve a source argument that may be a file or a directory holding
    /// exactly one audio file
    pub fn check_for_source_file(&self, path: &Path) -> Result<PathBuf> {
        let info = std::fs::metadata(path)
            .with_context(|| format!("source file is not valid: {}", path.display()))?;
        if info.is_file() {
            return Ok(path.to_path_buf());
        }

        let mut audio_files: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && is_audio_file(p))
            .collect();

        match audio_files.len() {
            1 => Ok(audio_files.remove(0)),
            0 => bail!("no audio files found in {}", path.display()),
            _ => {
                audio_files.sort();
                bail!(
                    "expected exactly one audio file in {}, found {}",
                    path.display(),
                    audio_files.len()
                )
            }
        }
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Directory holding transcode destinations
    pub fn transcode_out_dir(&self) -> PathBuf {
        self.scratch.path().join("out")
    }

    /// Directory holding pre-split segments
    pub fn split_dir(&self) -> PathBuf {
        self.scratch.path().join("split")
    }

    pub fn tracks_path(&self) -> PathBuf {
        self.scratch.path().join("tracks.txt")
    }

    pub fn chapters_path(&self) -> PathBuf {
        self.scratch.path().join("chapters.ini")
    }

    /// Combined-but-unbound output staging file
    pub fn pre_output_path(&self) -> PathBuf {
        self.scratch.path().join(format!("out.{}", M4B_EXT))
    }

    pub fn extracted_chapters_path(&self) -> PathBuf {
        self.scratch.path().join("extracted-chapters.ini")
    }

    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }

    /// Replace the source corpus, used after pre-splitting a single file
    pub fn set_source_files(&mut self, files: Vec<PathBuf>) {
        self.source_files = files;
    }

    pub fn transcode_files(&self) -> &[PathBuf] {
        &self.transcode_files
    }

    pub fn set_transcode_files(&mut self, files: Vec<PathBuf>) {
        self.transcode_files = files;
    }

    pub fn cover_image(&self) -> Option<&Path> {
        self.cover_image.as_deref()
    }

    pub fn description_file(&self) -> Option<&Path> {
        self.description_file.as_deref()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Explicitly release scratch space, surfacing removal errors. Dropping
    /// the context performs the same cleanup best-effort.
    pub fn cleanup(self) -> Result<()> {
        self.scratch.close().context("scratch cleanup errored")
    }
}
