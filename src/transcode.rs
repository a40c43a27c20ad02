use anyhow::{bail, Context, Result};
use crossbeam_channel::bounded;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::book::{write_sort_tags, Book};
use crate::job::{CancelToken, JobContext};
use crate::media::{AudioCodec, MediaEngine, TrimRange};
use crate::silence::MarkerPoint;

/// What the pipeline has to report beyond hard failure. Individual source
/// failures are skips, not errors; callers decide whether a partial book is
/// acceptable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscodeOutcome {
    pub skipped: usize,
}

struct WorkItem {
    src: PathBuf,
    dest: PathBuf,
    codec: AudioCodec,
    trim: Option<TrimRange>,
}

/// Fan work items out over the configured number of worker threads.
///
/// The submission channel holds one fewer slot than there are workers, so
/// the producer blocks while the pool is saturated. Submission stops at the
/// first cancellation check that trips; items already queued still run.
fn run_pool(
    engine: &dyn MediaEngine,
    workers: usize,
    cancel: &CancelToken,
    items: Vec<WorkItem>,
) -> usize {
    let skipped = AtomicUsize::new(0);
    let (tx, rx) = bounded::<WorkItem>(workers.saturating_sub(1));

    thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let skipped = &skipped;
            scope.spawn(move || {
                for item in rx.iter() {
                    debug!("transcoding {}", item.src.display());
                    if let Err(err) = engine.transcode(&item.src, &item.dest, item.codec, item.trim)
                    {
                        warn!("skipping {}: {:#}", item.src.display(), err);
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }

        for item in items {
            if cancel.is_cancelled() {
                info!("cancellation requested, no further files will be submitted");
                break;
            }
            if tx.send(item).is_err() {
                break;
            }
            // brief pause keeps submission from hammering a saturated pool
            thread::sleep(Duration::from_millis(10));
        }
        drop(tx);
    });

    skipped.into_inner()
}

/// Convert every discovered source file into an mp4 container in scratch
/// space.
///
/// Destinations are registered in the track list up front, in source order,
/// so the final concat order never depends on worker completion order. A
/// track-list write is fatal; a single file's transcode failure is not.
pub fn transcode_source_files(
    engine: &dyn MediaEngine,
    job: &mut JobContext,
) -> Result<TranscodeOutcome> {
    let sources: Vec<PathBuf> = job.source_files().to_vec();
    if sources.is_empty() {
        bail!("no source files to transcode");
    }

    let mut items = Vec::with_capacity(sources.len());
    let mut dests = Vec::with_capacity(sources.len());
    for src in sources {
        let stem = src
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "track".to_string());
        let dest = job.transcode_out_dir().join(format!("{}.m4a", stem));
        job.add_to_track_list(&dest)?;
        dests.push(dest.clone());
        items.push(WorkItem {
            src,
            dest,
            codec: AudioCodec::Aac,
            trim: None,
        });
    }

    let total = items.len();
    let cancel = job.cancel_token();
    let skipped = run_pool(engine, job.jobs, &cancel, items);
    if cancel.is_cancelled() {
        bail!("transcoding cancelled before completion");
    }
    if skipped == total {
        bail!("all {} source files failed to transcode", total);
    }
    if skipped > 0 {
        warn!("{} of {} source files were skipped", skipped, total);
    }

    job.set_transcode_files(dests);
    Ok(TranscodeOutcome { skipped })
}

/// Merge the transcoded tracks into the staging output. A single track
/// needs no concat pass and is moved into place directly.
pub fn combine(engine: &dyn MediaEngine, job: &JobContext) -> Result<()> {
    let pre_output = job.pre_output_path();
    if let [single] = job.transcode_files() {
        debug!("single track, skipping concat");
        move_file(single, &pre_output)?;
        return Ok(());
    }

    info!("combining {} tracks", job.transcode_files().len());
    engine.concat_tracks(&job.tracks_path(), &pre_output)
}

/// Bind metadata, chapters and artwork onto the staged output, then move
/// the finished book into its rendered output location
pub fn bind(engine: &dyn MediaEngine, job: &JobContext, book: &Book) -> Result<PathBuf> {
    let mut staged = job.scratch_path().join("bound.m4b");
    engine.bind_metadata(&job.chapters_path(), &job.pre_output_path(), &staged)?;

    if job.external_chapters {
        let next = job.scratch_path().join("chaptered.m4b");
        engine.bind_chapters(&job.extracted_chapters_path(), &staged, &next)?;
        staged = next;
    }

    if let Some(cover) = job.cover_image() {
        info!("embedding cover art from {}", cover.display());
        let next = job.scratch_path().join("covered.m4b");
        engine.embed_cover(&staged, cover, &next)?;
        staged = next;
    }

    fs::create_dir_all(&job.output_path)
        .with_context(|| format!("failed to create {}", job.output_path.display()))?;
    let final_path = job.output_path.join(&job.output_file);
    move_file(&staged, &final_path)?;

    if let Some(slug) = &book.sort_slug {
        let mut tag = mp4ameta::Tag::read_from_path(&final_path)
            .with_context(|| format!("error opening {} for sort tags", final_path.display()))?;
        write_sort_tags(&mut tag, slug);
        tag.write_to_path(&final_path)
            .with_context(|| format!("error writing sort tags to {}", final_path.display()))?;
    }

    info!("book written to {}", final_path.display());
    Ok(final_path)
}

/// Pick a pre-split segment length scaled to the source duration so a very
/// long book doesn't explode into hundreds of parts
pub fn segment_secs_for(duration_ms: u64) -> u64 {
    if duration_ms >= 2 * 60 * 60 * 1000 {
        7200
    } else if duration_ms < 10 * 60 * 1000 {
        300
    } else {
        600
    }
}

/// Split a single large source file into scratch-space segments and adopt
/// them as the job's source corpus
pub fn split_single_file(engine: &dyn MediaEngine, job: &mut JobContext, src: &Path) -> Result<()> {
    let info = engine.probe(src)?;
    let segment_secs = segment_secs_for(info.duration_ms);
    info!(
        "splitting {} into {}s segments",
        src.display(),
        segment_secs
    );

    let ext = src
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "m4a".to_string());
    let out_pattern = job.split_dir().join(format!("part-%03d.{}", ext));
    engine.split_segments(src, &out_pattern, segment_secs)?;

    let mut parts: Vec<PathBuf> = fs::read_dir(job.split_dir())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("part-"))
                .unwrap_or(false)
        })
        .collect();
    parts.sort();

    // the segmenter can emit a trailing sliver; anything under a second
    // carries no audible content
    let mut kept = Vec::with_capacity(parts.len());
    for part in parts {
        let part_info = engine.probe(&part)?;
        if part_info.duration_ms > 1000 {
            kept.push(part);
        } else {
            debug!("dropping {}ms sliver {}", part_info.duration_ms, part.display());
        }
    }

    if kept.is_empty() {
        bail!("splitting {} produced no usable segments", src.display());
    }

    job.set_source_files(kept);
    Ok(())
}

/// Build the trim ranges dividing a source at the given silence midpoints
pub fn trim_ranges(markers: &[MarkerPoint], total_secs: f64) -> Vec<TrimRange> {
    let mut ranges = Vec::with_capacity(markers.len() + 1);
    let mut start = 0.0;
    for marker in markers {
        let cut = marker.parse_end();
        ranges.push(TrimRange {
            start_secs: start,
            end_secs: cut,
        });
        start = cut;
    }
    ranges.push(TrimRange {
        start_secs: start,
        end_secs: total_secs,
    });
    ranges
}

/// Cut one source file at silence markers, producing one track per range.
///
/// Sources already carrying aac audio are stream-copied instead of being
/// re-encoded.
pub fn transcode_with_markers(
    engine: &dyn MediaEngine,
    job: &mut JobContext,
    src: &Path,
    markers: &[MarkerPoint],
) -> Result<TranscodeOutcome> {
    let info = engine.probe(src)?;
    let codec = if info.codec == "aac" {
        AudioCodec::Copy
    } else {
        AudioCodec::Aac
    };

    let ranges = trim_ranges(markers, info.duration_ms as f64 / 1000.0);
    let mut items = Vec::with_capacity(ranges.len());
    let mut dests = Vec::with_capacity(ranges.len());
    for (idx, trim) in ranges.into_iter().enumerate() {
        let dest = job.transcode_out_dir().join(format!("Track-{:03}.aac", idx + 1));
        job.add_to_track_list(&dest)?;
        dests.push(dest.clone());
        items.push(WorkItem {
            src: src.to_path_buf(),
            dest,
            codec,
            trim: Some(trim),
        });
    }

    let total = items.len();
    let cancel = job.cancel_token();
    let skipped = run_pool(engine, job.jobs, &cancel, items);
    if cancel.is_cancelled() {
        bail!("transcoding cancelled before completion");
    }
    if skipped == total {
        bail!("every cut of {} failed to transcode", src.display());
    }

    job.set_transcode_files(dests);
    Ok(TranscodeOutcome { skipped })
}

/// Rename falling back to copy+remove for cross-device moves
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)
            .with_context(|| format!("failed to move {} to {}", from.display(), to.display()))?;
        fs::remove_file(from).ok();
    }
    Ok(())
}
