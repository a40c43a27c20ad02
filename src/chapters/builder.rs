use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::cue::{parse_cue_sheet, CueError};
use super::{stamp_chapter_times, Chapter, Track};
use crate::media::{MediaEngine, TrimRange};

/// How per-file chapters pick their titles. The three modes are mutually
/// exclusive; callers select exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMode {
    /// File base name with the extension stripped
    FileName,
    /// Embedded title tag
    TagTitle,
    /// Positional "Chapter {n}" label, 1-indexed
    Positional,
}

/// Group consecutive tracks that share a title tag into chapters.
///
/// The comparison is exact and case-sensitive. The first track starts the
/// accumulator without finalizing anything; the final accumulator is always
/// appended after the loop.
pub fn group_by_tag(engine: &dyn MediaEngine, files: &[PathBuf]) -> Result<Vec<Chapter>> {
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut current: Option<Chapter> = None;
    let mut index = 0;

    for file in files {
        let info = engine.probe(file)?;
        let title = info.tag("title").unwrap_or_default().to_string();
        let track = Track {
            path: file.clone(),
            length_ms: info.duration_ms,
        };

        match current.as_mut() {
            Some(chapter) if chapter.title == title => {
                debug!("{} has no new chapter, adding to {}", file.display(), chapter.title);
                chapter.tracks.push(track);
            }
            _ => {
                debug!("{} has chapter name: {}", file.display(), title);
                if let Some(mut finished) = current.take() {
                    finished.compile();
                    chapters.push(finished);
                    index += 1;
                }
                current = Some(Chapter {
                    number: index,
                    title,
                    tracks: vec![track],
                    ..Default::default()
                });
            }
        }
    }

    if let Some(mut finished) = current.take() {
        finished.compile();
        chapters.push(finished);
    }

    stamp_chapter_times(&mut chapters);
    Ok(chapters)
}

/// Create one chapter per input file, in input order
pub fn chapter_per_file(
    engine: &dyn MediaEngine,
    files: &[PathBuf],
    mode: TitleMode,
) -> Result<Vec<Chapter>> {
    let mut chapters = Vec::with_capacity(files.len());

    for (idx, file) in files.iter().enumerate() {
        let info = engine.probe(file)?;
        let title = match mode {
            TitleMode::FileName => file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            TitleMode::TagTitle => info.tag("title").unwrap_or_default().to_string(),
            TitleMode::Positional => format!("Chapter {}", idx + 1),
        };

        let mut chapter = Chapter {
            number: idx as u32,
            title,
            tracks: vec![Track {
                path: file.clone(),
                length_ms: info.duration_ms,
            }],
            ..Default::default()
        };
        chapter.compile();
        chapters.push(chapter);
    }

    stamp_chapter_times(&mut chapters);
    Ok(chapters)
}

/// Slice the total duration of the given files into fixed-length chapters,
/// with a trailing remainder chapter when the division isn't even
pub fn split_fixed_length(
    engine: &dyn MediaEngine,
    files: &[PathBuf],
    chapter_length_min: u64,
) -> Result<Vec<Chapter>> {
    if chapter_length_min == 0 {
        bail!("chapter length must be at least one minute");
    }
    let chapter_len_ms = chapter_length_min * 60 * 1000;

    let mut total_ms = 0;
    for file in files {
        total_ms += engine.probe(file)?.duration_ms;
    }

    let full_chapters = total_ms / chapter_len_ms;
    let mut remainder_ms = 0;

    if full_chapters == 0 {
        debug!("less than one chapter length's worth of audio, creating no chapter");
    } else if full_chapters == 1 {
        debug!("checking for extra audio after first chapter");
        remainder_ms = total_ms - chapter_len_ms;
    } else if total_ms % chapter_len_ms != 0 {
        debug!("found extra audio after last chapter");
        remainder_ms = total_ms % chapter_len_ms;
    }

    let mut chapters = Vec::with_capacity(full_chapters as usize + 1);
    for idx in 0..full_chapters {
        chapters.push(Chapter {
            number: idx as u32,
            title: format!("Chapter {}", idx + 1),
            length_ms: chapter_len_ms,
            ..Default::default()
        });
    }

    if remainder_ms > 0 {
        debug!("adding a trailing chapter of {}ms", remainder_ms);
        chapters.push(Chapter {
            number: full_chapters as u32,
            title: format!("Chapter {}", full_chapters + 1),
            length_ms: remainder_ms,
            ..Default::default()
        });
    }

    stamp_chapter_times(&mut chapters);
    Ok(chapters)
}

/// Turn the trim ranges of a silence-based split into positional chapters
pub fn from_trim_ranges(ranges: &[TrimRange]) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = ranges
        .iter()
        .enumerate()
        .map(|(idx, range)| Chapter {
            number: idx as u32,
            title: format!("Chapter {}", idx + 1),
            length_ms: ((range.end_secs - range.start_secs) * 1000.0) as u64,
            ..Default::default()
        })
        .collect();
    stamp_chapter_times(&mut chapters);
    chapters
}

/// Build chapters from a CUESHEET tag embedded in a single source file.
///
/// Cue entries already carry absolute offsets, so no stamping pass runs and
/// chapter numbers keep the 1-based cue track index.
pub fn from_cue_sheet(engine: &dyn MediaEngine, file: &Path) -> Result<Vec<Chapter>, CueError> {
    let info = engine.probe(file)?;
    let raw = info.tag("cuesheet").ok_or(CueError::TagNotFound)?;
    debug!("{}", raw);

    let entries = parse_cue_sheet(raw, info.duration_ms);
    Ok(entries
        .into_iter()
        .map(|entry| Chapter {
            number: entry.track,
            title: entry.title,
            start_ms: entry.start_ms,
            end_ms: entry.end_ms,
            length_ms: entry.end_ms.saturating_sub(entry.start_ms),
            tracks: Vec::new(),
        })
        .collect())
}
