use regex::Regex;
use thiserror::Error;
use tracing::{debug, error};

/// Failures from cue-sheet handling. `TagNotFound` is recoverable: callers
/// are expected to fall back to another chapter-discovery strategy.
#[derive(Debug, Error)]
pub enum CueError {
    #[error("CUESHEET tag not found")]
    TagNotFound,

    #[error("malformed cue timecode `{0}`")]
    BadTimecode(String),

    #[error(transparent)]
    Media(#[from] anyhow::Error),
}

/// One parsed cue-sheet track boundary
#[derive(Debug, Clone, Default)]
pub struct CueEntry {
    /// 1-based track index, assigned in parse order
    pub track: u32,
    pub title: String,
    /// Raw MM:SS:FF timecode from the INDEX line
    pub start_str: String,
    /// Parsed INDEX offset from the start of the source file
    pub start_offset_ms: u64,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Parse an MM:SS:FF cue timecode into milliseconds. Frames are ignored.
pub fn parse_timecode(timecode: &str) -> Result<u64, CueError> {
    let parts: Vec<&str> = timecode.split(':').collect();
    if parts.len() < 2 {
        return Err(CueError::BadTimecode(timecode.to_string()));
    }

    let minutes: u64 = parts[0]
        .parse()
        .map_err(|_| CueError::BadTimecode(timecode.to_string()))?;
    let seconds: u64 = parts[1]
        .parse()
        .map_err(|_| CueError::BadTimecode(timecode.to_string()))?;

    Ok(minutes * 60_000 + seconds * 1000)
}

/// Parse a raw embedded cue sheet into ordered entries with absolute
/// offsets, given the total probed duration of the source file.
///
/// The grammar is line-oriented and order-sensitive: TRACK opens an entry,
/// TITLE names it, INDEX finalizes it. A malformed INDEX timecode drops
/// that single entry rather than aborting the parse.
pub fn parse_cue_sheet(raw: &str, total_ms: u64) -> Vec<CueEntry> {
    let index_prefix = Regex::new(r"^INDEX \d+ ").expect("static regex");

    let mut entries: Vec<CueEntry> = Vec::new();
    let mut current: Option<CueEntry> = None;
    let mut track_count = 1;

    for line in raw.lines() {
        let clean = line.trim();
        if clean.starts_with("TRACK ") {
            current = Some(CueEntry {
                track: track_count,
                ..Default::default()
            });
        } else if clean.starts_with("TITLE") {
            if let Some(entry) = current.as_mut() {
                entry.title = clean
                    .trim_start_matches("TITLE ")
                    .replace('"', "")
                    .to_string();
            }
        } else if clean.starts_with("INDEX") {
            let Some(mut entry) = current.take() else {
                continue;
            };
            let timecode = index_prefix.replace(clean, "").to_string();
            entry.start_str = timecode.clone();
            match parse_timecode(&timecode) {
                Ok(offset) => entry.start_offset_ms = offset,
                Err(err) => {
                    error!("{}", err);
                    continue;
                }
            }
            entries.push(entry);
            track_count += 1;
        }
    }

    assign_offsets(&mut entries, total_ms);
    entries
}

/// Assign absolute start/end offsets across the collected entries. Entry 0
/// starts at zero; each entry ends where the next one's INDEX points; the
/// last entry ends at the probed total duration.
///
/// Offsets are clamped to the probed duration: a sheet can outlive its
/// audio when the tagged file was trimmed after the sheet was written.
fn assign_offsets(entries: &mut [CueEntry], total_ms: u64) {
    let count = entries.len();
    let mut tracker = 0;

    for idx in 0..count {
        if idx == count - 1 {
            entries[idx].start_ms = tracker;
            entries[idx].end_ms = total_ms;
        } else {
            entries[idx].start_ms = tracker;
            tracker = entries[idx + 1].start_offset_ms.min(total_ms);
            entries[idx].end_ms = tracker;
        }
        debug!(
            "track {} starts at {}ms and ends at {}ms",
            entries[idx].track, entries[idx].start_ms, entries[idx].end_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue_sheet_of(count: usize, minutes_apart: u64) -> String {
        let mut sheet = String::from("FILE \"audio.mp3\" MP3\n");
        for idx in 0..count {
            let minutes = idx as u64 * minutes_apart;
            sheet.push_str(&format!(
                "  TRACK {:02} AUDIO\n    TITLE \"Part {}\"\n    INDEX 01 {}:00:00\n",
                idx + 1,
                idx + 1,
                minutes
            ));
        }
        sheet
    }

    #[test]
    fn test_parse_timecode_ignores_frames() {
        assert_eq!(parse_timecode("01:30:59").unwrap(), 90_000);
        // minutes run past 59 in cue sheets for long sources
        assert_eq!(parse_timecode("72:05:00").unwrap(), 4_325_000);
    }

    #[test]
    fn test_parse_timecode_malformed() {
        assert!(parse_timecode("junk").is_err());
        assert!(parse_timecode("aa:bb:cc").is_err());
    }

    #[test]
    fn test_fifty_entry_sheet() {
        // 50 tracks, one every minute, over a 50-minute source
        let total_ms = 50 * 60_000;
        let entries = parse_cue_sheet(&cue_sheet_of(50, 1), total_ms);

        assert_eq!(entries.len(), 50);
        assert_eq!(entries[0].track, 1);
        assert_eq!(entries[0].start_ms, 0);
        assert_eq!(entries[0].end_ms, entries[1].start_offset_ms);
        assert_eq!(entries[49].end_ms, total_ms);

        for pair in entries.windows(2) {
            assert_eq!(pair[1].start_ms, pair[0].end_ms);
            assert_eq!(pair[1].track, pair[0].track + 1);
        }
    }

    #[test]
    fn test_titles_have_quotes_stripped() {
        let entries = parse_cue_sheet(&cue_sheet_of(2, 1), 120_000);
        assert_eq!(entries[0].title, "Part 1");
        assert_eq!(entries[1].title, "Part 2");
    }

    #[test]
    fn test_malformed_index_drops_single_entry() {
        let sheet = "TRACK 01 AUDIO\nTITLE \"Good\"\nINDEX 01 00:00:00\n\
                     TRACK 02 AUDIO\nTITLE \"Bad\"\nINDEX 01 xx:yy:zz\n\
                     TRACK 03 AUDIO\nTITLE \"Also Good\"\nINDEX 01 10:00:00\n";
        let entries = parse_cue_sheet(sheet, 1_200_000);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Good");
        assert_eq!(entries[1].title, "Also Good");
        // track numbering stays sequential over surviving entries
        assert_eq!(entries[1].track, 2);
    }

    #[test]
    fn test_offsets_past_duration_are_clamped() {
        // sheet written for a longer cut of the audio than was probed
        let sheet = "TRACK 01 AUDIO\nTITLE \"One\"\nINDEX 01 00:00:00\n\
                     TRACK 02 AUDIO\nTITLE \"Two\"\nINDEX 01 10:00:00\n";
        let entries = parse_cue_sheet(sheet, 300_000);

        assert_eq!(entries[0].start_ms, 0);
        assert_eq!(entries[0].end_ms, 300_000);
        assert_eq!(entries[1].start_ms, 300_000);
        assert_eq!(entries[1].end_ms, 300_000);
    }

    #[test]
    fn test_single_entry_spans_whole_source() {
        let entries = parse_cue_sheet(&cue_sheet_of(1, 1), 90_000);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].start_ms, 0);
        assert_eq!(entries[0].end_ms, 90_000);
    }
}
