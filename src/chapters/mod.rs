mod builder;
pub mod cue;

pub use builder::{
    chapter_per_file, from_cue_sheet, from_trim_ranges, group_by_tag, split_fixed_length, TitleMode,
};

use std::path::PathBuf;

/// One source audio unit contributing to a chapter
#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    pub length_ms: u64,
}

/// A named, timestamped segment of the final audiobook
#[derive(Debug, Clone, Default)]
pub struct Chapter {
    /// 0-based ordinal in discovery order (cue-derived chapters keep their
    /// 1-based cue track index instead)
    pub number: u32,
    pub title: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub length_ms: u64,
    pub tracks: Vec<Track>,
}

impl Chapter {
    /// Sum the constituent track lengths into the chapter length
    pub fn compile(&mut self) {
        self.length_ms = self.tracks.iter().map(|t| t.length_ms).sum();
    }

    /// Stamp start and end from a running clock, returning the end time
    pub fn stamp_times(&mut self, start_ms: u64) -> u64 {
        self.start_ms = start_ms;
        self.end_ms = start_ms + self.length_ms;
        self.end_ms
    }
}

/// Walk chapters in order assigning absolute timestamps. A 1 ms gap is left
/// between consecutive chapters; removing it would change output
/// byte-for-byte.
pub fn stamp_chapter_times(chapters: &mut [Chapter]) {
    let mut clock = 0;
    for chapter in chapters {
        clock = chapter.stamp_times(clock) + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_times() {
        let mut chapter = Chapter {
            length_ms: 1000,
            ..Default::default()
        };
        let end = chapter.stamp_times(0);
        assert_eq!(end, 1000);
        assert_eq!(chapter.start_ms, 0);
        assert_eq!(chapter.end_ms, 1000);
    }

    #[test]
    fn test_compile_sums_tracks() {
        let mut chapter = Chapter {
            tracks: vec![
                Track {
                    path: PathBuf::from("a.mp3"),
                    length_ms: 1000,
                },
                Track {
                    path: PathBuf::from("b.mp3"),
                    length_ms: 500,
                },
            ],
            ..Default::default()
        };
        chapter.compile();
        assert_eq!(chapter.length_ms, 1500);
    }

    #[test]
    fn test_stamping_leaves_one_ms_gap() {
        let mut chapters = vec![
            Chapter {
                length_ms: 1000,
                ..Default::default()
            },
            Chapter {
                length_ms: 2000,
                ..Default::default()
            },
            Chapter {
                length_ms: 3000,
                ..Default::default()
            },
        ];
        stamp_chapter_times(&mut chapters);

        assert_eq!(chapters[0].start_ms, 0);
        for pair in chapters.windows(2) {
            assert_eq!(pair[1].start_ms, pair[0].end_ms + 1);
        }
        for chapter in &chapters {
            assert_eq!(chapter.length_ms, chapter.end_ms - chapter.start_ms);
        }
    }
}
