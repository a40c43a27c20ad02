use anyhow::{bail, Result};
use regex::Regex;
use std::path::Path;
use tracing::debug;

use crate::media::MediaEngine;

/// One detected stretch of silence, positioned by where it ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPoint {
    /// Length of the silent stretch, in seconds
    pub duration: f64,
    /// Absolute position where the silence ends, in seconds
    pub end: f64,
}

impl MarkerPoint {
    /// Midpoint of the silent stretch, used as the actual cut position so
    /// neither neighboring chapter loses audible audio
    pub fn parse_end(&self) -> f64 {
        self.end - self.duration / 2.0
    }
}

/// Scan a file for silent stretches usable as chapter boundaries.
///
/// `db_floor` must be negative: it is the level, in dB below full scale,
/// under which audio counts as silence.
pub fn generate_vol_markers(
    engine: &dyn MediaEngine,
    file: &Path,
    min_silence_secs: f64,
    db_floor: i32,
) -> Result<Vec<MarkerPoint>> {
    if db_floor >= 0 {
        bail!("db floor must be negative, got {}", db_floor);
    }

    let output = engine.silence_scan(file, db_floor, min_silence_secs)?;
    Ok(parse_silence_markers(&output))
}

/// Parse silencedetect diagnostic output into marker points. Lines that
/// don't carry a silence_end/silence_duration pair are ignored.
pub fn parse_silence_markers(output: &str) -> Vec<MarkerPoint> {
    let marker_line = Regex::new(
        r"silence_end:\s*(?P<end>[0-9.]+)\s*\|\s*silence_duration:\s*(?P<duration>[0-9.]+)",
    )
    .expect("static regex");

    let mut markers = Vec::new();
    for caps in marker_line.captures_iter(output) {
        let (Ok(end), Ok(duration)) = (caps["end"].parse(), caps["duration"].parse()) else {
            continue;
        };
        let marker = MarkerPoint { duration, end };
        debug!("silence ends at {}s after {}s", marker.end, marker.duration);
        markers.push(marker);
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::stub::StubEngine;

    const SCAN_OUTPUT: &str = "\
[silencedetect @ 0x55d] silence_start: 299.405\n\
[silencedetect @ 0x55d] silence_end: 302.605 | silence_duration: 3.2\n\
frame= 1000 fps=0.0 q=-0.0 size=N/A\n\
[silencedetect @ 0x55d] silence_start: 601.1\n\
[silencedetect @ 0x55d] silence_end: 604.7 | silence_duration: 3.6\n";

    #[test]
    fn test_parse_silence_markers() {
        let markers = parse_silence_markers(SCAN_OUTPUT);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].end, 302.605);
        assert_eq!(markers[0].duration, 3.2);
        assert_eq!(markers[1].end, 604.7);
    }

    #[test]
    fn test_parse_end_is_silence_midpoint() {
        let marker = MarkerPoint {
            duration: 4.0,
            end: 102.0,
        };
        assert_eq!(marker.parse_end(), 100.0);
    }

    #[test]
    fn test_noise_only_output_yields_no_markers() {
        assert!(parse_silence_markers("frame= 1000 fps=0.0\n").is_empty());
    }

    #[test]
    fn test_generate_vol_markers_rejects_positive_floor() {
        let engine = StubEngine::default();
        assert!(generate_vol_markers(&engine, Path::new("a.mp3"), 3.0, 30).is_err());
    }

    #[test]
    fn test_generate_vol_markers_via_engine() {
        let engine = StubEngine {
            silence_output: SCAN_OUTPUT.to_string(),
            ..Default::default()
        };
        let markers = generate_vol_markers(&engine, Path::new("a.mp3"), 3.0, -30).unwrap();
        assert_eq!(markers.len(), 2);
    }
}
