use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

use super::{
    PatternError, AUDIO_FILE, AUTHOR, GENRE, NARRATOR, RELEASE_DATE, SERIES, SERIES_PART, TITLE,
};
use crate::config::AUDIO_EXTENSIONS;

/// Translate one pattern segment into its matching expression. Tokens become
/// named captures keyed by their tag name; anything else is an escaped
/// literal.
fn segment_matcher(segment: &str) -> String {
    match segment {
        AUDIO_FILE => format!(r"(?P<audio_file>[^/]+\.(?:{}))", AUDIO_EXTENSIONS.join("|")),
        AUTHOR => r"(?P<author>[^/]+)".to_string(),
        GENRE => r"(?P<genre>[^/]+)".to_string(),
        NARRATOR => r"(?P<narrator>[^/]+)".to_string(),
        RELEASE_DATE => r"(?P<release_date>\d+)".to_string(),
        SERIES => r"(?P<series>[^/]+)".to_string(),
        SERIES_PART => r"(?P<series_part>\d+)".to_string(),
        TITLE => r"(?P<title>[^/]+)".to_string(),
        literal => {
            debug!("couldn't match {}, adding it as a literal", literal);
            regex::escape(literal)
        }
    }
}

/// Extract a map of tag values from a filesystem path using a token pattern.
///
/// Each slash-delimited pattern segment is compiled to a matcher and the
/// whole expression is anchored against the literal path. A path that does
/// not line up with the pattern is a structural error carrying enough
/// context to diagnose the mismatch.
pub fn parse_path_tags(
    path: &str,
    path_pattern: &str,
) -> Result<HashMap<String, String>, PatternError> {
    let pattern = path_pattern.trim_end_matches('/');
    let segments: Vec<&str> = pattern.split('/').collect();
    debug!("parser pattern tags: {:?}", segments);

    let matcher = segments
        .iter()
        .map(|segment| segment_matcher(segment))
        .collect::<Vec<_>>()
        .join("/");
    debug!("parser pattern: {}", matcher);

    let re = Regex::new(&format!("^{}$", matcher))?;

    let mut values = HashMap::new();
    if let Some(captures) = re.captures(path) {
        for name in re.capture_names().flatten() {
            if let Some(capture) = captures.name(name) {
                values.insert(name.to_string(), capture.as_str().to_string());
            }
        }
    }

    // if no tags were parsed, error out since something wasn't right
    if values.is_empty() {
        return Err(PatternError::NoMatch {
            pattern: pattern.to_string(),
            reconstructed: segments.join("/"),
            path: path.to_string(),
        });
    }

    Ok(values)
}
