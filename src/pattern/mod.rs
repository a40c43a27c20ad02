mod extract;
mod render;

pub use extract::parse_path_tags;
pub use render::{render_output_filename, render_output_path};

use thiserror::Error;

/// Path pattern tokens
pub const AUDIO_FILE: &str = "%f";
pub const AUTHOR: &str = "%a";
pub const GENRE: &str = "%g";
pub const NARRATOR: &str = "%n";
pub const RELEASE_DATE: &str = "%y";
pub const SERIES: &str = "%s";
pub const SERIES_PART: &str = "%p";
pub const TITLE: &str = "%t";

#[derive(Debug, Error)]
pub enum PatternError {
    #[error(
        "no tags were parsed from the path template\n\
         Parsed patterns were: {pattern}\n\
         Parsed path would have been: {reconstructed}\n\
         Input path was: {path}"
    )]
    NoMatch {
        pattern: String,
        reconstructed: String,
        path: String,
    },

    #[error("output path pattern is invalid: at least two segments are required")]
    InvalidPathPattern,

    #[error("book has no value for pattern token `{token}`")]
    MissingField { token: &'static str },

    #[error("failed to compile path pattern")]
    Regex(#[from] regex::Error),
}
