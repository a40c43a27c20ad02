use tracing::debug;

use super::{
    PatternError, AUTHOR, GENRE, NARRATOR, RELEASE_DATE, SERIES, SERIES_PART, TITLE,
};
use crate::book::Book;
use crate::config::M4B_EXT;

/// Render the output directory structure from a path pattern and Book data.
///
/// This side is strict: substituting a token whose Book field is unset is an
/// error. A pattern that reduces to a single opaque segment is rejected.
pub fn render_output_path(book: &Book, path_pattern: &str) -> Result<String, PatternError> {
    let pattern = path_pattern.trim_end_matches('/');
    let segments: Vec<&str> = pattern.split('/').collect();
    debug!("parser pattern tags: {:?}", segments);

    if segments.len() == 1 {
        return Err(PatternError::InvalidPathPattern);
    }

    let mut rendered = Vec::with_capacity(segments.len());
    for segment in &segments {
        let value = match *segment {
            AUTHOR => book.author.clone(),
            GENRE => required(book.genre.clone(), "genre")?,
            NARRATOR => required(book.narrator.clone(), "narrator")?,
            RELEASE_DATE => required(book.date.clone(), "release-date")?,
            SERIES => required(book.series_name.clone(), "series")?,
            SERIES_PART => required(book.series_part.map(|p| p.to_string()), "series-part")?,
            TITLE => book.title.clone(),
            literal => {
                debug!("couldn't match {}, adding it as a literal", literal);
                literal.to_string()
            }
        };
        rendered.push(value);
    }

    Ok(rendered.join("/"))
}

fn required(value: Option<String>, token: &'static str) -> Result<String, PatternError> {
    value.ok_or(PatternError::MissingField { token })
}

/// Render the output filename from a pattern and Book data.
///
/// Unlike path rendering this side is lenient: tokens for unset optional
/// fields are left unexpanded. Author and title are always substituted. An
/// empty pattern falls back to "{author} - {title}".
pub fn render_output_filename(book: &Book, file_pattern: &str) -> String {
    if file_pattern.is_empty() {
        return format!("{} - {}.{}", book.author, book.title, M4B_EXT);
    }

    let mut name = file_pattern.replace(AUTHOR, &book.author);
    if let Some(genre) = &book.genre {
        name = name.replace(GENRE, genre);
    }
    if let Some(narrator) = &book.narrator {
        name = name.replace(NARRATOR, narrator);
    }
    if let Some(date) = &book.date {
        name = name.replace(RELEASE_DATE, date);
    }
    if let Some(series) = &book.series_name {
        name = name.replace(SERIES, series);
    }
    if let Some(part) = book.series_part {
        name = name.replace(SERIES_PART, &part.to_string());
    }
    name = name.replace(TITLE, &book.title);

    // a pattern ending in the literal extension would double it up
    let mut name = format!("{}.{}", name, M4B_EXT);
    if name.ends_with(".m4b.m4b") {
        name.truncate(name.len() - 4);
    }
    name
}
