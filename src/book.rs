use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::chapters::Chapter;
use crate::meta::MetaTemplate;

/// Top level construct of one audiobook's metadata and chapter list
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub author: String,
    pub title: String,
    pub date: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub narrator: Option<String>,
    /// Derived library sort string, never user-supplied
    pub sort_slug: Option<String>,
    pub series_name: Option<String>,
    pub series_part: Option<u32>,
    pub chapters: Vec<Chapter>,
}

impl Book {
    /// Populate attributes from a map of tags extracted from a path
    /// pattern. Unknown keys are ignored.
    pub fn from_path_tags(tags: &HashMap<String, String>) -> Self {
        let mut book = Self::default();
        book.apply_path_tags(tags);
        book
    }

    pub fn apply_path_tags(&mut self, tags: &HashMap<String, String>) {
        for (key, value) in tags {
            match key.as_str() {
                "author" => self.author = value.clone(),
                "genre" => self.genre = Some(value.clone()),
                "narrator" => self.narrator = Some(value.clone()),
                "release_date" => self.date = Some(value.clone()),
                "series" => self.series_name = Some(value.clone()),
                "series_part" => self.series_part = value.parse().ok(),
                "title" => self.title = value.clone(),
                _ => {}
            }
        }
    }

    /// Derive the sort slug used by the pure re-tagging flow. Only computed
    /// when both series fields are present.
    pub fn generate_sort_slug(&mut self) {
        if let (Some(series), Some(part)) = (&self.series_name, self.series_part) {
            self.sort_slug = Some(format!("{} - {}", series, part));
        }
    }

    /// Write the compiled metadata file used when binding chapters into the
    /// output container. The metadata-generation path carries the title in
    /// the sort slug, unlike the re-tagging path.
    pub fn generate_meta(
        &mut self,
        template: &MetaTemplate,
        description_file: Option<&Path>,
        chapters_file: &Path,
    ) -> Result<()> {
        if let (Some(series), Some(part)) = (&self.series_name, self.series_part) {
            self.sort_slug = Some(format!("{} - {} - {}", series, part, self.title));
        }

        if let Some(path) = description_file {
            self.format_description(path)?;
        }

        fs::write(chapters_file, template.render(self))
            .with_context(|| format!("failed to write {}", chapters_file.display()))?;

        Ok(())
    }

    /// Read and reformat a description text file into a tag entry that
    /// survives the INI continuation rules
    fn format_description(&mut self, path: &Path) -> Result<()> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("error reading description file {}", path.display()))?;

        if data.is_empty() {
            warn!("no data found in description file, skipping");
            return Ok(());
        }

        let mut formatted = data.replace('\n', " \\\n");
        formatted.push('\n');
        self.description = Some(formatted);

        Ok(())
    }

    /// Override container metadata with data from the Book. Used by the
    /// re-tagging flow, which may run on a Book without chapters.
    pub fn write_tags(&mut self, path: &Path) -> Result<()> {
        self.generate_sort_slug();

        let mut tag = mp4ameta::Tag::read_from_path(path)
            .with_context(|| format!("error opening {} for tagging", path.display()))?;

        tag.set_artist(&self.author);
        tag.set_album(&self.title);
        if let Some(date) = &self.date {
            if date.parse::<u32>().is_ok() {
                tag.set_year(date.clone());
            } else {
                warn!("invalid date entry: {}", date);
            }
        }
        if let Some(genre) = &self.genre {
            tag.set_genre(genre);
        }
        if let Some(narrator) = &self.narrator {
            tag.set_data(
                mp4ameta::FreeformIdent::new("com.apple.iTunes", "NARRATOR"),
                mp4ameta::Data::Utf8(narrator.clone()),
            );
        }
        if let Some(slug) = &self.sort_slug {
            write_sort_tags(&mut tag, slug);
        }

        tag.write_to_path(path)
            .with_context(|| format!("error writing tags to {}", path.display()))?;

        Ok(())
    }
}

/// Set the title-sort and album-sort atoms used for library ordering
pub fn write_sort_tags(tag: &mut mp4ameta::Tag, slug: &str) {
    tag.set_data(
        mp4ameta::Fourcc(*b"sonm"),
        mp4ameta::Data::Utf8(slug.to_string()),
    );
    tag.set_data(
        mp4ameta::Fourcc(*b"soal"),
        mp4ameta::Data::Utf8(slug.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_apply_path_tags() {
        let tags: HashMap<String, String> = [
            ("author", "Author Name"),
            ("title", "Title One"),
            ("series", "Series Name"),
            ("series_part", "2"),
            ("release_date", "1998"),
            ("mystery_key", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let book = Book::from_path_tags(&tags);
        assert_eq!(book.author, "Author Name");
        assert_eq!(book.title, "Title One");
        assert_eq!(book.series_name.as_deref(), Some("Series Name"));
        assert_eq!(book.series_part, Some(2));
        assert_eq!(book.date.as_deref(), Some("1998"));
        assert!(book.genre.is_none());
    }

    #[test]
    fn test_sort_slug_requires_both_series_fields() {
        let mut book = Book {
            series_name: Some("Series".to_string()),
            ..Default::default()
        };
        book.generate_sort_slug();
        assert!(book.sort_slug.is_none());

        book.series_part = Some(3);
        book.generate_sort_slug();
        assert_eq!(book.sort_slug.as_deref(), Some("Series - 3"));
    }

    #[test]
    fn test_generate_meta_computes_full_sort_slug() {
        let temp = tempfile::TempDir::new().unwrap();
        let chapters_file = temp.path().join("chapters.ini");

        let mut book = Book {
            author: "A".to_string(),
            title: "Title".to_string(),
            series_name: Some("Series".to_string()),
            series_part: Some(1),
            ..Default::default()
        };
        book.generate_meta(&MetaTemplate::new(), None, &chapters_file)
            .unwrap();

        assert_eq!(book.sort_slug.as_deref(), Some("Series - 1 - Title"));
        let rendered = fs::read_to_string(&chapters_file).unwrap();
        assert!(rendered.contains("album=Title"));
    }

    #[test]
    fn test_format_description_escapes_newlines() {
        let temp = tempfile::TempDir::new().unwrap();
        let desc = temp.path().join("description.txt");
        fs::write(&desc, "line one\nline two").unwrap();

        let mut book = Book::default();
        book.format_description(&desc).unwrap();
        assert_eq!(
            book.description.as_deref(),
            Some("line one \\\nline two\n")
        );
    }

    #[test]
    fn test_empty_description_file_is_skipped() {
        let temp = tempfile::TempDir::new().unwrap();
        let desc = temp.path().join("description.txt");
        fs::write(&desc, "").unwrap();

        let mut book = Book::default();
        book.format_description(&desc).unwrap();
        assert!(book.description.is_none());
    }

    #[test]
    fn test_write_tags_to_nonexistent_file_fails() {
        let mut book = Book {
            author: "A".to_string(),
            title: "T".to_string(),
            ..Default::default()
        };
        assert!(book
            .write_tags(&PathBuf::from("/nonexistent/book.m4b"))
            .is_err());
    }
}
