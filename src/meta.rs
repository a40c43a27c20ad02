use crate::book::Book;

/// Renders the ffmetadata INI consumed by the media engine's
/// metadata-binding step.
///
/// Constructed once per job and owned by the job context; rendering never
/// mutates it.
#[derive(Debug, Clone)]
pub struct MetaTemplate {
    timebase: u32,
}

impl Default for MetaTemplate {
    fn default() -> Self {
        // chapter timestamps are carried in milliseconds throughout
        Self { timebase: 1000 }
    }
}

impl MetaTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render global tags plus one [CHAPTER] record per chapter
    pub fn render(&self, book: &Book) -> String {
        let mut out = String::from(";FFMETADATA1\n");

        out.push_str(&format!("artist={}\n", book.author));
        out.push_str(&format!("album={}\n", book.title));
        out.push_str(&format!("album_artist={}\n", book.author));
        if let Some(genre) = &book.genre {
            out.push_str(&format!("genre={}\n", genre));
        }
        if let Some(date) = &book.date {
            out.push_str(&format!("date={}\n", date));
        }
        if let Some(narrator) = &book.narrator {
            out.push_str(&format!("composer={}\n", narrator));
        }
        if let Some(description) = &book.description {
            out.push_str(&format!("description={}", description));
        }

        for chapter in &book.chapters {
            out.push_str("[CHAPTER]\n");
            out.push_str(&format!("TIMEBASE=1/{}\n", self.timebase));
            out.push_str(&format!("START={}\n", chapter.start_ms));
            out.push_str(&format!("END={}\n", chapter.end_ms));
            out.push_str(&format!("title={}\n", chapter.title));
        }

        out
    }
}
