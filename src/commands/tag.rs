use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::book::Book;
use crate::cli::BindArgs;
use crate::config::{Settings, M4B_EXT};
use crate::pattern;

/// Re-tag an existing audiobook from its path, without touching the audio
pub fn run(args: &BindArgs, dry_run: bool) -> Result<()> {
    let settings = Settings::load()?;
    let path = &args.source_files_path;

    let is_m4b = path
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(M4B_EXT))
        .unwrap_or(false);
    if !is_m4b {
        bail!("{} is not an m4b file", path.display());
    }

    let path_pattern = settings
        .path_pattern(args.path_pattern.as_deref())
        .context("no path pattern defined; set one in config or pass --path-pattern")?;

    let tags = pattern::parse_path_tags(&path.to_string_lossy(), &path_pattern)?;
    super::print_parsed_tags(&tags);

    let mut book = Book::from_path_tags(&tags);
    if dry_run {
        book.generate_sort_slug();
        println!("{}", "Dry run, no tags will be written".yellow());
        if let Some(slug) = &book.sort_slug {
            println!("Sort slug: {}", slug.green());
        }
        return Ok(());
    }

    book.write_tags(path)?;
    println!("Tags written to {}", path.display().to_string().green());
    Ok(())
}
