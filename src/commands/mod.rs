pub mod bind_files;
pub mod bind_from_tags;
pub mod from_cue;
pub mod split_chapters;
pub mod tag;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::collections::HashMap;

use crate::book::Book;
use crate::cli::BindArgs;
use crate::config::Settings;
use crate::job::{JobContext, JobOptions};
use crate::media::MediaEngine;
use crate::pattern;
use crate::transcode;

/// Merge config-file, environment and CLI values into validated job options
fn job_options(settings: &Settings, args: &BindArgs) -> Result<JobOptions> {
    let path_pattern = settings
        .path_pattern(args.path_pattern.as_deref())
        .context("no path pattern defined; set one in config or pass --path-pattern")?;

    let output_path_pattern = settings
        .output_directory(args.output_directory.as_deref())
        .unwrap_or_default();
    if output_path_pattern.is_empty() {
        bail!("no output directory defined; set one in config or pass --output-directory");
    }

    let jobs = args.jobs.or(settings.jobs).unwrap_or(1);
    if jobs == 0 {
        bail!("jobs must be at least 1");
    }

    Ok(JobOptions {
        source_files_path: args.source_files_path.clone(),
        path_pattern,
        output_file_pattern: settings
            .file_pattern(args.file_pattern.as_deref())
            .unwrap_or_default(),
        output_path_pattern,
        scratch_files_path: args
            .scratch_files_path
            .clone()
            .or_else(|| settings.scratch_files_path.clone()),
        jobs,
        verbose_transcode: args.verbose_transcode,
        external_chapters: false,
    })
}

/// Extract book metadata from the source path and echo what was found
fn parse_book(args: &BindArgs, opts: &JobOptions) -> Result<Book> {
    let path = args.source_files_path.to_string_lossy();
    let tags = pattern::parse_path_tags(&path, &opts.path_pattern)?;
    print_parsed_tags(&tags);
    Ok(Book::from_path_tags(&tags))
}

fn print_parsed_tags(tags: &HashMap<String, String>) {
    println!("{}", "Parsed tags:".bold());
    let mut keys: Vec<&String> = tags.keys().collect();
    keys.sort();
    for key in keys {
        println!("  {}: {}", key.cyan(), tags[key]);
    }
}

/// Show where a bind would land without touching any files
fn print_dry_run(book: &Book, opts: &JobOptions) -> Result<()> {
    let out_dir = pattern::render_output_path(book, &opts.output_path_pattern)?;
    let out_file = pattern::render_output_filename(book, &opts.output_file_pattern);

    println!("{}", "Dry run, nothing will be written".yellow());
    println!("Output directory: {}", out_dir.green());
    println!("Output file: {}", out_file.green());
    Ok(())
}

/// Render output naming and write the metadata file consumed by binding
fn write_meta(job: &mut JobContext, book: &mut Book) -> Result<()> {
    job.set_output_filename(book)?;
    book.generate_meta(&job.template, job.description_file(), &job.chapters_path())
}

/// Merge the transcoded tracks into the finished book and release scratch
fn finalize(engine: &dyn MediaEngine, job: JobContext, book: &Book) -> Result<()> {
    transcode::combine(engine, &job)?;
    let final_path = transcode::bind(engine, &job, book)?;

    println!("Wrote {}", final_path.display().to_string().green());
    job.cleanup()
}

/// Shared back half of every bind flow: render output naming, write the
/// metadata file, then transcode, combine and bind
fn finish(engine: &dyn MediaEngine, mut job: JobContext, book: &mut Book) -> Result<()> {
    write_meta(&mut job, book)?;
    transcode::transcode_source_files(engine, &mut job)?;
    finalize(engine, job, book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args_with(path_pattern: Option<&str>, output_directory: Option<&str>) -> BindArgs {
        BindArgs {
            source_files_path: PathBuf::from("/books/Author/Title"),
            path_pattern: path_pattern.map(String::from),
            file_pattern: None,
            output_directory: output_directory.map(String::from),
            jobs: Some(2),
            scratch_files_path: None,
            verbose_transcode: false,
        }
    }

    #[test]
    fn test_job_options_requires_path_pattern() {
        let settings = Settings::default();
        assert!(job_options(&settings, &args_with(None, Some("out/%a/%t"))).is_err());
    }

    #[test]
    fn test_job_options_requires_output_directory() {
        let settings = Settings::default();
        assert!(job_options(&settings, &args_with(Some("%a/%t"), None)).is_err());
    }

    #[test]
    fn test_job_options_rejects_zero_jobs() {
        let settings = Settings::default();
        let mut args = args_with(Some("%a/%t"), Some("out/%a/%t"));
        args.jobs = Some(0);
        assert!(job_options(&settings, &args).is_err());
    }

    #[test]
    fn test_job_options_layering() {
        let settings = Settings {
            jobs: Some(8),
            path_pattern: Some("%g/%a/%t".to_string()),
            output_path_pattern: Some("library/%a/%t".to_string()),
            ..Default::default()
        };
        let opts = job_options(&settings, &args_with(Some("%a/%t"), None)).unwrap();

        // CLI beats config where given, config fills the rest
        assert_eq!(opts.path_pattern, "%a/%t");
        assert_eq!(opts.output_path_pattern, "library/%a/%t");
        assert_eq!(opts.jobs, 2);
    }
}
