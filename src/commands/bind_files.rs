use anyhow::Result;

use crate::chapters::{chapter_per_file, TitleMode};
use crate::cli::BindArgs;
use crate::config::Settings;
use crate::job::JobContext;
use crate::media::FfmpegEngine;

/// Bind an audiobook with one chapter per source file
pub fn run(args: &BindArgs, use_filenames: bool, use_title_tag: bool, dry_run: bool) -> Result<()> {
    let settings = Settings::load()?;
    let opts = super::job_options(&settings, args)?;
    let mut book = super::parse_book(args, &opts)?;
    if dry_run {
        return super::print_dry_run(&book, &opts);
    }

    let engine = FfmpegEngine::new(opts.verbose_transcode);
    let job = JobContext::new(opts)?;

    let mode = if use_filenames {
        TitleMode::FileName
    } else if use_title_tag {
        TitleMode::TagTitle
    } else {
        TitleMode::Positional
    };
    book.chapters = chapter_per_file(&engine, job.source_files(), mode)?;

    super::finish(&engine, job, &mut book)
}
