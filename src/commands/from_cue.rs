use anyhow::{Context, Result};
use colored::Colorize;

use crate::chapters::{cue::CueError, from_cue_sheet};
use crate::cli::BindArgs;
use crate::config::Settings;
use crate::job::JobContext;
use crate::media::FfmpegEngine;

/// Bind an audiobook whose chapter boundaries come from a CUESHEET tag
/// embedded in a single source file
pub fn run(args: &BindArgs, dry_run: bool) -> Result<()> {
    let settings = Settings::load()?;
    let opts = super::job_options(&settings, args)?;
    let mut book = super::parse_book(args, &opts)?;
    if dry_run {
        return super::print_dry_run(&book, &opts);
    }

    let engine = FfmpegEngine::new(opts.verbose_transcode);
    let mut job = JobContext::new(opts)?;

    let src = job.check_for_source_file(&args.source_files_path)?;
    book.chapters = match from_cue_sheet(&engine, &src) {
        Ok(chapters) => chapters,
        Err(CueError::TagNotFound) => {
            println!(
                "{}",
                "No CUESHEET tag found; try `bind split-chapters` instead".yellow()
            );
            return Err(CueError::TagNotFound).context("cue-based binding failed");
        }
        Err(err) => return Err(err.into()),
    };
    job.set_source_files(vec![src]);

    super::finish(&engine, job, &mut book)
}
