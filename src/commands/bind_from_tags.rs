use anyhow::Result;

use crate::chapters::group_by_tag;
use crate::cli::BindArgs;
use crate::config::Settings;
use crate::job::JobContext;
use crate::media::FfmpegEngine;

/// Bind an audiobook grouping consecutive tracks into chapters by their
/// embedded title tag
pub fn run(args: &BindArgs, dry_run: bool) -> Result<()> {
    let settings = Settings::load()?;
    let opts = super::job_options(&settings, args)?;
    let mut book = super::parse_book(args, &opts)?;
    if dry_run {
        return super::print_dry_run(&book, &opts);
    }

    let engine = FfmpegEngine::new(opts.verbose_transcode);
    let job = JobContext::new(opts)?;

    book.chapters = group_by_tag(&engine, job.source_files())?;

    super::finish(&engine, job, &mut book)
}
