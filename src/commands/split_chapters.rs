use anyhow::Result;
use colored::Colorize;
use std::fs;

use crate::chapters::{from_trim_ranges, split_fixed_length};
use crate::cli::BindArgs;
use crate::config::Settings;
use crate::job::JobContext;
use crate::media::{FfmpegEngine, MediaEngine};
use crate::silence::generate_vol_markers;
use crate::transcode;

/// Silence-detection tuning for the `--split-on-silence` variant
pub struct SilenceOpts {
    pub enabled: bool,
    pub min_duration_secs: f64,
    pub floor_db: i32,
}

/// Bind a single large audio file, slicing it into chapters.
///
/// Four variants share the flow: `--generate-chapters` stamps chapter
/// records into an existing container without transcoding,
/// `--use-embedded` carries the source's own chapter metadata through the
/// rebuild, `--split-on-silence` cuts at detected silences, and the
/// default cuts the timeline into fixed lengths.
pub fn run(
    args: &BindArgs,
    chapter_length: u64,
    use_embedded: bool,
    generate_chapters: bool,
    silence: SilenceOpts,
    dry_run: bool,
) -> Result<()> {
    let settings = Settings::load()?;
    let opts = super::job_options(&settings, args)?;
    let mut book = super::parse_book(args, &opts)?;
    if dry_run {
        return super::print_dry_run(&book, &opts);
    }

    let engine = FfmpegEngine::new(opts.verbose_transcode);
    let mut job = JobContext::new(opts)?;
    let src = job.check_for_source_file(&args.source_files_path)?;

    if generate_chapters {
        book.chapters = split_fixed_length(&engine, &[src.clone()], chapter_length)?;
        super::write_meta(&mut job, &mut book)?;

        fs::create_dir_all(&job.output_path)?;
        let final_path = job.output_path.join(&job.output_file);
        engine.bind_chapters(&job.chapters_path(), &src, &final_path)?;

        println!("Wrote {}", final_path.display().to_string().green());
        return job.cleanup();
    }

    if silence.enabled {
        let info = engine.probe(&src)?;
        let markers =
            generate_vol_markers(&engine, &src, silence.min_duration_secs, silence.floor_db)?;
        let ranges = transcode::trim_ranges(&markers, info.duration_ms as f64 / 1000.0);
        book.chapters = from_trim_ranges(&ranges);

        super::write_meta(&mut job, &mut book)?;
        transcode::transcode_with_markers(&engine, &mut job, &src, &markers)?;
        return super::finalize(&engine, job, &book);
    }

    if use_embedded {
        engine.extract_metadata(&src, &job.extracted_chapters_path())?;
        job.external_chapters = true;
    } else {
        book.chapters = split_fixed_length(&engine, &[src.clone()], chapter_length)?;
    }

    // pre-split so the transcode pass can run in parallel
    transcode::split_single_file(&engine, &mut job, &src)?;

    super::finish(&engine, job, &mut book)
}
