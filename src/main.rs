mod book;
mod chapters;
mod cli;
mod commands;
mod config;
mod job;
mod media;
mod meta;
mod pattern;
mod silence;
mod transcode;

use anyhow::Result;
use clap::Parser;
use cli::{BindCommands, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Bind { command } => match command {
            BindCommands::Files {
                args,
                use_filenames,
                use_title_tag,
            } => {
                commands::bind_files::run(&args, use_filenames, use_title_tag, cli.dry_run)?;
            }
            BindCommands::FromTags { args } => {
                commands::bind_from_tags::run(&args, cli.dry_run)?;
            }
            BindCommands::SplitChapters {
                args,
                chapter_length,
                use_embedded,
                generate_chapters,
                split_on_silence,
                silence_duration,
                silence_floor,
            } => {
                let silence = commands::split_chapters::SilenceOpts {
                    enabled: split_on_silence,
                    min_duration_secs: silence_duration,
                    floor_db: silence_floor,
                };
                commands::split_chapters::run(
                    &args,
                    chapter_length,
                    use_embedded,
                    generate_chapters,
                    silence,
                    cli.dry_run,
                )?;
            }
            BindCommands::FromCue { args } => {
                commands::from_cue::run(&args, cli.dry_run)?;
            }
            BindCommands::Tag { args } => {
                commands::tag::run(&args, cli.dry_run)?;
            }
        },
    }

    Ok(())
}
