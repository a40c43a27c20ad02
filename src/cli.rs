use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audiobinder")]
#[command(about = "CLI tool for binding audio tracks into chaptered m4b audiobooks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Parse and display expected output without converting or binding
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Combine audio files into an m4b audiobook file
    Bind {
        #[command(subcommand)]
        command: BindCommands,
    },
}

/// Flags shared by every bind subcommand
#[derive(Args)]
pub struct BindArgs {
    /// Path to the directory of source files (must match the path pattern
    /// for metadata extraction to work)
    #[arg(short, long)]
    pub source_files_path: PathBuf,

    /// Pattern for metadata picked up via paths (e.g. "%a/%s/%p/%t")
    #[arg(short, long)]
    pub path_pattern: Option<String>,

    /// Output filename, a combination of literal values and tokens
    #[arg(short = 'f', long)]
    pub file_pattern: Option<String>,

    /// Output directory, a combination of literal values and path tokens
    #[arg(short, long)]
    pub output_directory: Option<String>,

    /// Number of concurrent transcode jobs to run
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Location in which to create the scratch directory
    #[arg(long)]
    pub scratch_files_path: Option<PathBuf>,

    /// Show the output of all media engine commands
    #[arg(long)]
    pub verbose_transcode: bool,
}

#[derive(Subcommand)]
pub enum BindCommands {
    /// Bind an audiobook with one chapter per source file
    Files {
        #[command(flatten)]
        args: BindArgs,

        /// Use each file's base name as its chapter title
        #[arg(long, conflicts_with = "use_title_tag")]
        use_filenames: bool,

        /// Use each file's title tag as its chapter title
        #[arg(long)]
        use_title_tag: bool,
    },

    /// Bind an audiobook grouping tracks into chapters by title tag
    FromTags {
        #[command(flatten)]
        args: BindArgs,
    },

    /// Split a single audio file into fixed-length chapters
    SplitChapters {
        #[command(flatten)]
        args: BindArgs,

        /// Chapter length in minutes
        #[arg(short, long, default_value_t = 5)]
        chapter_length: u64,

        /// Use chapter metadata already embedded in the source file
        #[arg(long)]
        use_embedded: bool,

        /// Generate and embed chapters into an existing m4b without transcoding
        #[arg(long)]
        generate_chapters: bool,

        /// Cut at detected silences instead of fixed positions
        #[arg(long, conflicts_with_all = ["use_embedded", "generate_chapters"])]
        split_on_silence: bool,

        /// Minimum silence length, in seconds, to count as a cut point
        #[arg(long, default_value_t = 3.0)]
        silence_duration: f64,

        /// Level in dB below which audio counts as silence
        #[arg(long, default_value_t = -30, allow_hyphen_values = true)]
        silence_floor: i32,
    },

    /// Bind an audiobook using an embedded CUESHEET tag for chapters
    FromCue {
        #[command(flatten)]
        args: BindArgs,
    },

    /// Write tags to an existing audiobook based on the path pattern
    Tag {
        #[command(flatten)]
        args: BindArgs,
    },
}
