use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File extensions accepted as source tracks. The same allowlist gates the
/// `%f` path-pattern token.
pub const AUDIO_EXTENSIONS: &[&str] = &["aac", "flac", "m4a", "m4b", "mp4", "mp3", "ogg", "opus"];

/// Extension of the bound output container
pub const M4B_EXT: &str = "m4b";

/// Application configuration loaded from ~/.config/audiobinder/config.toml,
/// with environment variables layered on top and CLI flags on top of that
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Number of concurrent transcode jobs
    pub jobs: Option<usize>,

    /// Default output directory for bound books
    pub output_file_dest: Option<String>,

    /// Template for the output filename
    pub output_file_pattern: Option<String>,

    /// Template for the output directory structure
    pub output_path_pattern: Option<String>,

    /// Template for metadata extraction from source paths
    pub path_pattern: Option<String>,

    /// Location in which to create per-job scratch directories
    pub scratch_files_path: Option<PathBuf>,
}

impl Settings {
    /// Load configuration from the default path and apply env overrides
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::config_path()?)?;
        settings.apply_env();
        Ok(settings)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("audiobinder").join("config.toml"))
    }

    /// Layer environment variables over file-based values
    pub fn apply_env(&mut self) {
        if let Some(jobs) = env_var("JOBS").and_then(|v| v.parse().ok()) {
            self.jobs = Some(jobs);
        }
        if let Some(dest) = env_var("OUTPUT_FILE_DEST") {
            self.output_file_dest = Some(dest);
        }
        if let Some(pattern) = env_var("OUTPUT_FILE_PATTERN") {
            self.output_file_pattern = Some(pattern);
        }
        if let Some(pattern) = env_var("OUTPUT_PATH_PATTERN") {
            self.output_path_pattern = Some(pattern);
        }
        if let Some(pattern) = env_var("PATH_PATTERN") {
            self.path_pattern = Some(pattern);
        }
        if let Some(path) = env_var("SCRATCH_FILES_PATH") {
            self.scratch_files_path = Some(PathBuf::from(path));
        }
    }

    /// Get the path pattern, with CLI override taking precedence
    pub fn path_pattern(&self, cli_override: Option<&str>) -> Option<String> {
        cli_override
            .map(String::from)
            .or_else(|| self.path_pattern.clone())
    }

    /// Get the output directory, with CLI override taking precedence
    pub fn output_directory(&self, cli_override: Option<&str>) -> Option<String> {
        cli_override
            .map(String::from)
            .or_else(|| self.output_path_pattern.clone())
            .or_else(|| self.output_file_dest.clone())
    }

    /// Get the output file pattern, with CLI override taking precedence
    pub fn file_pattern(&self, cli_override: Option<&str>) -> Option<String> {
        cli_override
            .map(String::from)
            .or_else(|| self.output_file_pattern.clone())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Check whether a file's extension is on the audio allowlist
pub fn is_audio_file(path: &std::path::Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let settings = Settings::load_from(&path).unwrap();
        assert!(settings.path_pattern.is_none());
        assert!(settings.jobs.is_none());
    }

    #[test]
    fn test_load_valid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
jobs = 4
path_pattern = "%a/%t"
output_path_pattern = "library/%a/%t"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.jobs, Some(4));
        assert_eq!(settings.path_pattern, Some("%a/%t".to_string()));
        assert_eq!(
            settings.output_path_pattern,
            Some("library/%a/%t".to_string())
        );
    }

    #[test]
    fn test_cli_override() {
        let settings = Settings {
            path_pattern: Some("%a/%t".to_string()),
            output_file_dest: Some("/default".to_string()),
            ..Default::default()
        };

        assert_eq!(
            settings.path_pattern(Some("%g/%a/%t")),
            Some("%g/%a/%t".to_string())
        );
        assert_eq!(settings.path_pattern(None), Some("%a/%t".to_string()));

        // output_path_pattern is preferred over output_file_dest
        assert_eq!(
            settings.output_directory(None),
            Some("/default".to_string())
        );
        assert_eq!(
            settings.output_directory(Some("/cli")),
            Some("/cli".to_string())
        );
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("/books/track01.mp3")));
        assert!(is_audio_file(Path::new("/books/track01.M4A")));
        assert!(is_audio_file(Path::new("book.opus")));
        assert!(!is_audio_file(Path::new("/books/cover.jpg")));
        assert!(!is_audio_file(Path::new("/books/notes")));
    }
}
