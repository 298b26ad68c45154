use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mirror_core::RewriteMode;
use serde::Deserialize;

use crate::fetch::FetchSettings;

const DEFAULT_GENERIC_TITLE: &str = "ultraDocumentBody";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(String),
}

#[derive(Debug, Clone)]
pub struct MirrorSettings {
    pub output_root: PathBuf,
    /// Capture rich-text documents as standalone HTML pages.
    pub capture_pages: bool,
    pub rewrite_mode: RewriteMode,
    /// Simultaneous resource downloads, and per-node fetch fan-out.
    pub fetch_concurrency: usize,
    /// Sibling nodes visited at once.
    pub node_concurrency: usize,
    pub run_deadline: Option<Duration>,
    /// Titles replaced by the parent's title when naming a captured page.
    pub generic_titles: Vec<String>,
    pub stylesheets: Vec<PathBuf>,
    pub fetch: FetchSettings,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self::default_with_output(PathBuf::from("mirror"))
    }
}

impl MirrorSettings {
    pub fn default_with_output(output_root: PathBuf) -> Self {
        Self {
            output_root,
            capture_pages: false,
            rewrite_mode: RewriteMode::LocalLinks,
            fetch_concurrency: 8,
            node_concurrency: 4,
            run_deadline: None,
            generic_titles: vec![DEFAULT_GENERIC_TITLE.to_string()],
            stylesheets: Vec::new(),
            fetch: FetchSettings::default(),
        }
    }

    /// Parse a RON settings file; absent fields keep their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let file: SettingsFile =
            ron::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Ok(file.into_settings())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn is_generic_title(&self, title: &str) -> bool {
        let title = title.trim();
        self.generic_titles
            .iter()
            .any(|generic| generic.trim().eq_ignore_ascii_case(title))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SettingsFile {
    output_root: PathBuf,
    capture_pages: bool,
    rewrite_mode: RewriteMode,
    fetch_concurrency: usize,
    node_concurrency: usize,
    run_deadline_secs: Option<u64>,
    generic_titles: Vec<String>,
    stylesheets: Vec<PathBuf>,
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
    redirect_limit: usize,
    max_bytes: u64,
    user_agent: Option<String>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        let settings = MirrorSettings::default();
        Self {
            output_root: settings.output_root,
            capture_pages: settings.capture_pages,
            rewrite_mode: settings.rewrite_mode,
            fetch_concurrency: settings.fetch_concurrency,
            node_concurrency: settings.node_concurrency,
            run_deadline_secs: None,
            generic_titles: settings.generic_titles,
            stylesheets: settings.stylesheets,
            connect_timeout_secs: settings.fetch.connect_timeout.as_secs(),
            request_timeout_secs: settings.fetch.request_timeout.as_secs(),
            redirect_limit: settings.fetch.redirect_limit,
            max_bytes: settings.fetch.max_bytes,
            user_agent: settings.fetch.user_agent,
        }
    }
}

impl SettingsFile {
    fn into_settings(self) -> MirrorSettings {
        MirrorSettings {
            output_root: self.output_root,
            capture_pages: self.capture_pages,
            rewrite_mode: self.rewrite_mode,
            fetch_concurrency: self.fetch_concurrency.max(1),
            node_concurrency: self.node_concurrency.max(1),
            run_deadline: self.run_deadline_secs.map(Duration::from_secs),
            generic_titles: self.generic_titles,
            stylesheets: self.stylesheets,
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                redirect_limit: self.redirect_limit,
                max_bytes: self.max_bytes,
                user_agent: self.user_agent,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use mirror_core::RewriteMode;

    use super::MirrorSettings;

    #[test]
    fn empty_file_yields_defaults() {
        let settings = MirrorSettings::from_ron_str("()").unwrap();
        assert_eq!(settings.output_root, PathBuf::from("mirror"));
        assert!(!settings.capture_pages);
        assert_eq!(settings.rewrite_mode, RewriteMode::LocalLinks);
        assert_eq!(settings.fetch_concurrency, 8);
        assert_eq!(settings.fetch.request_timeout, Duration::from_secs(30));
        assert!(settings.is_generic_title("ultraDocumentBody"));
    }

    #[test]
    fn fields_override_defaults_and_concurrency_is_clamped() {
        let text = r#"(
            output_root: "out",
            capture_pages: true,
            rewrite_mode: InlineEmbed,
            fetch_concurrency: 0,
            run_deadline_secs: Some(600),
            request_timeout_secs: 5,
        )"#;
        let settings = MirrorSettings::from_ron_str(text).unwrap();
        assert_eq!(settings.output_root, PathBuf::from("out"));
        assert!(settings.capture_pages);
        assert_eq!(settings.rewrite_mode, RewriteMode::InlineEmbed);
        assert_eq!(settings.fetch_concurrency, 1);
        assert_eq!(settings.node_concurrency, 4);
        assert_eq!(settings.run_deadline, Some(Duration::from_secs(600)));
        assert_eq!(settings.fetch.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        assert!(MirrorSettings::from_ron_str("(capture_pages: \"yes\")").is_err());
    }
}
