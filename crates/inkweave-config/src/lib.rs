use inkweave_engine::cache::{DEFAULT_NUMBERING_DEPTH, ProjectMode};
use inkweave_engine::{
    FsPersistence, LanguageProfile, LanguageTable, Processor, Project, ProjectState,
};
use relative_path::RelativePathBuf;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings for one served project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory every project path is relative to.
    pub project_root: PathBuf,
    /// Table-of-contents root. Without one the project is served in single-file mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toc_file: Option<RelativePathBuf>,
    #[serde(default = "default_numbering_depth")]
    pub numbering_depth: usize,
    /// Extra language profiles; a profile named like a built-in one replaces it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<LanguageProfile>,
}

fn default_numbering_depth() -> usize {
    DEFAULT_NUMBERING_DEPTH
}

impl Config {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            toc_file: None,
            numbering_depth: DEFAULT_NUMBERING_DEPTH,
            languages: Vec::new(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the project root
        config.project_root =
            Self::expand_path(&config.project_root).unwrap_or(config.project_root);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/inkweave");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// The initial cache state for this project.
    pub fn project_state(&self) -> ProjectState {
        let mode = match &self.toc_file {
            Some(toc_path) => ProjectMode::Project {
                toc_path: toc_path.clone(),
            },
            None => ProjectMode::SingleFile,
        };
        ProjectState::new(mode, self.numbering_depth)
    }

    /// Built-in profiles extended with the configured ones.
    pub fn language_table(&self) -> LanguageTable {
        let mut table = LanguageTable::builtin();
        for profile in &self.languages {
            table.insert(profile.clone());
        }
        table
    }

    /// A project serving files under `project_root`.
    pub fn open_project(&self) -> Project<FsPersistence> {
        Project::new(
            FsPersistence::new(&self.project_root),
            self.project_state(),
            Processor::new(self.language_table(), Default::default()),
        )
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkweave_engine::models::ProfileKind;
    use relative_path::RelativePath;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/inkweave/config.toml"));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = toml::from_str(r#"project_root = "/srv/book""#).unwrap();

        assert_eq!(config, Config::new("/srv/book"));
        assert_eq!(config.numbering_depth, 4);
        assert!(!config.project_state().is_project());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            project_root: PathBuf::from("/tmp/test-project"),
            toc_file: Some(RelativePathBuf::from("toc.md")),
            numbering_depth: 2,
            languages: vec![LanguageProfile::source("ruby", &["rb"]).with_inline("#")],
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_project_state_from_toc_file() {
        let mut config = Config::new("/srv/book");
        config.toc_file = Some(RelativePathBuf::from("docs/toc.md"));
        config.numbering_depth = 3;

        let state = config.project_state();

        assert!(state.is_project());
        assert_eq!(state.toc_path(), Some(RelativePath::new("docs/toc.md")));
        assert_eq!(state.numbering_depth(), 3);
    }

    #[test]
    fn test_language_table_overrides_builtin() {
        let config: Config = toml::from_str(
            r###"
project_root = "/srv/book"

[[languages]]
name = "python"
extensions = ["py"]
kind = "Source"
inline_comments = ["##"]

[[languages]]
name = "ocaml"
extensions = ["ml", "mli"]
kind = "Source"
block_comments = [{ open = "(*", close = "*)" }]
"###,
        )
        .unwrap();

        let table = config.language_table();

        let python = table.by_name("python").unwrap();
        assert_eq!(python.inline_comments, vec!["##".to_string()]);
        assert_eq!(table.profiles().filter(|p| p.name == "python").count(), 1);
        let ocaml = table.for_path(RelativePath::new("lib/parser.mli")).unwrap();
        assert_eq!(ocaml.name, "ocaml");
        assert_eq!(ocaml.kind, ProfileKind::Source);
        assert_eq!(ocaml.block_close_for("(*"), Some("*)"));
        assert!(table.by_name("rust").is_some());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("INKWEAVE_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$INKWEAVE_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/subdir")));

        unsafe {
            env::remove_var("INKWEAVE_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_relative_path() {
        let path = PathBuf::from("relative/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_config_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "numbering_depth = \"deep\"\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        match err {
            ConfigError::ConfigParseError { config_path, .. } => {
                assert_eq!(config_path, config_file)
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::new("/tmp/test-project");
        test_config.toc_file = Some(RelativePathBuf::from("toc.md"));

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_open_project_reads_from_root() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("main.py"), "# Hello\nx = 1\n").unwrap();
        let config = Config::new(temp_dir.path());

        let project = config.open_project();
        let outcome = project.load(RelativePath::new("main.py"));

        let page = outcome.rendered().expect("python file renders");
        assert_eq!(page.language, "python");
        assert_eq!(page.blocks.len(), 2);
    }
}
