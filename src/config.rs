use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::report::{ReportOptions, DEFAULT_REPORT_FILE};

/// Default coverage input when none is given
pub const DEFAULT_INPUT_PATTERN: &str = "coverage/coverage*.json";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSection {
    /// Coverage JSON files or glob patterns
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Directory the report is written to (default: current directory)
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Report file name (default: jacoco-coverage.xml)
    #[serde(default)]
    pub file: Option<String>,
    /// Value of `<report name>` (default: current directory)
    #[serde(default)]
    pub project_root: Option<PathBuf>,
    /// Value of `<sessioninfo id>` (default: host name)
    #[serde(default)]
    pub host: Option<String>,
    /// Write through the tokio writer
    #[serde(default)]
    pub async_write: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref file) = self.report.file {
            if file.trim().is_empty() {
                anyhow::bail!("report.file must not be empty");
            }
            if file.contains(['/', '\\']) {
                anyhow::bail!(
                    "report.file '{}' must be a file name; use report.dir for the directory",
                    file
                );
            }
        }
        if let Some(ref host) = self.report.host {
            if host.trim().is_empty() {
                anyhow::bail!("report.host must not be empty");
            }
        }
        Ok(())
    }

    /// Resolve report options, relative paths taken from `cwd`
    pub fn report_options(&self, cwd: &Path) -> ReportOptions {
        let section = &self.report;
        let project_root = section
            .project_root
            .as_ref()
            .map(|p| cwd.join(p))
            .unwrap_or_else(|| cwd.to_path_buf());

        ReportOptions {
            dir: section
                .dir
                .as_ref()
                .map(|d| cwd.join(d))
                .unwrap_or_else(|| cwd.to_path_buf()),
            file: section
                .file
                .clone()
                .unwrap_or_else(|| DEFAULT_REPORT_FILE.to_string()),
            project_root: project_root.display().to_string(),
            host: section.host.clone().unwrap_or_else(host_identity),
        }
    }

    /// Coverage inputs, falling back to the default pattern
    pub fn inputs(&self) -> Vec<String> {
        if self.report.inputs.is_empty() {
            vec![DEFAULT_INPUT_PATTERN.to_string()]
        } else {
            self.report.inputs.clone()
        }
    }
}

/// Name of this machine, used as the session id
pub fn host_identity() -> String {
    let name = gethostname::gethostname();
    let name = name.to_string_lossy();
    let name = name.trim();
    if name.is_empty() {
        "localhost".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[report]
inputs = ["coverage/*.json"]
dir = "build/reports"
file = "coverage.xml"
host = "ci-runner"
async_write = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.report.async_write);

        let options = config.report_options(Path::new("/work"));
        assert_eq!(options.dir, PathBuf::from("/work/build/reports"));
        assert_eq!(options.file, "coverage.xml");
        assert_eq!(options.project_root, "/work");
        assert_eq!(options.host, "ci-runner");
        assert_eq!(config.inputs(), vec!["coverage/*.json"]);
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        let options = config.report_options(Path::new("/work"));

        assert_eq!(options.dir, PathBuf::from("/work"));
        assert_eq!(options.file, DEFAULT_REPORT_FILE);
        assert!(!options.host.is_empty());
        assert_eq!(config.inputs(), vec![DEFAULT_INPUT_PATTERN]);
    }

    #[test]
    fn test_host_identity_matches_system_name() {
        let host = host_identity();
        assert!(!host.is_empty());
        assert_eq!(host, host.trim());

        let system = gethostname::gethostname();
        let system = system.to_string_lossy();
        if !system.trim().is_empty() {
            assert_eq!(host, system.trim());
        }
    }

    #[test]
    fn test_file_with_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jacoco.toml");
        fs::write(&path, "[report]\nfile = \"out/report.xml\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("must be a file name"));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
