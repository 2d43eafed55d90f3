// src/config.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rev-sidebar",
    version,
    about = "Browse a file in a git repository next to the commits that touched it"
)]
pub struct Config {
    #[arg(short, long, default_value = ".", help = "Path to the repository")]
    pub repo: PathBuf,

    #[arg(short, long, help = "Repository name shown in locations (defaults to the directory name)")]
    pub name: Option<String>,

    #[arg(long, help = "Revision to open (branch, tag or commit); HEAD when omitted")]
    pub rev: Option<String>,

    #[arg(index = 1, help = "File to browse, relative to the repository root")]
    pub path: String,

    #[arg(long, help = "Write logs here; RUST_LOG sets the filter")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn repo_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.repo
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "repo".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_and_options() {
        let config = Config::parse_from(["rev-sidebar", "--rev", "v1.0", "-n", "acme/app", "src/lib.rs"]);
        assert_eq!(config.path, "src/lib.rs");
        assert_eq!(config.rev.as_deref(), Some("v1.0"));
        assert_eq!(config.repo_name(), "acme/app");
        assert_eq!(config.repo, PathBuf::from("."));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn path_is_required() {
        assert!(Config::try_parse_from(["rev-sidebar"]).is_err());
    }
}
