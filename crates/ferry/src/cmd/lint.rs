//! Lint command - validate a config file and exit

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ferry_config::Config;

/// Lint command arguments
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Run the lint command
pub fn run(args: LintArgs) -> Result<()> {
    lint(&args.config)?;
    println!("{}: OK", args.config.display());
    Ok(())
}

fn lint(path: &std::path::Path) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("{} is invalid", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[output]\ntype = \"drop\"\n").unwrap();
        assert!(lint(file.path()).is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[output]\ntype = \"cache\"\ntarget = \"missing\"\n",
        )
        .unwrap();

        let err = lint(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown cache 'missing'"));
    }

    #[test]
    fn test_missing_file() {
        assert!(lint(std::path::Path::new("/nonexistent/ferry.toml")).is_err());
    }
}
