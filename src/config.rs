use crate::dotenv::ENV_FILE_NAME;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Startup settings resolved before anything touches the environment table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Working directory the workspace identity is derived from.
    pub workdir: PathBuf,
    /// `.env` file applied during bootstrap.
    pub env_file: PathBuf,
}

impl Config {
    pub fn for_workdir(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        let env_file = workdir.join(ENV_FILE_NAME);
        Self { workdir, env_file }
    }

    /// Settings for the current process.
    pub fn from_process() -> anyhow::Result<Self> {
        let workdir = std::env::current_dir().context("failed to resolve the current working directory")?;
        Ok(Self::for_workdir(workdir))
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_file_lives_in_workdir() {
        let config = Config::for_workdir("/srv/app");

        assert_eq!(config.workdir(), Path::new("/srv/app"));
        assert_eq!(config.env_file, PathBuf::from("/srv/app/.env"));
    }
}
