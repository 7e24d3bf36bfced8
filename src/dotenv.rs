//! Loads a workspace `.env` file into the environment table at startup.
//!
//! Variables already present in the table always win; the file only fills
//! gaps. Format: `KEY=VALUE` per line, `#` comments,
//! no quoting or interpolation.

use crate::env::EnvTable;
use std::io;
use std::path::Path;

pub const ENV_FILE_NAME: &str = ".env";

/// What a load attempt did to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvFileReport {
    /// No file at the given path.
    Missing,
    Loaded {
        /// Keys written into the table.
        applied: Vec<String>,
        /// Keys skipped because the table already had a value.
        preserved: Vec<String>,
    },
}

/// Read `path` and apply its entries to `table` without overwriting.
///
/// A missing file is not an error. Any other I/O failure is returned so the
/// caller can log it and carry on.
pub fn load_env_file(path: &Path, table: &dyn EnvTable) -> io::Result<EnvFileReport> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(EnvFileReport::Missing),
        Err(e) => return Err(e),
    };

    let mut applied = Vec::new();
    let mut preserved = Vec::new();

    for (key, value) in contents.lines().filter_map(parse_line) {
        if table.contains(key) {
            preserved.push(key.to_string());
            continue;
        }
        table.set(key, value);
        applied.push(key.to_string());
    }

    Ok(EnvFileReport::Loaded { applied, preserved })
}

/// Parse one line into a `(key, value)` pair.
///
/// Returns `None` for blank lines, comments and lines with an empty key.
pub fn parse_line(raw: &str) -> Option<(&str, &str)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=').unwrap_or((line, ""));
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    Some((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnv;
    use std::fs;

    #[test]
    fn parse_line_handles_comments_and_separators() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# FOO=bar"), None);
        assert_eq!(parse_line("=value"), None);
        assert_eq!(parse_line("  =value"), None);
        assert_eq!(parse_line(" FOO = bar "), Some(("FOO", "bar")));
        assert_eq!(parse_line("URL=postgres://u:p@h/db?a=b"), Some(("URL", "postgres://u:p@h/db?a=b")));
        assert_eq!(parse_line("BARE"), Some(("BARE", "")));
        assert_eq!(parse_line("CRLF=yes\r"), Some(("CRLF", "yes")));
    }

    #[test]
    fn missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let table = MemoryEnv::new();

        let report = load_env_file(&dir.path().join(ENV_FILE_NAME), &table).unwrap();

        assert_eq!(report, EnvFileReport::Missing);
    }

    #[test]
    fn existing_values_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENV_FILE_NAME);
        fs::write(
            &path,
            "# workspace defaults\r\nWORKSPACE_SLUG=from-file\r\n\r\nTOKEN=a=b=c\nEMPTY=\n=orphan\n",
        )
        .unwrap();
        let table = MemoryEnv::with_vars([("WORKSPACE_SLUG", "preset")]);

        let report = load_env_file(&path, &table).unwrap();

        assert_eq!(
            report,
            EnvFileReport::Loaded {
                applied: vec!["TOKEN".to_string(), "EMPTY".to_string()],
                preserved: vec!["WORKSPACE_SLUG".to_string()],
            }
        );
        assert_eq!(table.get("WORKSPACE_SLUG").as_deref(), Some("preset"));
        assert_eq!(table.get("TOKEN").as_deref(), Some("a=b=c"));
        assert_eq!(table.get("EMPTY").as_deref(), Some(""));
    }

    #[test]
    fn first_occurrence_wins_within_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENV_FILE_NAME);
        fs::write(&path, "DUP=first\nDUP=second\n").unwrap();
        let table = MemoryEnv::new();

        load_env_file(&path, &table).unwrap();

        assert_eq!(table.get("DUP").as_deref(), Some("first"));
    }

    #[test]
    fn unreadable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENV_FILE_NAME);
        fs::create_dir(&path).unwrap();
        let table = MemoryEnv::new();

        assert!(load_env_file(&path, &table).is_err());
    }
}
