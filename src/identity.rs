use crate::env::{EnvTable, PWD, WORKSPACE_SLUG};
use std::path::Path;

/// Which identity variables had to be derived from the working directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdentityDefaults {
    pub workspace_slug: Option<String>,
    pub pwd: Option<String>,
}

/// Make sure `WORKSPACE_SLUG` and `PWD` are set, deriving them from `workdir`.
///
/// Values already in the table are left alone, so calling this twice is a no-op
/// the second time.
pub fn ensure_identity(table: &dyn EnvTable, workdir: &Path) -> IdentityDefaults {
    let mut filled = IdentityDefaults::default();

    if !table.contains(WORKSPACE_SLUG) {
        let slug = workspace_slug(workdir);
        table.set(WORKSPACE_SLUG, &slug);
        filled.workspace_slug = Some(slug);
    }

    if !table.contains(PWD) {
        let pwd = workdir.to_string_lossy().into_owned();
        table.set(PWD, &pwd);
        filled.pwd = Some(pwd);
    }

    filled
}

/// Base name of `workdir`, or the whole path when it has none (e.g. `/`).
pub fn workspace_slug(workdir: &Path) -> String {
    workdir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| workdir.to_string_lossy().into_owned())
}
