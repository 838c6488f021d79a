use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::Error;

/// File extensions compiled as Sass sources.
const SASS_EXTENSIONS: [&str; 2] = ["scss", "sass"];

/// Partials start with an underscore and are only ever imported.
pub fn is_partial(name: &str) -> bool {
    name.starts_with('_')
}

pub fn is_sass_source(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| SASS_EXTENSIONS.contains(&ext))
}

/// Swap everything after the last `.` for `css`.
///
/// Names without a `.` have no CSS counterpart and yield `None`.
pub fn change_suffix(name: &str) -> Option<String> {
    name.rfind('.').map(|dot| format!("{}.css", &name[..dot]))
}

/// List the non-partial Sass files in `dir`, which have to be recompiled
/// when the partial `changed` is modified.
///
/// # Errors
///
/// Returns [`Error::ReadDir`] if the directory cannot be listed and
/// [`Error::NoNonPartial`] if it contains no non-partial Sass file.
pub fn resolve_dependents(dir: &Path, changed: &str) -> Result<Vec<PathBuf>, Error> {
    tracing::debug!(partial = changed, dir = %dir.display(), "resolving dependents");
    let read_dir_err = |e| Error::ReadDir(dir.to_path_buf(), e);

    let sources = SASS_EXTENSIONS
        .iter()
        .map(|ext| glob::Pattern::new(&format!("*.{ext}")))
        .collect::<Result<Vec<_>, _>>()?;

    let mut dependents = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            tracing::debug!(entry = %entry.path().display(), "skipping non UTF-8 file name");
            continue;
        };
        if is_partial(name) || !sources.iter().any(|pattern| pattern.matches(name)) {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            dependents.push(path);
        }
    }

    if dependents.is_empty() {
        return Err(Error::NoNonPartial(dir.to_path_buf()));
    }
    Ok(dependents)
}
