//! Demo discovery: every `<name>.<suffix>` file directly inside the demo directory is a
//! demo, minus the names the active platform excludes.

use crate::error::{CoverageError, Result};
use crate::models::DemoUnit;
use camino::Utf8Path;
use std::collections::BTreeSet;
use std::fs;

/// List the demos in `demo_dir`, sorted by name.
///
/// # Arguments
/// * `demo_dir` - Flat directory of demo sources; subdirectories are not searched
/// * `source_suffix` - Source extension without the dot (e.g. `c`)
/// * `excluded` - Demo base names to leave out
///
/// # Errors
/// Returns a filesystem error if the directory cannot be listed.
pub fn discover_demos(
    demo_dir: &Utf8Path,
    source_suffix: &str,
    excluded: &BTreeSet<String>,
) -> Result<Vec<DemoUnit>> {
    let suffix = format!(".{}", source_suffix);
    let entries =
        fs::read_dir(demo_dir).map_err(|e| CoverageError::fs("list demos in", demo_dir, e))?;

    let mut demos = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| CoverageError::fs("list demos in", demo_dir, e))?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!("Skipping non UTF-8 file name in {}: {:?}", demo_dir, path);
            continue;
        };

        let Some(base) = file_name.strip_suffix(&suffix) else {
            continue;
        };

        if base.is_empty() {
            continue;
        }

        if excluded.contains(base) {
            tracing::debug!("Excluding demo {}", base);
            continue;
        }

        demos.push(DemoUnit::new(base));
    }

    demos.sort();

    tracing::info!(
        "Discovered {} demos in {} ({} excluded by platform)",
        demos.len(),
        demo_dir,
        excluded.len()
    );

    Ok(demos)
}

/// Restrict `demos` to the names in `only`, keeping discovery order.
///
/// An empty `only` keeps every demo. Naming a demo that was not discovered is an error,
/// so a typo or an excluded demo never silently produces an empty run.
pub fn select_demos<S: AsRef<str>>(demos: Vec<DemoUnit>, only: &[S]) -> Result<Vec<DemoUnit>> {
    if only.is_empty() {
        return Ok(demos);
    }

    for name in only {
        if !demos.iter().any(|d| d.name() == name.as_ref()) {
            return Err(CoverageError::UnknownDemo(name.as_ref().to_string()));
        }
    }

    Ok(demos
        .into_iter()
        .filter(|d| only.iter().any(|name| name.as_ref() == d.name()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn demo_dir(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        for file in files {
            fs::write(path.join(file), "int main(void) { return 0; }\n").unwrap();
        }
        (temp_dir, path)
    }

    fn names(demos: &[DemoUnit]) -> Vec<&str> {
        demos.iter().map(DemoUnit::name).collect()
    }

    #[test]
    fn test_suffix_and_exclusion_filters() {
        let (_temp_dir, dir) = demo_dir(&["a.c", "b.c", "c.txt"]);
        let excluded: BTreeSet<String> = ["b".to_string()].into();

        let demos = discover_demos(&dir, "c", &excluded).unwrap();
        assert_eq!(names(&demos), vec!["a"]);
    }

    #[test]
    fn test_discovery_is_not_recursive() {
        let (_temp_dir, dir) = demo_dir(&["top.c"]);
        fs::create_dir(dir.join("nested.c")).unwrap();
        fs::create_dir(dir.join("sub")).unwrap();
        fs::write(dir.join("sub").join("inner.c"), "").unwrap();

        let demos = discover_demos(&dir, "c", &BTreeSet::new()).unwrap();
        assert_eq!(names(&demos), vec!["top"]);
    }

    #[test]
    fn test_results_sorted() {
        let (_temp_dir, dir) = demo_dir(&["yielding.c", "exit.c", "message.c"]);
        let demos = discover_demos(&dir, "c", &BTreeSet::new()).unwrap();
        assert_eq!(names(&demos), vec!["exit", "message", "yielding"]);
    }

    #[test]
    fn test_suffix_must_follow_dot() {
        let (_temp_dir, dir) = demo_dir(&["abc", "lib.cc", "x.c"]);
        let demos = discover_demos(&dir, "c", &BTreeSet::new()).unwrap();
        assert_eq!(names(&demos), vec!["x"]);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let err = discover_demos(Utf8Path::new("/nonexistent/demos"), "c", &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, CoverageError::Filesystem { .. }));
    }

    #[test]
    fn test_select_demos() {
        let demos = vec![
            DemoUnit::new("a"),
            DemoUnit::new("b"),
            DemoUnit::new("c"),
        ];

        let all = select_demos(demos.clone(), &[] as &[&str]).unwrap();
        assert_eq!(all.len(), 3);

        let subset = select_demos(demos.clone(), &["c", "a"]).unwrap();
        assert_eq!(names(&subset), vec!["a", "c"]);

        let err = select_demos(demos, &["zzz"]).unwrap_err();
        assert!(matches!(err, CoverageError::UnknownDemo(name) if name == "zzz"));
    }
}
