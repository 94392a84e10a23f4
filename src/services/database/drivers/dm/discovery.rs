//! Locating the DM ODBC driver library.
//!
//! Candidates are built from an environment lookup and a home directory so the
//! search order can be checked without touching the real environment.

use std::path::{Path, PathBuf};

/// Explicit path to the driver library.
pub const DRIVER_ENV: &str = "DM_ODBC_DRIVER";
/// DM installation root; the driver lives in its `bin` directory.
pub const HOME_ENV: &str = "DM_HOME";

#[cfg(target_os = "windows")]
pub const LIBRARY_NAME: &str = "dodbc.dll";
#[cfg(target_os = "macos")]
pub const LIBRARY_NAME: &str = "libdodbc.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const LIBRARY_NAME: &str = "libdodbc.so";

/// Ordered driver candidates, most specific first.
pub fn driver_candidates<F>(lookup: F, home: Option<PathBuf>) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut candidates = Vec::new();

    if let Some(explicit) = non_empty(DRIVER_ENV) {
        candidates.push(PathBuf::from(explicit));
    }
    if let Some(dm_home) = non_empty(HOME_ENV) {
        candidates.push(Path::new(&dm_home).join("bin").join(LIBRARY_NAME));
    }

    candidates.push(Path::new("/opt/dmdbms/bin").join(LIBRARY_NAME));
    if let Some(home) = home {
        candidates.push(home.join("dmdbms").join("bin").join(LIBRARY_NAME));
    }
    candidates.push(Path::new("/home/dmdba/dmdbms/bin").join(LIBRARY_NAME));
    candidates.push(Path::new(r"C:\dmdbms\bin").join(LIBRARY_NAME));

    let program_files =
        non_empty("PROGRAMFILES").unwrap_or_else(|| r"C:\Program Files".to_string());
    candidates.push(
        Path::new(&program_files)
            .join("dmdbms")
            .join("bin")
            .join(LIBRARY_NAME),
    );

    candidates
}

/// First candidate accepted by `exists`.
pub fn find_driver<F>(candidates: &[PathBuf], exists: F) -> Option<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    candidates.iter().find(|p| exists(p)).cloned()
}

/// Search the real environment and filesystem.
pub fn discover() -> Option<PathBuf> {
    let candidates = driver_candidates(|key| std::env::var(key).ok(), dirs::home_dir());
    find_driver(&candidates, Path::is_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_driver_comes_first() {
        let candidates = driver_candidates(
            lookup(&[(DRIVER_ENV, "/custom/libdodbc.so"), (HOME_ENV, "/dm")]),
            Some(PathBuf::from("/home/alice")),
        );
        assert_eq!(candidates[0], PathBuf::from("/custom/libdodbc.so"));
        assert_eq!(candidates[1], Path::new("/dm").join("bin").join(LIBRARY_NAME));
        assert_eq!(
            candidates[2],
            Path::new("/opt/dmdbms/bin").join(LIBRARY_NAME)
        );
        assert_eq!(
            candidates[3],
            Path::new("/home/alice").join("dmdbms").join("bin").join(LIBRARY_NAME)
        );
    }

    #[test]
    fn test_blank_variables_are_ignored() {
        let candidates = driver_candidates(lookup(&[(DRIVER_ENV, "  ")]), None);
        assert_eq!(candidates[0], Path::new("/opt/dmdbms/bin").join(LIBRARY_NAME));
        assert_eq!(candidates.len(), 4);
    }

    #[test]
    fn test_find_driver_respects_order() {
        let candidates = vec![
            PathBuf::from("/a/libdodbc.so"),
            PathBuf::from("/b/libdodbc.so"),
            PathBuf::from("/c/libdodbc.so"),
        ];
        let found = find_driver(&candidates, |p| p.starts_with("/b") || p.starts_with("/c"));
        assert_eq!(found, Some(PathBuf::from("/b/libdodbc.so")));
        assert_eq!(find_driver(&candidates, |_| false), None);
    }

    #[test]
    fn test_discover_finds_driver_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let driver = dir.path().join(LIBRARY_NAME);
        std::fs::write(&driver, b"").unwrap();

        let candidates = driver_candidates(
            lookup(&[(DRIVER_ENV, driver.to_str().unwrap())]),
            None,
        );
        assert_eq!(find_driver(&candidates, Path::is_file), Some(driver));
    }
}
