//! Integration tests for resolving build settings from a CMake cache file

use camino::Utf8PathBuf;
use democov::models::DEFAULT_REQUIRED_SETTINGS;
use democov::services::resolve_build_config;
use democov::CoverageError;
use std::fs;
use tempfile::TempDir;

const CACHE: &str = "\
# This is the CMakeCache file.
# For build in directory: /work/build

########################
# EXTERNAL cache entries
########################

//Platform to build for
BUILD_PLATFORM:STRING=arm_linux

//Enable coverage instrumentation
COVERAGE:BOOL=ON

LTO:BOOL=ON

//Optimisation level
OPT_LEVEL:STRING=2

UBSAN:BOOL=OFF

CMAKE_C_COMPILER:FILEPATH=/usr/bin/arm-linux-gnueabihf-gcc
";

fn write_cache(contents: &str) -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().join("CMakeCache.txt")).unwrap();
    fs::write(&path, contents).unwrap();
    (temp_dir, path)
}

#[test]
fn test_resolves_standard_settings_in_request_order() {
    let (_temp_dir, cache) = write_cache(CACHE);

    let config = resolve_build_config(&cache, &DEFAULT_REQUIRED_SETTINGS).unwrap();

    assert_eq!(config.values(), vec!["arm_linux", "2", "OFF", "ON"]);
    assert_eq!(config.platform(), Some("arm_linux"));
    assert_eq!(
        config.suite_name().as_deref(),
        Some("arm_linux_O2_UBSAN_OFF_LTO_ON")
    );
}

#[test]
fn test_only_requested_names_are_kept() {
    let (_temp_dir, cache) = write_cache(CACHE);

    let config = resolve_build_config(&cache, &["COVERAGE"]).unwrap();

    assert_eq!(config.len(), 1);
    assert_eq!(config.get("COVERAGE"), Some("ON"));
    assert_eq!(config.get("LTO"), None);
    assert_eq!(config.suite_name(), None);
}

#[test]
fn test_missing_setting_names_the_cache_and_setting() {
    let (_temp_dir, cache) = write_cache("BUILD_PLATFORM:STRING=linux\nOPT_LEVEL:STRING=0\n");

    let err = resolve_build_config(&cache, &DEFAULT_REQUIRED_SETTINGS).unwrap_err();

    match &err {
        CoverageError::ConfigurationNotFound { path, missing } => {
            assert_eq!(path, &cache);
            assert_eq!(missing, &vec!["UBSAN".to_string(), "LTO".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("UBSAN, LTO"));
}

#[test]
fn test_missing_cache_file_is_a_filesystem_error() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Utf8PathBuf::try_from(temp_dir.path().join("CMakeCache.txt")).unwrap();

    let err = resolve_build_config(&cache, &["BUILD_PLATFORM"]).unwrap_err();
    assert!(matches!(err, CoverageError::Filesystem { .. }));
}

#[test]
fn test_empty_request_resolves_nothing() {
    let (_temp_dir, cache) = write_cache(CACHE);
    let none: [&str; 0] = [];

    let config = resolve_build_config(&cache, &none).unwrap();
    assert!(config.is_empty());
}
