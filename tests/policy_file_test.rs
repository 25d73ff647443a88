// Loading policies from disk

use omr_confidence::{Mode, NoteRange, Policy, PolicyError};
use std::io::Write;
use tempfile::Builder;

fn write_policy(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_json_policy_file() {
    let file = write_policy(
        ".json",
        r#"{"mode": "strict", "strictMetadataFloor": 70, "tierWeights": [0.4, 0.2, 0.2, 0.1, 0.1]}"#,
    );
    let policy = Policy::from_path(file.path()).unwrap();

    assert_eq!(policy.mode, Mode::Strict);
    assert_eq!(policy.strict_metadata_floor, 70);
    assert_eq!(policy.weights().unwrap().basis_points(), &[4000, 2000, 2000, 1000, 1000]);
    // unspecified fields keep their defaults
    assert_eq!(policy.note_range, NoteRange::default());
    assert!(policy.parallel);
}

#[test]
fn test_yaml_policy_file() {
    let file = write_policy(
        ".yml",
        "mode: permissive\nnoteRange:\n  lowest: 40\n  highest: 90\nparallel: false\nissueLimit: 5\n",
    );
    let policy = Policy::from_path(file.path()).unwrap();

    assert_eq!(policy.mode, Mode::Permissive);
    assert_eq!(policy.note_range, NoteRange { lowest: 40, highest: 90 });
    assert!(!policy.parallel);
    assert_eq!(policy.issue_limit, Some(5));
}

#[test]
fn test_invalid_policy_file_is_rejected() {
    let file = write_policy(".yaml", "strictMetadataFloor: 150\n");
    assert!(matches!(
        Policy::from_path(file.path()),
        Err(PolicyError::FloorOutOfRange(150))
    ));
}

#[test]
fn test_unknown_extension() {
    let file = write_policy(".toml", "mode = 'strict'\n");
    assert!(matches!(
        Policy::from_path(file.path()),
        Err(PolicyError::UnsupportedExtension(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Policy::from_path(dir.path().join("absent.json")),
        Err(PolicyError::Io(_))
    ));
}
