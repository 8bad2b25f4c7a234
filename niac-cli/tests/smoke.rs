use std::path::PathBuf;
use std::process::Command;

fn niac_bin() -> PathBuf {
    let target_dir = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../target"));
    let exe_name = format!("niac{}", std::env::consts::EXE_SUFFIX);
    let debug_exe = target_dir.join("debug").join(&exe_name);
    let release_exe = target_dir.join("release").join(&exe_name);
    if debug_exe.exists() {
        debug_exe
    } else if release_exe.exists() {
        release_exe
    } else {
        panic!("expected niac binary at {} or {}", debug_exe.display(), release_exe.display());
    }
}

#[test]
fn validate_accepts_a_built_in_template() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("office-switch.yaml");
    std::fs::write(&config_path, include_str!("../templates/office-switch.yaml")).unwrap();

    let output = Command::new(niac_bin()).args(["validate", config_path.to_str().unwrap()]).output().unwrap();

    assert!(output.status.success(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("OK"));
}

#[test]
fn validate_rejects_a_missing_file() {
    let output = Command::new(niac_bin()).args(["validate", "/nonexistent/config.yaml"]).output().unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn simulate_exits_2_for_a_missing_interface() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("office-switch.yaml");
    std::fs::write(&config_path, include_str!("../templates/office-switch.yaml")).unwrap();

    let output = Command::new(niac_bin())
        .args(["simulate", "niac-test-nonexistent-if0", config_path.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn template_list_includes_the_starter_templates() {
    let output = Command::new(niac_bin()).args(["template", "list"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("office-switch"));
    assert!(stdout.contains("edge-router"));
}

#[test]
fn init_refuses_to_overwrite_an_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("niac.yaml");
    std::fs::write(&output_path, "devices: []\n").unwrap();

    let output = Command::new(niac_bin()).args(["init", output_path.to_str().unwrap()]).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn analyze_walk_reports_entry_count() {
    let dir = tempfile::tempdir().unwrap();
    let walk_path = dir.path().join("device.walk");
    std::fs::write(&walk_path, "1.3.6.1.2.1.1.1.0 = STRING: \"niac\"\n1.3.6.1.2.1.1.5.0 = STRING: r1\n").unwrap();

    let output = Command::new(niac_bin()).args(["analyze-walk", walk_path.to_str().unwrap()]).output().unwrap();
    assert!(output.status.success(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 entries"));
}
