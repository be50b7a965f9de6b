use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_qcdstack"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn tmp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("qcdstack_cli_err_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn stderr_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn config_without_schema_version_is_rejected() {
    let dir = tmp_dir("schema");
    let config = dir.join("analysis.yaml");
    std::fs::write(&config, "luminosity: 1.0\n").unwrap();

    let out = run(&[
        "histograms",
        "--config",
        config.to_str().unwrap(),
        "--output",
        dir.join("h.json").to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    assert!(stderr_of(&out).contains("schema_version"), "{}", stderr_of(&out));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn every_source_missing_fails_histograms() {
    let dir = tmp_dir("nosources");
    let config = dir.join("analysis.yaml");
    std::fs::write(
        &config,
        r#"
schema_version: qcdstack_analysis_v0
sources: { base_dir: nowhere }
luminosity: 1.0
variables:
  - { name: m_vis, bins: 30, lower: 0, upper: 300 }
processes:
  - { label: dataRunB, source: Run2012B, kind: data }
plot:
  data: dataRunB
  stack: []
"#,
    )
    .unwrap();

    let out = run(&[
        "histograms",
        "--config",
        config.to_str().unwrap(),
        "--output",
        dir.join("h.json").to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    assert!(stderr_of(&out).contains("no histograms produced"), "{}", stderr_of(&out));
    assert!(!dir.join("h.json").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn shapes_rejects_inverted_range() {
    let dir = tmp_dir("range");
    let config = dir.join("analysis.yaml");
    std::fs::write(
        &config,
        r#"
schema_version: qcdstack_analysis_v0
sources: { base_dir: . }
luminosity: 1.0
variables:
  - { name: m_vis, bins: 30, lower: 0, upper: 300 }
processes:
  - { label: d, source: D, kind: data }
plot: { data: d, stack: [] }
"#,
    )
    .unwrap();

    let out = run(&[
        "shapes",
        "--config",
        config.to_str().unwrap(),
        "--variable",
        "pt_1",
        "--bins",
        "10",
        "--lower",
        "50",
        "--upper",
        "10",
        "--output",
        dir.join("s.json").to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    assert!(stderr_of(&out).contains("lower edge"), "{}", stderr_of(&out));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn inspect_of_missing_store_fails() {
    let out = run(&["inspect", "--store", "/nonexistent/qcdstack/histograms.json"]);
    assert!(!out.status.success());
    assert!(stderr_of(&out).contains("failed to load histogram store"), "{}", stderr_of(&out));
}
