use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use qs_frame::{EventTable, write_table};

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
    let dir = std::env::temp_dir().join(format!("qcdstack_cli_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

const CONFIG: &str = r#"
schema_version: qcdstack_analysis_v0
sources: { base_dir: skims }
luminosity: 1.0
baseline:
  - { cut: "iso_1<0.1", name: "Require isolated muon for signal region" }
variables:
  - { name: x, bins: 2, lower: 0, upper: 2, title: "m_{vis}" }
processes:
  - { label: ggH, source: GluGlu, kind: signal, scale: 1.0 }
  - { label: W1J, source: W1Jets, kind: background, scale: 1.0 }
  - { label: TT, source: TTbar, kind: background, scale: 1.0 }
  - { label: dataRunB, source: Run2012B, kind: data }
composites:
  - { name: W, members: [W1J] }
plot:
  data: dataRunB
  stack: [W, TT, QCD]
  signals: [ggH]
  estimate: { data: dataRunB, subtract: [W1J, TT] }
"#;

/// `(x, opposite_sign, count)` rows of isolated unit-weight events.
fn events(rows: &[(f64, bool, usize)]) -> EventTable {
    let mut x = Vec::new();
    let mut q2 = Vec::new();
    for &(value, opposite, n) in rows {
        for _ in 0..n {
            x.push(value);
            q2.push(if opposite { -1.0 } else { 1.0 });
        }
    }
    let n = x.len();
    EventTable::from_columns(vec![
        ("x".into(), x),
        ("q_1".into(), vec![1.0; n]),
        ("q_2".into(), q2),
        ("iso_1".into(), vec![0.05; n]),
        ("weight".into(), vec![1.0; n]),
    ])
    .unwrap()
}

/// Analysis directory with a config and one skim per source.
fn analysis(name: &str) -> (PathBuf, PathBuf) {
    let dir = tmp_dir(name);
    let skims = dir.join("skims");
    std::fs::create_dir_all(&skims).unwrap();
    let samples = [
        ("GluGlu", events(&[(0.5, true, 1)])),
        ("W1Jets", events(&[(0.5, true, 1), (0.5, false, 1), (1.5, false, 1)])),
        ("TTbar", events(&[(1.5, true, 1), (1.5, false, 1)])),
        ("Run2012B", events(&[(0.5, true, 6), (1.5, true, 4), (0.5, false, 4), (1.5, false, 1)])),
    ];
    for (source, table) in samples {
        write_table(&skims.join(format!("{source}Skim.parquet")), &table).unwrap();
    }
    let config = dir.join("analysis.yaml");
    std::fs::write(&config, CONFIG).unwrap();
    (dir, config)
}

fn s(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn histograms_then_plot() {
    let (dir, config) = analysis("plot");
    let store = dir.join("out/histograms.json");

    let out = run(&["histograms", "--config", s(&config), "--output", s(&store), "--threads", "2"]);
    assert_success(&out, "histograms");
    assert!(store.exists());

    let out = run(&["inspect", "--store", s(&store), "--json"]);
    assert_success(&out, "inspect");
    let v: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON");
    let names: Vec<&str> = v["histograms"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["ggH_x", "ggH_x_ss", "W1J_x", "W1J_x_ss", "TT_x", "TT_x_ss", "dataRunB_x", "dataRunB_x_ss"]
    );
    assert_eq!(v["cutflows"].as_array().unwrap().len(), 8);

    let plots = dir.join("plots");
    let out = run(&[
        "plot",
        "--config",
        s(&config),
        "--store",
        s(&store),
        "--variable",
        "x",
        "--out-dir",
        s(&plots),
    ]);
    assert_success(&out, "plot");

    let artifact: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(plots.join("x.json")).unwrap()).unwrap();
    assert_eq!(artifact["schema_version"], "qcdstack_stack_plot_v0");
    let labels: Vec<&str> = artifact["layers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, ["W", "TT", "QCD"]);
    assert_eq!(artifact["layers"][2]["y"], serde_json::json!([3.0, 0.0]));
    assert_eq!(artifact["data"]["scale"], 0.5);
    assert_eq!(artifact["data"]["legend"], "Data (x0.5)");
    assert_eq!(artifact["signals"][0]["legend"], "ggH (x100.0)");

    let svg = std::fs::read_to_string(plots.join("x.svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("N_{Events}"));

    let style = dir.join("style.yaml");
    std::fs::write(&style, "colors: { W: '#123456' }\n").unwrap();
    let restyled = dir.join("restyled/x.svg");
    let out = run(&[
        "render",
        "--input",
        s(&plots.join("x.json")),
        "--style",
        s(&style),
        "--output",
        s(&restyled),
    ]);
    assert_success(&out, "render");
    let svg = std::fs::read_to_string(&restyled).unwrap();
    assert!(svg.contains("#123456"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn shapes_fills_an_unregistered_variable() {
    let (dir, config) = analysis("shapes");
    let store = dir.join("shapes.json");
    let out = run(&[
        "shapes",
        "--config",
        s(&config),
        "--variable",
        "iso_1",
        "--bins",
        "4",
        "--lower",
        "-0.1",
        "--upper",
        "0.1",
        "--output",
        s(&store),
    ]);
    assert_success(&out, "shapes");

    let out = run(&["inspect", "--store", s(&store)]);
    assert_success(&out, "inspect");
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("dataRunB_iso_1_ss"), "{text}");
    assert!(!text.contains("ggH_x "), "{text}");

    // the config does not list iso_1; the stored binning is used
    let plots = dir.join("plots");
    let out = run(&[
        "plot",
        "--config",
        s(&config),
        "--store",
        s(&store),
        "--variable",
        "iso_1",
        "--out-dir",
        s(&plots),
    ]);
    assert_success(&out, "plot");
    let artifact: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(plots.join("iso_1.json")).unwrap()).unwrap();
    assert_eq!(artifact["x_title"], "iso_1");
    assert_eq!(artifact["bin_edges"].as_array().unwrap().len(), 5);
    // every event sits at iso_1 = 0.05: data SS 5 minus (W1J SS 2 + TT SS 1)
    assert_eq!(artifact["layers"][2]["y"], serde_json::json!([0.0, 0.0, 0.0, 2.0]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_skim_is_skipped_then_reported_by_plot() {
    let (dir, config) = analysis("missing");
    std::fs::remove_file(dir.join("skims/TTbarSkim.parquet")).unwrap();
    let store = dir.join("histograms.json");

    let out = run(&["histograms", "--config", s(&config), "--output", s(&store)]);
    assert_success(&out, "histograms");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("skipped process 'TT'"), "{stderr}");

    let out = run(&[
        "plot",
        "--config",
        s(&config),
        "--store",
        s(&store),
        "--variable",
        "x",
        "--out-dir",
        s(&dir.join("plots")),
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("TT_x"), "{stderr}");

    let _ = std::fs::remove_dir_all(&dir);
}
