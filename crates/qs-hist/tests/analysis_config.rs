use std::path::PathBuf;

use approx::assert_relative_eq;
use qs_frame::MemoryCatalog;
use qs_hist::{AnalysisConfig, DataScale, HistogramProducer, Process, ProcessKind, TruthMatch};

fn config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs/mutau_2012.yaml")
}

fn process<'a>(cfg: &'a AnalysisConfig, label: &str) -> &'a Process {
    cfg.processes.iter().find(|p| p.label == label).unwrap()
}

#[test]
fn shipped_config_parses_and_validates() {
    let path = config_path();
    let cfg = AnalysisConfig::from_path(&path).unwrap();

    let registry = cfg.registry().unwrap();
    assert_eq!(registry.len(), 34);
    let names: Vec<_> = registry.iter().take(3).map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["pt_1", "pt_2", "eta_1"]);
    assert_eq!(registry.lookup("npv").unwrap().count, 25);
    assert_eq!(registry.title("pt_1").unwrap(), "p_{T}(μ)");
    assert_eq!(registry.title("m_vis").unwrap(), "m_vis");

    assert_eq!(cfg.baseline().cuts().len(), 2);
    assert_eq!(cfg.processes.iter().filter(|p| p.kind == ProcessKind::Data).count(), 2);
    assert_eq!(process(&cfg, "ZTT").truth_match, TruthMatch::Genuine);
    assert_eq!(process(&cfg, "ZLL").truth_match, TruthMatch::Misidentified);

    assert_eq!(cfg.plot.stack, ["W", "TT", "ZLL", "QCD"]);
    assert_eq!(cfg.plot.data_scale, DataScale::Auto);
    let estimate = cfg.plot.estimate.as_ref().unwrap();
    assert_eq!(estimate.subtract, ["W1J", "W2J", "W3J", "TT", "ZLL"]);

    // relative base_dir is anchored at the config's directory
    assert_eq!(cfg.sources.base_dir, path.parent().unwrap().join("."));
}

#[test]
fn shipped_skim_weights_are_used_as_is() {
    let cfg = AnalysisConfig::from_path(&config_path()).unwrap();
    let registry = cfg.registry().unwrap();
    let selector = cfg.selector();
    let baseline = cfg.baseline();
    let catalog = MemoryCatalog::new();
    let producer = HistogramProducer::new(&registry, &selector, &baseline, &catalog)
        .luminosity(cfg.luminosity)
        .weight_column(cfg.weight_column.as_str());

    // the skim weight already holds xs / N * lumi; it must not be applied twice
    for p in &cfg.processes {
        assert_eq!(producer.weight_expression(p).unwrap(), "weight", "{}", p.label);
    }

    // without the pinned scale the cross section would normalize the sample
    let mut ggh = process(&cfg, "ggH").clone();
    ggh.scale = None;
    assert_relative_eq!(
        ggh.normalization(cfg.luminosity).unwrap(),
        19.6 / 476963.0 * 11467.0,
        max_relative = 1e-12
    );
}

