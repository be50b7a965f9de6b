use std::path::PathBuf;

use proptest::prelude::*;
use qs_frame::{
    EventTable, ParquetCatalog, RequestBatch, Selection, SourceProvider, UniformAxis, write_table,
};

fn tmp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("qs_frame_{tag}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn skim() -> EventTable {
    EventTable::from_columns(vec![
        ("pt_1".into(), vec![18.0, 25.0, 40.0, 65.0, 90.0]),
        ("q_1".into(), vec![1.0, -1.0, 1.0, -1.0, 1.0]),
        ("q_2".into(), vec![-1.0, -1.0, -1.0, 1.0, 1.0]),
        ("weight".into(), vec![1.0, 0.5, 2.0, 1.0, 1.0]),
    ])
    .unwrap()
}

#[test]
fn catalog_reads_written_skim() {
    let dir = tmp_dir("catalog");
    write_table(&dir.join("TTbarSkim.parquet"), &skim()).unwrap();

    let catalog = ParquetCatalog::new(&dir, "Skim.parquet");
    let source = catalog.open("TTbar").unwrap();
    assert_eq!(source.name(), "TTbar");
    assert_eq!(source.n_events(), 5);

    let mut batch = RequestBatch::new(Selection::all().filter("q_1*q_2 < 0", "opposite sign"));
    let h = batch.book(
        "TT_pt_1",
        "pt_1",
        Some("weight".into()),
        UniformAxis::new(2, 17.0, 70.0).unwrap(),
    );
    let mut res = source.execute(&batch).unwrap();
    let hist = res.take(h).unwrap();

    assert_eq!(res.cutflow.selected(), 3);
    assert_eq!(hist.bin_content, vec![3.0, 1.0]);
    assert_eq!(hist.sumw2, vec![5.0, 1.0]);
    assert_eq!(hist.overflow, 0.0);
    assert_eq!(hist.entries, 3);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tmp_dir("missing");
    let catalog = ParquetCatalog::new(&dir, "Skim.parquet");
    let err = catalog.open("Nope").err().unwrap();
    assert!(matches!(err, qs_frame::FrameError::Io(_)));
    let _ = std::fs::remove_dir_all(&dir);
}

proptest! {
    #[test]
    fn sign_regions_partition_events(
        charges in prop::collection::vec((-2i32..=2, -2i32..=2, any::<bool>()), 1..64)
    ) {
        // a missing charge is read back as NaN
        let (q1, q2): (Vec<f64>, Vec<f64>) = charges
            .iter()
            .map(|&(a, b, null)| (if null { f64::NAN } else { a as f64 }, b as f64))
            .unzip();
        let table = EventTable::from_columns(vec![("q_1".into(), q1), ("q_2".into(), q2)]).unwrap();

        let (os, _) = Selection::all().filter("q_1*q_2 < 0", "").evaluate(&table).unwrap();
        let (ss, _) = Selection::all().filter("!(q_1*q_2 < 0)", "").evaluate(&table).unwrap();
        for (a, b) in os.iter().zip(&ss) {
            prop_assert!(a ^ b);
        }
    }
}
