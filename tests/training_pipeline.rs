/// End-to-end tests: CSV on disk → trainer → artifact → predictor service.
///
/// Run with: cargo test --test training_pipeline -- --nocapture
mod common;

use smart_eta::error::{ArtifactLoadError, TrainError, TrainingDataError};
use smart_eta::service::{EtaPredictor, EtaService};
use smart_eta::trainer::{Trainer, TrainerConfig};
use smart_eta::types::InferenceRecord;

fn scenario() -> InferenceRecord {
    InferenceRecord {
        distance_km: 5.0,
        order_items: 3,
        weather: "clear".into(),
        traffic: 2,
        rider_queue: 1,
        prep_time_min: 10,
        order_hour: 18,
    }
}

fn config(dir: &std::path::Path, output: &str) -> TrainerConfig {
    TrainerConfig {
        data_path: dir.join("orders.csv"),
        output_path: dir.join(output),
        ..Default::default()
    }
}

#[test]
fn test_train_then_serve_scenario() {
    let dir = tempfile::tempdir().unwrap();
    common::write_csv(&dir.path().join("orders.csv"), &common::synthetic_rows(500));

    let report = Trainer::new(config(dir.path(), "model/eta.json")).run().unwrap();
    println!(
        "MAE={:.3} RMSE={:.3} R2={:.3}",
        report.metrics.mae, report.metrics.rmse, report.metrics.r2
    );
    assert_eq!(report.split.test.len(), 100);
    assert_eq!(report.split.train.len(), 400);
    assert!(report.metrics.r2 > 0.8, "r2 {}", report.metrics.r2);
    assert!(report.metrics.rmse >= report.metrics.mae);

    let artifact_path = report.artifact_path.unwrap();
    assert!(artifact_path.exists());

    let service = EtaService::load(&artifact_path).unwrap();
    let first = service.predict(&scenario()).unwrap();
    println!("scenario ETA = {first:.2} min");
    assert!((5.0..=120.0).contains(&first), "implausible eta {first}");
    assert!((25.0..=65.0).contains(&first), "eta {first} far from the generating signal");

    for _ in 0..10 {
        assert_eq!(service.predict(&scenario()).unwrap(), first);
    }
}

#[test]
fn test_training_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    common::write_csv(&dir.path().join("orders.csv"), &common::synthetic_rows(300));

    let a = Trainer::new(config(dir.path(), "a.json")).run().unwrap();
    let b = Trainer::new(config(dir.path(), "b.json")).run().unwrap();

    assert_eq!(a.split, b.split);
    assert!((a.metrics.mae - b.metrics.mae).abs() < 1e-9);

    let sa = EtaService::load(dir.path().join("a.json")).unwrap();
    let sb = EtaService::load(dir.path().join("b.json")).unwrap();
    assert_eq!(sa.pipeline(), sb.pipeline());
}

#[test]
fn test_unknown_weather_still_predicts() {
    let dir = tempfile::tempdir().unwrap();
    common::write_csv(&dir.path().join("orders.csv"), &common::synthetic_rows(200));
    let report = Trainer::new(config(dir.path(), "eta.json")).run().unwrap();
    let service = EtaService::load(report.artifact_path.unwrap()).unwrap();

    let mut record = scenario();
    record.weather = "volcanic ash".into();

    let encoded = service.encode(&record).unwrap();
    let vocab_len = service.pipeline().encoder().vocabularies()[0].values.len();
    assert_eq!(vocab_len, 4);
    assert!(encoded[..vocab_len].iter().all(|&x| x == 0.0));

    let eta = service.predict(&record).unwrap();
    assert!(eta.is_finite());
}

#[test]
fn test_extra_columns_never_reach_the_encoder() {
    let dir = tempfile::tempdir().unwrap();
    let rows = common::synthetic_rows(120);
    let path = dir.path().join("orders.csv");
    {
        use std::io::Write;
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{},rider_name", common::HEADER).unwrap();
        for (i, row) in rows.iter().enumerate() {
            writeln!(file, "{row},rider{i}").unwrap();
        }
    }

    let report = Trainer::new(config(dir.path(), "eta.json")).run().unwrap();
    let service = EtaService::load(report.artifact_path.unwrap()).unwrap();
    let names = service.info().feature_names;
    assert_eq!(names.len(), 4 + 6);
    assert!(names
        .iter()
        .all(|n| !n.contains("order_id") && !n.contains("order_time") && !n.contains("rider_name")));
}

#[test]
fn test_quality_gate_blocks_save() {
    let dir = tempfile::tempdir().unwrap();
    common::write_csv(&dir.path().join("orders.csv"), &common::synthetic_rows(150));
    let mut cfg = config(dir.path(), "eta.json");
    cfg.min_r2 = Some(1.01);

    let err = Trainer::new(cfg).run().unwrap_err();
    assert!(matches!(err, TrainError::QualityGate { .. }));
    assert!(!dir.path().join("eta.json").exists());
}

#[test]
fn test_missing_data_file_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let err = Trainer::new(config(dir.path(), "eta.json")).run().unwrap_err();
    assert!(matches!(err, TrainError::Data(TrainingDataError::Open { .. })));
    assert!(!dir.path().join("eta.json").exists());
}

#[test]
fn test_nonexistent_artifact_refuses_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let err = EtaService::load(dir.path().join("missing.json"))
        .err()
        .expect("service must not start");
    assert!(matches!(err, ArtifactLoadError::NotFound { .. }));
}
