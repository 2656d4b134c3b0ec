//! End-to-End UDF Benchmark Demo
//!
//! Builds a listings table, loads a serialized inference pipeline, registers
//! it as a SQL-callable scalar UDF, and times repeated query invocations
//! with the trimmed-mean harness.
//!
//! Run with: cargo run --example udf_benchmark --release

use arrow::array::{Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use rayo_db::bench::Harness;
use rayo_db::model::{DecisionTree, InferencePipeline, OneHotEncoder, StandardScaler, TreeNode};
use rayo_db::storage::StorageEngine;
use rayo_db::udf::{pipeline_udf, NullHandling};
use rayo_db::Database;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("rayo-db UDF benchmark");
    println!("=====================");
    println!();

    // Models arrive as serialized files in a real deployment; write one out
    // and load it back through the same path.
    let model_path = std::env::temp_dir().join("rayo-db-demo-pipeline.json");
    std::fs::write(&model_path, serde_json::to_string(&build_pipeline())?)?;
    let pipeline = Arc::new(InferencePipeline::from_file(&model_path)?);
    println!(
        "Loaded pipeline: {} numeric + {} categorical columns",
        pipeline.numeric_width(),
        pipeline.categorical_width()
    );

    let rows = 100_000;
    let mut db = Database::new();
    db.register_table("listings", listings_table(rows));
    db.create_function(pipeline_udf(
        "score_listing",
        vec![DataType::Float64, DataType::Float64, DataType::Utf8],
        2,
        pipeline,
        NullHandling::Special,
    )?);
    println!("Registered table 'listings' ({rows} rows) and UDF 'score_listing'");
    println!();

    let sql = "SELECT score_listing(price, score, country) FROM listings \
               WHERE score > 0.2 AND price > 50";

    let harness = Harness::new(5);
    let report = harness.run("score_listing", || db.sql(sql))?;

    for (i, trial) in report.trials().iter().enumerate() {
        println!("{} : {:.6}s", i + 1, trial.seconds());
    }
    let summary = report.summary();
    println!();
    println!("min : {:.6}s", summary.min);
    println!("max : {:.6}s", summary.max);
    println!("score_listing, {:.6}s (trimmed mean)", summary.trimmed_mean);

    std::fs::remove_file(&model_path).ok();
    Ok(())
}

fn build_pipeline() -> InferencePipeline {
    let scaler = StandardScaler::new(vec![250.0, 0.5], vec![150.0, 0.3]).unwrap();
    let encoder = OneHotEncoder::new(vec![vec![
        "US".to_string(),
        "DE".to_string(),
        "FR".to_string(),
        "JP".to_string(),
    ]]);
    let tree = DecisionTree::new(vec![
        TreeNode::Branch {
            feature: 0,
            threshold: 0.0,
            left: 1,
            right: 2,
        },
        TreeNode::Branch {
            feature: 1,
            threshold: 0.5,
            left: 3,
            right: 4,
        },
        TreeNode::Leaf { value: 1.0 },
        TreeNode::Leaf { value: 0.0 },
        TreeNode::Leaf { value: 0.5 },
    ]);
    InferencePipeline::new(scaler, encoder, tree)
}

fn listings_table(rows: usize) -> StorageEngine {
    let countries = ["US", "DE", "FR", "JP"];

    let schema = Arc::new(Schema::new(vec![
        Field::new("price", DataType::Float64, false),
        Field::new("score", DataType::Float64, false),
        Field::new("country", DataType::Utf8, false),
    ]));

    // Deterministic pseudo-random data keeps runs comparable.
    let prices: Vec<f64> = (0..rows)
        .map(|i| 10.0 + ((i * 7919) % 4900) as f64 / 10.0)
        .collect();
    let scores: Vec<f64> = (0..rows).map(|i| ((i * 104_729) % 1000) as f64 / 1000.0).collect();
    let country: Vec<&str> = (0..rows).map(|i| countries[i % countries.len()]).collect();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(prices)),
            Arc::new(Float64Array::from(scores)),
            Arc::new(StringArray::from(country)),
        ],
    )
    .unwrap();

    StorageEngine::new(vec![batch])
}
