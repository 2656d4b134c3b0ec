//! UDF Invocation Benchmarks
//!
//! Measures SQL execution with model-backed scalar UDFs in the projection,
//! across table sizes, plus the bare inference pipeline for comparison.
//!
//! Run with: cargo bench --bench udf_invocation

use arrow::array::{Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayo_db::model::{
    DecisionTree, InferencePipeline, MatrixFactorization, OneHotEncoder, StandardScaler, TreeNode,
};
use rayo_db::storage::StorageEngine;
use rayo_db::udf::{pipeline_udf, recommender_udf, NullHandling};
use rayo_db::Database;
use std::collections::HashMap;
use std::sync::Arc;

const SMALL_SIZE: usize = 1_000;
const MEDIUM_SIZE: usize = 10_000;
const LARGE_SIZE: usize = 100_000;

fn listings_table(num_rows: usize) -> StorageEngine {
    let mut rng = StdRng::seed_from_u64(42);
    let countries = ["US", "DE", "FR", "JP"];

    let schema = Arc::new(Schema::new(vec![
        Field::new("price", DataType::Float64, false),
        Field::new("score", DataType::Float64, false),
        Field::new("country", DataType::Utf8, false),
    ]));

    let prices: Vec<f64> = (0..num_rows).map(|_| rng.gen_range(10.0..500.0)).collect();
    let scores: Vec<f64> = (0..num_rows).map(|_| rng.gen_range(0.0..1.0)).collect();
    let country: Vec<&str> = (0..num_rows)
        .map(|_| countries[rng.gen_range(0..countries.len())])
        .collect();

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

fn scoring_pipeline() -> Arc<InferencePipeline> {
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
    Arc::new(InferencePipeline::new(scaler, encoder, tree))
}

fn scoring_db(num_rows: usize) -> Database {
    let mut db = Database::new();
    db.register_table("listings", listings_table(num_rows));
    db.create_function(
        pipeline_udf(
            "score_listing",
            vec![DataType::Float64, DataType::Float64, DataType::Utf8],
            2,
            scoring_pipeline(),
            NullHandling::Special,
        )
        .unwrap(),
    );
    db
}

/// Benchmark UDF-in-projection SQL across table sizes
fn bench_pipeline_udf_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_udf_query");

    for size in [SMALL_SIZE, MEDIUM_SIZE, LARGE_SIZE] {
        let db = scoring_db(size);
        group.bench_with_input(BenchmarkId::new("score_listing", size), &size, |b, _| {
            b.iter(|| {
                black_box(
                    db.sql(
                        "SELECT score_listing(price, score, country) FROM listings \
                         WHERE score > 0.2",
                    )
                    .unwrap(),
                );
            });
        });
    }

    group.finish();
}

/// Benchmark the recommender UDF over a deduplicated pair scan
fn bench_recommender_udf_query(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let num_rows = MEDIUM_SIZE;

    let schema = Arc::new(Schema::new(vec![
        Field::new("user_id", DataType::Int64, false),
        Field::new("product_id", DataType::Int64, false),
    ]));
    let users: Vec<i64> = (0..num_rows).map(|_| rng.gen_range(0..500)).collect();
    let products: Vec<i64> = (0..num_rows).map(|_| rng.gen_range(0..200)).collect();
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(users)),
            Arc::new(Int64Array::from(products)),
        ],
    )
    .unwrap();

    let mut user_bias = HashMap::new();
    let mut user_factors = HashMap::new();
    let mut item_factors = HashMap::new();
    for u in 0..500_i64 {
        user_bias.insert(u, rng.gen_range(-0.5..0.5));
        user_factors.insert(u, (0..16).map(|_| rng.gen_range(-1.0..1.0)).collect());
    }
    for i in 0..200_i64 {
        item_factors.insert(i, (0..16).map(|_| rng.gen_range(-1.0..1.0)).collect());
    }
    let model = MatrixFactorization::new(
        3.0,
        user_bias,
        HashMap::new(),
        user_factors,
        item_factors,
        (1.0, 5.0),
    )
    .unwrap();

    let mut db = Database::new();
    db.register_table("ratings", StorageEngine::new(vec![batch]));
    db.create_function(recommender_udf(
        "predict_rating",
        Arc::new(model),
        NullHandling::Special,
    ));

    c.bench_function("recommender_udf_query", |b| {
        b.iter(|| {
            black_box(
                db.sql(
                    "SELECT predict_rating(user_id, product_id) FROM ratings \
                     GROUP BY user_id, product_id",
                )
                .unwrap(),
            );
        });
    });
}

/// Baseline: the bare pipeline without SQL, to expose engine overhead
fn bench_bare_pipeline(c: &mut Criterion) {
    let pipeline = scoring_pipeline();
    let mut rng = StdRng::seed_from_u64(13);

    let numeric: Vec<Vec<f64>> = (0..MEDIUM_SIZE)
        .map(|_| vec![rng.gen_range(10.0..500.0), rng.gen_range(0.0..1.0)])
        .collect();
    let categorical: Vec<Vec<String>> = (0..MEDIUM_SIZE)
        .map(|_| vec!["US".to_string()])
        .collect();

    c.bench_function("bare_pipeline_predict_batch", |b| {
        b.iter(|| {
            black_box(pipeline.predict_batch(&numeric, &categorical).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_pipeline_udf_query,
    bench_recommender_udf_query,
    bench_bare_pipeline
);
criterion_main!(benches);
