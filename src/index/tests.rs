use super::*;
use crate::embeddings::build_index;
use tempfile::TempDir;

fn movie(title: &str, plot: &str) -> MovieRecord {
    MovieRecord {
        tconst: Some(format!("tt-{}", title.to_lowercase().replace(' ', "-"))),
        title: Some(title.to_string()),
        plot: Some(plot.to_string()),
        ..MovieRecord::default()
    }
}

fn sample() -> (VectorIndex, Vec<MovieRecord>) {
    let index = build_index(vec![
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
    ])
    .expect("uniform vectors");

    let metadata = vec![
        MovieRecord {
            year: Some(2014),
            rating: Some(7.7),
            votes: Some(600_000),
            genre: Some("Sci-Fi".to_string()),
            ..movie("Ex Machina", "A programmer evaluates a humanoid AI.")
        },
        movie("Notting Hill", "A bookseller falls for a film star."),
        movie("Heat", "A detective hunts a crew of thieves."),
    ];

    (index, metadata)
}

#[tokio::test]
async fn persist_then_open_round_trip() {
    let dir = TempDir::new().expect("temp dir");
    let artifact = dir.path().join("index");
    let (index, metadata) = sample();

    let manifest = persist(&index, &metadata, &artifact, "test-model")
        .await
        .expect("persist");
    assert_eq!(manifest.rows, 3);
    assert_eq!(manifest.dimension, 3);
    assert_eq!(manifest.model, "test-model");

    let opened = MovieIndex::open(&artifact).await.expect("open");
    assert_eq!(opened.path(), artifact.as_path());
    assert_eq!(opened.count().await.expect("count"), 3);
    assert_eq!(opened.dimension().await.expect("dimension"), 3);

    let loaded = opened.load_metadata().await.expect("metadata");
    assert_eq!(loaded, metadata);

    let on_disk = IndexManifest::read(&artifact)
        .expect("read manifest")
        .expect("manifest written");
    assert_eq!(on_disk, manifest);
}

#[tokio::test]
async fn search_orders_by_distance() {
    let dir = TempDir::new().expect("temp dir");
    let (index, metadata) = sample();
    persist(&index, &metadata, dir.path(), "test-model")
        .await
        .expect("persist");

    let opened = MovieIndex::open(dir.path()).await.expect("open");
    let hits = opened.search(&[0.0, 1.0, 0.0], 3).await.expect("search");

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].position, 1);
    assert!(hits[0].distance.abs() < 1e-6);
    assert!(
        hits.windows(2).all(|w| w[0].distance <= w[1].distance),
        "distances should be non-decreasing: {hits:?}"
    );
    assert!(hits[1].distance > hits[0].distance);
}

#[tokio::test]
async fn search_respects_limit() {
    let dir = TempDir::new().expect("temp dir");
    let (index, metadata) = sample();
    persist(&index, &metadata, dir.path(), "test-model")
        .await
        .expect("persist");

    let opened = MovieIndex::open(dir.path()).await.expect("open");
    let hits = opened.search(&[0.9, 0.1, 0.0], 1).await.expect("search");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].position, 0);
}

#[tokio::test]
async fn length_mismatch_writes_nothing() {
    let dir = TempDir::new().expect("temp dir");
    let artifact = dir.path().join("index");
    let (index, mut metadata) = sample();
    metadata.pop();

    let err = persist(&index, &metadata, &artifact, "test-model")
        .await
        .expect_err("lengths differ");

    match err {
        CinemateError::LengthMismatch { vectors, records } => {
            assert_eq!(vectors, 3);
            assert_eq!(records, 2);
        }
        other => panic!("expected LengthMismatch, got {other:?}"),
    }
    assert!(!artifact.exists());
}

#[tokio::test]
async fn empty_index_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let index = build_index(Vec::new()).expect("empty index");

    let err = persist(&index, &[], dir.path(), "test-model")
        .await
        .expect_err("nothing to persist");
    assert!(matches!(err, CinemateError::InvalidInput(_)));
}

#[tokio::test]
async fn rebuild_replaces_previous_artifact() {
    let dir = TempDir::new().expect("temp dir");
    let (index, metadata) = sample();
    persist(&index, &metadata, dir.path(), "old-model")
        .await
        .expect("first persist");

    let smaller = build_index(vec![vec![0.5, 0.5]]).expect("index");
    let single = vec![movie("Alien", "A crew meets a deadly creature.")];
    persist(&smaller, &single, dir.path(), "new-model")
        .await
        .expect("second persist");

    let opened = MovieIndex::open(dir.path()).await.expect("open");
    assert_eq!(opened.count().await.expect("count"), 1);
    assert_eq!(opened.dimension().await.expect("dimension"), 2);
    assert_eq!(opened.load_metadata().await.expect("metadata"), single);

    let manifest = IndexManifest::read(dir.path())
        .expect("read")
        .expect("manifest");
    assert_eq!(manifest.model, "new-model");
}

#[tokio::test]
async fn failed_rebuild_drops_the_previous_manifest() {
    let dir = TempDir::new().expect("temp dir");
    let (index, metadata) = sample();
    persist(&index, &metadata, dir.path(), "old-model")
        .await
        .expect("first persist");

    // Leave a plain file where the table directory was so the rewrite cannot land
    let table_dir = dir.path().join(format!("{TABLE_NAME}.lance"));
    fs::remove_dir_all(&table_dir).expect("remove table");
    fs::write(&table_dir, "not a table").expect("block table");

    let rebuilt = persist(&index, &metadata, dir.path(), "new-model").await;
    let manifest = IndexManifest::read(dir.path()).expect("read");

    match rebuilt {
        Ok(_) => assert_eq!(manifest.map(|m| m.model).as_deref(), Some("new-model")),
        Err(_) => assert!(manifest.is_none()),
    }
}

#[tokio::test]
async fn missing_directory_is_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let artifact = dir.path().join("never-built");

    let err = MovieIndex::open(&artifact).await.expect_err("no artifact");
    match err {
        CinemateError::NotFound { path, hint } => {
            assert_eq!(path, artifact);
            assert!(hint.contains("cinemate build"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn directory_without_table_is_not_found() {
    let dir = TempDir::new().expect("temp dir");

    let err = MovieIndex::open(dir.path()).await.expect_err("no table");
    assert!(matches!(err, CinemateError::NotFound { .. }));
}

#[tokio::test]
async fn gapped_positions_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let (index, metadata) = sample();

    let batch = create_record_batch(vec![0, 1, 7], &index, &metadata).expect("batch");
    let connection = connect(dir.path()).await.expect("connect");
    write_table(&connection, batch).await.expect("write");

    let opened = MovieIndex::open(dir.path()).await.expect("open");
    let err = opened
        .load_metadata()
        .await
        .expect_err("position 7 has no slot");

    match err {
        CinemateError::LengthMismatch { vectors, records } => {
            assert_eq!(vectors, 3);
            assert!(records < 3);
        }
        other => panic!("expected LengthMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_positions_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let (index, metadata) = sample();

    let batch = create_record_batch(vec![0, 1, 1], &index, &metadata).expect("batch");
    let connection = connect(dir.path()).await.expect("connect");
    write_table(&connection, batch).await.expect("write");

    let opened = MovieIndex::open(dir.path()).await.expect("open");
    assert!(matches!(
        opened.load_metadata().await,
        Err(CinemateError::LengthMismatch { .. })
    ));
}

#[test]
fn schema_pairs_position_vector_and_metadata() {
    let schema = create_schema(4).expect("schema");

    assert_eq!(schema.field(0).name(), "position");
    assert_eq!(schema.field(1).name(), "vector");
    let names: Vec<&str> = schema
        .fields()
        .iter()
        .skip(2)
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(names, METADATA_COLUMNS);
    assert!(matches!(
        schema.field(1).data_type(),
        DataType::FixedSizeList(_, 4)
    ));
}
