use cinemate::dataset::{MovieRecord, load_movie_dataset};
use cinemate::embeddings::build_index;
use criterion::{Criterion, criterion_group, criterion_main};
use std::fmt::Write as _;
use std::hint::black_box;

const ROWS: usize = 5_000;
const DIMENSION: usize = 384;

fn synthetic_csv() -> String {
    let mut csv =
        String::from("tconst,title,year,genre,director,actors,plot,country,awards,rating,votes\n");
    for i in 0..ROWS {
        writeln!(
            csv,
            r#"tt{i:07},Movie {i},{year},"Drama, Sci-Fi",Director {i},"Actor {i}, Actor {j}",A story numbered {i} about people and machines.,United States,,{rating:.1},"{votes}""#,
            year = 1950 + i % 75,
            j = i + 1,
            rating = (i % 100) as f32 / 10.0,
            votes = i * 1_000,
        )
        .expect("write to string");
    }
    csv
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("movies.csv");
    std::fs::write(&path, synthetic_csv()).expect("write dataset");

    c.bench_function("load_movie_dataset", |b| {
        b.iter(|| load_movie_dataset(black_box(&path)).expect("load"))
    });

    let movies = load_movie_dataset(&path).expect("load");
    c.bench_function("embedding_text", |b| {
        b.iter(|| {
            black_box(&movies)
                .iter()
                .map(MovieRecord::embedding_text)
                .collect::<Vec<_>>()
        })
    });

    let vectors: Vec<Vec<f32>> = (0..ROWS)
        .map(|i| (0..DIMENSION).map(|d| ((i * d) % 17) as f32).collect())
        .collect();
    c.bench_function("build_index", |b| {
        b.iter(|| build_index(black_box(vectors.clone())).expect("index"))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
