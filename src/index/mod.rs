// Index module
// Persists vectors and movie metadata as one LanceDB table and searches it

#[cfg(test)]
mod tests;

pub mod manifest;

use arrow::array::{
    Array, ArrowPrimitiveType, FixedSizeListArray, Float32Array, PrimitiveArray,
    RecordBatchIterator, StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::dataset::MovieRecord;
use crate::embeddings::VectorIndex;
use crate::{CinemateError, Result};

pub use manifest::IndexManifest;

pub const TABLE_NAME: &str = "movies";

const BUILD_HINT: &str = "Run `cinemate build` first.";

/// Metadata columns, in schema order after `position` and `vector`
const METADATA_COLUMNS: [&str; 11] = [
    "tconst", "title", "year", "genre", "director", "actors", "plot", "country", "awards",
    "rating", "votes",
];

/// A raw nearest-neighbour hit: row position and squared L2 distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    pub position: usize,
    pub distance: f32,
}

/// Read handle on a persisted movie index
pub struct MovieIndex {
    path: PathBuf,
    table: Table,
}

impl std::fmt::Debug for MovieIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieIndex")
            .field("path", &self.path)
            .field("table", &TABLE_NAME)
            .finish()
    }
}

fn index_error(action: &str) -> impl FnOnce(lancedb::Error) -> CinemateError + '_ {
    move |e| CinemateError::Index(format!("Failed to {action}: {e}"))
}

pub(crate) async fn connect(artifact_dir: &Path) -> Result<Connection> {
    let uri = artifact_dir.to_string_lossy();
    debug!("Connecting to LanceDB at {}", uri);
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(index_error("connect to LanceDB"))
}

fn list_size(vector_dim: usize) -> Result<i32> {
    i32::try_from(vector_dim)
        .map_err(|_| CinemateError::Index(format!("Vector dimension {vector_dim} is too large")))
}

fn vector_item() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::Float32, false))
}

pub(crate) fn create_schema(vector_dim: usize) -> Result<Arc<Schema>> {
    Ok(Arc::new(Schema::new(vec![
        Field::new("position", DataType::UInt32, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(vector_item(), list_size(vector_dim)?),
            false,
        ),
        Field::new("tconst", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("year", DataType::UInt32, true),
        Field::new("genre", DataType::Utf8, true),
        Field::new("director", DataType::Utf8, true),
        Field::new("actors", DataType::Utf8, true),
        Field::new("plot", DataType::Utf8, true),
        Field::new("country", DataType::Utf8, true),
        Field::new("awards", DataType::Utf8, true),
        Field::new("rating", DataType::Float32, true),
        Field::new("votes", DataType::UInt64, true),
    ])))
}

/// One record batch pairing each row's position, vector and metadata
fn create_record_batch(
    positions: Vec<u32>,
    index: &VectorIndex,
    metadata: &[MovieRecord],
) -> Result<RecordBatch> {
    let schema = create_schema(index.dimension())?;

    let strings = |field: fn(&MovieRecord) -> Option<&str>| -> Arc<dyn Array> {
        Arc::new(StringArray::from(
            metadata.iter().map(field).collect::<Vec<_>>(),
        ))
    };

    let values = Float32Array::from(index.flat_values());
    let vector_array = FixedSizeListArray::try_new(
        vector_item(),
        list_size(index.dimension())?,
        Arc::new(values),
        None,
    )
    .map_err(|e| CinemateError::Index(format!("Failed to create vector array: {e}")))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(UInt32Array::from(positions)),
        Arc::new(vector_array),
        strings(|m| m.tconst.as_deref()),
        strings(|m| m.title.as_deref()),
        Arc::new(UInt32Array::from(
            metadata.iter().map(|m| m.year).collect::<Vec<_>>(),
        )),
        strings(|m| m.genre.as_deref()),
        strings(|m| m.director.as_deref()),
        strings(|m| m.actors.as_deref()),
        strings(|m| m.plot.as_deref()),
        strings(|m| m.country.as_deref()),
        strings(|m| m.awards.as_deref()),
        Arc::new(Float32Array::from(
            metadata.iter().map(|m| m.rating).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            metadata.iter().map(|m| m.votes).collect::<Vec<_>>(),
        )),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| CinemateError::Index(format!("Failed to create record batch: {e}")))
}

/// Replace whatever table exists with `batch`
async fn write_table(connection: &Connection, batch: RecordBatch) -> Result<()> {
    let table_names = connection
        .table_names()
        .execute()
        .await
        .map_err(index_error("list tables"))?;

    if table_names.iter().any(|name| name == TABLE_NAME) {
        info!("Dropping existing {} table", TABLE_NAME);
        connection
            .drop_table(TABLE_NAME)
            .await
            .map_err(index_error("drop table"))?;
    }

    let schema = batch.schema();
    let table = connection
        .create_empty_table(TABLE_NAME, Arc::clone(&schema))
        .execute()
        .await
        .map_err(index_error("create table"))?;

    let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
    table
        .add(reader)
        .execute()
        .await
        .map_err(index_error("insert rows"))?;

    Ok(())
}

/// Write `index` and its `metadata` as one artifact under `artifact_dir`.
///
/// Row `i` of the index is stored with metadata row `i` and position `i`.
/// Any existing artifact is replaced. Nothing is written when the lengths
/// disagree.
#[inline]
pub async fn persist(
    index: &VectorIndex,
    metadata: &[MovieRecord],
    artifact_dir: &Path,
    model: &str,
) -> Result<IndexManifest> {
    if index.len() != metadata.len() {
        return Err(CinemateError::LengthMismatch {
            vectors: index.len(),
            records: metadata.len(),
        });
    }

    if index.is_empty() {
        return Err(CinemateError::InvalidInput(
            "refusing to persist an empty index".to_string(),
        ));
    }

    let positions = (0..index.len())
        .map(|i| {
            u32::try_from(i)
                .map_err(|_| CinemateError::Index(format!("Row {i} exceeds the position range")))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch = create_record_batch(positions, index, metadata)?;

    fs::create_dir_all(artifact_dir)?;
    // A rebuild that fails part way must not leave the previous manifest behind
    IndexManifest::remove(artifact_dir)?;
    let connection = connect(artifact_dir).await?;
    write_table(&connection, batch).await?;

    let manifest = IndexManifest::new(model, index.dimension(), index.len());
    manifest.write(artifact_dir)?;

    info!(
        "Persisted {} movies ({}-d vectors) to {}",
        index.len(),
        index.dimension(),
        artifact_dir.display()
    );
    Ok(manifest)
}

impl MovieIndex {
    /// Open an artifact previously written by [`persist`]
    #[inline]
    pub async fn open(artifact_dir: &Path) -> Result<Self> {
        if !artifact_dir.is_dir() {
            return Err(CinemateError::not_found(artifact_dir, BUILD_HINT));
        }

        let connection = connect(artifact_dir).await?;
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(index_error("list tables"))?;

        if !table_names.iter().any(|name| name == TABLE_NAME) {
            return Err(CinemateError::not_found(
                artifact_dir.join(format!("{TABLE_NAME}.lance")),
                BUILD_HINT,
            ));
        }

        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(index_error("open table"))?;

        debug!("Opened movie index at {}", artifact_dir.display());
        Ok(Self {
            path: artifact_dir.to_path_buf(),
            table,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(index_error("count rows"))
    }

    /// Vector dimension declared by the table schema
    #[inline]
    pub async fn dimension(&self) -> Result<usize> {
        let schema = self
            .table
            .schema()
            .await
            .map_err(index_error("read table schema"))?;

        let field = schema
            .field_with_name("vector")
            .map_err(|_| CinemateError::Index("Missing vector column".to_string()))?;

        match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size)
                .map_err(|_| CinemateError::Index(format!("Invalid vector size {size}"))),
            other => Err(CinemateError::Index(format!(
                "Unexpected vector column type {other}"
            ))),
        }
    }

    /// Every metadata row, ordered by position.
    ///
    /// Positions must cover `0..n` exactly once, otherwise the artifact is
    /// rejected with [`CinemateError::LengthMismatch`].
    #[inline]
    pub async fn load_metadata(&self) -> Result<Vec<MovieRecord>> {
        let rows = self.count().await?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let mut columns = vec!["position"];
        columns.extend(METADATA_COLUMNS);

        let mut stream = self
            .table
            .query()
            .select(Select::columns(columns.as_slice()))
            .limit(rows)
            .execute()
            .await
            .map_err(index_error("read metadata"))?;

        let mut slots: Vec<Option<MovieRecord>> = vec![None; rows];
        let mut placed = 0;

        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(index_error("read metadata stream"))?
        {
            for (position, movie) in parse_metadata_batch(&batch)? {
                let Some(slot) = slots.get_mut(position).filter(|slot| slot.is_none()) else {
                    return Err(CinemateError::LengthMismatch {
                        vectors: rows,
                        records: placed,
                    });
                };
                *slot = Some(movie);
                placed += 1;
            }
        }

        if placed != rows {
            return Err(CinemateError::LengthMismatch {
                vectors: rows,
                records: placed,
            });
        }

        debug!("Loaded {} metadata rows", placed);
        Ok(slots.into_iter().flatten().collect())
    }

    /// Exhaustive squared-L2 search, closest first
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<IndexHit>> {
        debug!("Searching movie index with limit: {}", limit);

        let mut stream = self
            .table
            .vector_search(query_vector)
            .map_err(index_error("create vector search"))?
            .column("vector")
            .distance_type(DistanceType::L2)
            .bypass_vector_index()
            .select(Select::columns(&["position"]))
            .limit(limit)
            .execute()
            .await
            .map_err(index_error("execute search"))?;

        let mut hits = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(index_error("read result stream"))?
        {
            hits.extend(parse_hit_batch(&batch)?);
        }

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });

        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| CinemateError::Index(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| CinemateError::Index(format!("Invalid {name} column type")))
}

fn text(array: &StringArray, row: usize) -> Option<String> {
    (!array.is_null(row)).then(|| array.value(row).to_string())
}

fn number<T: ArrowPrimitiveType>(array: &PrimitiveArray<T>, row: usize) -> Option<T::Native> {
    (!array.is_null(row)).then(|| array.value(row))
}

fn parse_metadata_batch(batch: &RecordBatch) -> Result<Vec<(usize, MovieRecord)>> {
    let positions = column::<UInt32Array>(batch, "position")?;
    let tconsts = column::<StringArray>(batch, "tconst")?;
    let titles = column::<StringArray>(batch, "title")?;
    let years = column::<UInt32Array>(batch, "year")?;
    let genres = column::<StringArray>(batch, "genre")?;
    let directors = column::<StringArray>(batch, "director")?;
    let actors = column::<StringArray>(batch, "actors")?;
    let plots = column::<StringArray>(batch, "plot")?;
    let countries = column::<StringArray>(batch, "country")?;
    let awards = column::<StringArray>(batch, "awards")?;
    let ratings = column::<Float32Array>(batch, "rating")?;
    let votes = column::<UInt64Array>(batch, "votes")?;

    Ok((0..batch.num_rows())
        .map(|row| {
            let movie = MovieRecord {
                tconst: text(tconsts, row),
                title: text(titles, row),
                year: number(years, row),
                genre: text(genres, row),
                director: text(directors, row),
                actors: text(actors, row),
                plot: text(plots, row),
                country: text(countries, row),
                awards: text(awards, row),
                rating: number(ratings, row),
                votes: number(votes, row),
            };
            (positions.value(row) as usize, movie)
        })
        .collect())
}

fn parse_hit_batch(batch: &RecordBatch) -> Result<Vec<IndexHit>> {
    let positions = column::<UInt32Array>(batch, "position")?;
    let distances = column::<Float32Array>(batch, "_distance")?;

    Ok((0..batch.num_rows())
        .map(|row| IndexHit {
            position: positions.value(row) as usize,
            distance: distances.value(row),
        })
        .collect())
}
