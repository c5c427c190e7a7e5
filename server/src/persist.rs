use std::fs;
use std::path::{Path, PathBuf};

use mcmp_shared::TableId;
use serde::{de::DeserializeOwned, Serialize};

use crate::tables::Table;

/// Errors from loading or writing a persisted table snapshot. Distinct
/// from [`mcmp_shared::McmpError`] because these never reach an MCMP
/// sender — they happen at process start/shutdown, outside any request
/// (spec §6 "Persisted state").
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error persisting {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt snapshot at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: postcard::Error,
    },
}

fn table_path(base: &Path, table_name: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(table_name);
    PathBuf::from(path)
}

/// Write every occupied slot of `table` to `<base>.<table_name>` as a
/// `postcard`-encoded snapshot. No journal (spec §6: "there is no
/// journal") — this file is the entire persisted state for that table.
pub fn save_table<T: Serialize + Clone>(
    base: &Path,
    table_name: &str,
    table: &Table<T>,
) -> Result<(), PersistError> {
    let path = table_path(base, table_name);
    let rows: Vec<(TableId, T)> = table.iter().map(|(id, v)| (id, v.clone())).collect();
    let bytes = postcard::to_stdvec(&rows).expect("in-memory rows always encode");
    fs::write(&path, bytes).map_err(|source| PersistError::Io { path, source })
}

/// Load a snapshot written by [`save_table`] into a freshly constructed
/// `Table<T>` of the given capacity. Missing files mean "nothing
/// persisted yet" and yield an empty table rather than an error.
pub fn load_table<T: DeserializeOwned>(
    base: &Path,
    table_name: &str,
    capacity: usize,
) -> Result<Table<T>, PersistError> {
    let path = table_path(base, table_name);
    let mut table = Table::new(capacity);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(table),
        Err(source) => return Err(PersistError::Io { path, source }),
    };
    let rows: Vec<(TableId, T)> =
        postcard::from_bytes(&bytes).map_err(|source| PersistError::Decode { path, source })?;
    for (id, value) in rows {
        table.put(id, value);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_table_through_a_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("manager");

        let mut table: Table<String> = Table::new(4);
        let id = table.allocate("hello".to_string()).unwrap();
        save_table(&base, "greeting", &table).unwrap();

        let loaded: Table<String> = load_table(&base, "greeting", 4).unwrap();
        assert_eq!(loaded.read(id), Some(&"hello".to_string()));
    }

    #[test]
    fn loading_a_missing_snapshot_yields_an_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("manager");
        let loaded: Table<String> = load_table(&base, "greeting", 4).unwrap();
        assert_eq!(loaded.len(), 0);
    }
}
