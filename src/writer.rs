use crate::error::CrawlError;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

fn open(path: &Path) -> Result<File, CrawlError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| CrawlError::IOError {
            path: path.display().to_string(),
            source,
        })
}

/// An append-only CSV-shaped writer. Writes a header on creation and flushes after
/// every row so a crash mid-crawl leaves a valid (if truncated) file.
pub struct RowWriter {
    inner: Mutex<BufWriter<File>>,
}

impl RowWriter {
    pub fn create(path: impl AsRef<Path>, header: &[&str]) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let mut w = BufWriter::new(open(path)?);
        writeln!(w, "{}", header.join(",")).map_err(|source| CrawlError::IOError {
            path: path.display().to_string(),
            source,
        })?;
        w.flush().map_err(|source| CrawlError::IOError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { inner: Mutex::new(w) })
    }

    /// Appends one row. Fields are quoted-escaped for embedded commas/quotes.
    pub fn append(&self, fields: &[&str]) {
        let row = fields.iter().map(|f| escape_csv(f)).collect::<Vec<_>>().join(",");
        let mut w = self.inner.lock().expect("row writer mutex poisoned");
        if writeln!(w, "{row}").is_ok() {
            let _ = w.flush();
        }
    }
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// An append-only JSON-object-shaped writer: opens with `{`, each `put` appends one
/// `"key": value` pair with correct comma placement, `close` writes the final `}`.
/// Every call flushes so the file is durable after each entry, at the cost of the
/// object only being valid JSON once `close` has run.
pub struct MapWriter {
    inner: Mutex<MapState>,
}

struct MapState {
    file: BufWriter<File>,
    wrote_any: bool,
}

impl MapWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let mut file = BufWriter::new(open(path)?);
        write!(file, "{{").map_err(|source| CrawlError::IOError {
            path: path.display().to_string(),
            source,
        })?;
        file.flush().ok();
        Ok(Self {
            inner: Mutex::new(MapState { file, wrote_any: false }),
        })
    }

    pub fn put(&self, key: &str, value: &serde_json::Value) {
        let mut state = self.inner.lock().expect("map writer mutex poisoned");
        let prefix = if state.wrote_any { ",\n" } else { "\n" };
        state.wrote_any = true;
        let key_json = serde_json::to_string(key).unwrap_or_else(|_| "\"\"".to_string());
        if write!(state.file, "{prefix}{key_json}: {value}").is_ok() {
            let _ = state.file.flush();
        }
    }

    pub fn close(self) {
        let mut state = self.inner.into_inner().expect("map writer mutex poisoned");
        let _ = write!(state.file, "\n}}");
        let _ = state.file.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_writer_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let w = RowWriter::create(&path, &["a", "b"]).unwrap();
        w.append(&["1", "2"]);
        w.append(&["x,y", "plain"]);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "a,b\n1,2\n\"x,y\",plain\n");
    }

    #[test]
    fn map_writer_produces_valid_json_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        let w = MapWriter::create(&path).unwrap();
        w.put("A", &serde_json::json!({"v": 1}));
        w.put("B", &serde_json::json!({"v": 2}));
        w.close();
        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["A"]["v"], 1);
        assert_eq!(parsed["B"]["v"], 2);
    }
}
