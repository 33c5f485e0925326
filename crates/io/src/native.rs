// Native .sheet format using SQLite

use std::path::Path;

use rusqlite::{params, Connection};

use tabula_engine::sheet::Sheet;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cells (
    row INTEGER NOT NULL,
    col INTEGER NOT NULL,
    formula TEXT NOT NULL,
    PRIMARY KEY (row, col)
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Format marker stored in `meta`; load refuses files without it.
const FORMAT_MARKER: &str = "tabula-sheet";
const FORMAT_VERSION: &str = "1";

/// Write the sheet to `path`, replacing any existing file.
///
/// Only non-empty cells are stored, one `(row, col, formula)` record each;
/// record order carries no meaning.
pub fn save(sheet: &Sheet, path: &Path) -> Result<(), String> {
    // Delete existing file if present (SQLite will create fresh)
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| e.to_string())?;
    }

    let conn = Connection::open(path).map_err(|e| e.to_string())?;
    conn.execute_batch(SCHEMA).map_err(|e| e.to_string())?;

    let meta = [
        ("format", FORMAT_MARKER.to_string()),
        ("version", FORMAT_VERSION.to_string()),
        ("rows", sheet.rows().to_string()),
        ("cols", sheet.cols().to_string()),
    ];
    for (key, value) in &meta {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| e.to_string())?;
    }

    conn.execute("BEGIN TRANSACTION", [])
        .map_err(|e| e.to_string())?;
    {
        let mut stmt = conn
            .prepare("INSERT INTO cells (row, col, formula) VALUES (?1, ?2, ?3)")
            .map_err(|e| e.to_string())?;
        for (row, col, formula) in sheet.non_empty() {
            stmt.execute(params![row as i64, col as i64, formula])
                .map_err(|e| e.to_string())?;
        }
    }
    conn.execute("COMMIT", []).map_err(|e| e.to_string())?;
    Ok(())
}

/// Read a sheet back from `path`.
///
/// Records are replayed through `set_formula`, so a freshly loaded sheet
/// has every cache dirty and evaluates lazily. A file without the format
/// marker (including any non-SQLite file) is a load failure.
pub fn load(path: &Path) -> Result<Sheet, String> {
    let conn = Connection::open(path).map_err(|e| e.to_string())?;

    let marker: String = conn
        .query_row("SELECT value FROM meta WHERE key = 'format'", [], |r| {
            r.get(0)
        })
        .map_err(|_| format!("{} is not a Tabula sheet file", path.display()))?;
    if marker != FORMAT_MARKER {
        return Err(format!("{} is not a Tabula sheet file", path.display()));
    }

    let rows = meta_usize(&conn, "rows")?;
    let cols = meta_usize(&conn, "cols")?;
    let mut sheet = Sheet::with_size(rows, cols);

    let mut stmt = conn
        .prepare("SELECT row, col, formula FROM cells")
        .map_err(|e| e.to_string())?;
    let records = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| e.to_string())?;

    for record in records {
        let (row, col, formula) = record.map_err(|e| e.to_string())?;
        if row < 0 || col < 0 {
            return Err(format!("corrupt cell record at ({}, {})", row, col));
        }
        sheet.set_formula(row as usize, col as usize, &formula);
    }
    Ok(sheet)
}

fn meta_usize(conn: &Connection, key: &str) -> Result<usize, String> {
    let text: String = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |r| {
            r.get(0)
        })
        .map_err(|e| e.to_string())?;
    text.parse::<usize>()
        .map_err(|_| format!("corrupt meta entry '{}'", key))
}
