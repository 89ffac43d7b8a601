use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{Cnpj, EnrichmentRecord};
use crate::error::EnrichError;

const SELECT_COLUMNS: &str = "SELECT cnpj, inscricao_estadual, razao_social, nome, nome_fantasia, logradouro, cep, uf FROM cnpj_info";

/// SQLite-backed store for enrichment results.
///
/// Every operation opens its own connection and drops it before returning,
/// so no connection outlives a single call.
#[derive(Debug, Clone)]
pub struct Store {
    path: Utf8PathBuf,
}

impl Store {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Whether the database file is present. Read-only commands check this so
    /// they never create an empty database.
    pub fn exists(&self) -> bool {
        self.path.as_std_path().is_file()
    }

    fn connect(&self) -> Result<Connection, EnrichError> {
        Ok(Connection::open(self.path.as_std_path())?)
    }

    pub fn ensure_schema(&self) -> Result<(), EnrichError> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cnpj_info (
                cnpj TEXT PRIMARY KEY,
                inscricao_estadual TEXT,
                razao_social TEXT,
                nome TEXT,
                nome_fantasia TEXT,
                logradouro TEXT,
                cep TEXT,
                uf TEXT
            )",
            [],
        )?;
        Ok(())
    }

    /// Inserts the record, replacing any row with the same key. The write
    /// runs in a transaction; on error nothing is committed.
    pub fn upsert(&self, record: &EnrichmentRecord) -> Result<(), EnrichError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO cnpj_info
                (cnpj, inscricao_estadual, razao_social, nome, nome_fantasia, logradouro, cep, uf)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.cnpj,
                record.state_registration,
                record.legal_name,
                record.alternate_name,
                record.trade_name,
                record.street,
                record.postal_code,
                record.state,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get(&self, cnpj: &Cnpj) -> Result<Option<EnrichmentRecord>, EnrichError> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE cnpj = ?1"),
                params![cnpj.as_str()],
                map_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list(&self) -> Result<Vec<EnrichmentRecord>, EnrichError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY cnpj"))?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<usize, EnrichError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cnpj_info", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| EnrichError::Persistence(format!("row count {count} out of range")))
    }
}

// Columns other than the key are nullable; rows written by other tools may
// carry NULLs.
fn map_row(row: &Row<'_>) -> rusqlite::Result<EnrichmentRecord> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };
    Ok(EnrichmentRecord {
        cnpj: text(0)?,
        state_registration: text(1)?,
        legal_name: text(2)?,
        alternate_name: text(3)?,
        trade_name: text(4)?,
        street: text(5)?,
        postal_code: text(6)?,
        state: text(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_schema_twice() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("cnpj.db")).unwrap();
        let store = Store::new(path);
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
