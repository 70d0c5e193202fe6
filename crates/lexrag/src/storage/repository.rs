//! Relational store for documents and their chunks

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Chunk, Document, EmbeddingStatus, ProcessingStatus, SummaryData};

/// Document and chunk persistence used by the pipeline stages
#[cfg_attr(test, mockall::automock)]
pub trait DocumentRepository: Send + Sync {
    /// Insert a new document row
    fn insert_document(&self, document: &Document) -> Result<()>;

    /// Fetch a document by id
    fn get_document(&self, id: &Uuid) -> Result<Option<Document>>;

    /// Overwrite a document row; fails if the row does not exist
    fn update_document(&self, document: &Document) -> Result<()>;

    /// Overwrite a document row only while its stored `processing_status`
    /// is still `expected`. Returns false when the row has moved on.
    fn update_document_if(&self, document: &Document, expected: ProcessingStatus) -> Result<bool>;

    /// Atomically move a `pending` or `failed` document to `processing`.
    /// Returns false when another caller holds it or it is past ingestion.
    fn claim_processing(&self, id: &Uuid) -> Result<bool>;

    /// Write the reset document and delete its chunks in one transaction,
    /// only while both stored statuses still match what the caller observed.
    /// Returns the number of chunks removed, or `None` if the row moved on.
    fn reset_document(
        &self,
        document: &Document,
        expected_processing: ProcessingStatus,
        expected_embedding: EmbeddingStatus,
    ) -> Result<Option<usize>>;

    /// All documents owned by `user_id`, newest first
    fn list_documents(&self, user_id: &str) -> Result<Vec<Document>>;

    /// Insert all chunks or none
    fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Chunks of a document ordered by `chunk_index`
    fn get_chunks(&self, document_id: &Uuid) -> Result<Vec<Chunk>>;

    /// Delete all chunks of a document, returning how many were removed
    fn delete_chunks(&self, document_id: &Uuid) -> Result<usize>;
}

const DOCUMENT_COLUMNS: &str = "id, user_id, title, original_filename, file_type, file_size, \
     file_path, chunks_count, processing_status, embedding_status, summary_data, \
     summary_generated, error_message, created_at, updated_at";

const CHUNK_COLUMNS: &str =
    "id, document_id, user_id, chunk_index, chunk_text, token_count, pinecone_id, created_at";

/// SQLite-backed repository
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::persistence(format!("Failed to open database: {}", e)))?;

        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        repo.migrate()?;
        Ok(repo)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::persistence(format!("Failed to open in-memory database: {}", e)))?;

        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        repo.migrate()?;
        Ok(repo)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            "#,
        )
        .map_err(|e| Error::persistence(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                original_filename TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_path TEXT NOT NULL,
                chunks_count INTEGER NOT NULL DEFAULT 0,
                processing_status TEXT NOT NULL,
                embedding_status TEXT NOT NULL,
                summary_data TEXT,
                summary_generated INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents(user_id);

            CREATE TABLE IF NOT EXISTS document_chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                chunk_text TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                pinecone_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(document_id, chunk_index)
            );

            CREATE INDEX IF NOT EXISTS idx_document_chunks_document_id ON document_chunks(document_id);
            "#,
        )
        .map_err(|e| Error::persistence(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations complete");
        Ok(())
    }
}

impl DocumentRepository for SqliteRepository {
    fn insert_document(&self, document: &Document) -> Result<()> {
        let conn = self.conn.lock();
        let summary_json = summary_to_json(document.summary_data.as_ref())?;

        conn.execute(
            &format!(
                "INSERT INTO documents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                DOCUMENT_COLUMNS
            ),
            params![
                document.id.to_string(),
                document.user_id,
                document.title,
                document.original_filename,
                document.file_type,
                document.file_size as i64,
                document.file_path,
                document.chunks_count as i64,
                document.processing_status.as_str(),
                document.embedding_status.as_str(),
                summary_json,
                document.summary_generated,
                document.error_message,
                document.created_at,
                document.updated_at,
            ],
        )
        .map_err(|e| Error::persistence(format!("Failed to insert document: {}", e)))?;

        Ok(())
    }

    fn get_document(&self, id: &Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();

        let document = conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
                params![id.to_string()],
                row_to_document,
            )
            .optional()
            .map_err(|e| Error::persistence(format!("Failed to get document: {}", e)))?;

        Ok(document)
    }

    fn update_document(&self, document: &Document) -> Result<()> {
        let conn = self.conn.lock();
        let updated = write_document(&conn, document, None, None)?;

        if updated == 0 {
            return Err(Error::DocumentNotFound(document.id.to_string()));
        }

        Ok(())
    }

    fn update_document_if(&self, document: &Document, expected: ProcessingStatus) -> Result<bool> {
        let conn = self.conn.lock();
        Ok(write_document(&conn, document, Some(expected), None)? == 1)
    }

    fn claim_processing(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();

        let claimed = conn
            .execute(
                r#"
                UPDATE documents SET
                    processing_status = 'processing',
                    error_message = NULL,
                    updated_at = ?2
                WHERE id = ?1 AND processing_status IN ('pending', 'failed')
                "#,
                params![id.to_string(), Utc::now()],
            )
            .map_err(|e| Error::persistence(format!("Failed to claim document: {}", e)))?;

        Ok(claimed == 1)
    }

    fn reset_document(
        &self,
        document: &Document,
        expected_processing: ProcessingStatus,
        expected_embedding: EmbeddingStatus,
    ) -> Result<Option<usize>> {
        let mut conn = self.conn.lock();

        let tx = conn
            .transaction()
            .map_err(|e| Error::persistence(format!("Failed to begin transaction: {}", e)))?;

        if write_document(&tx, document, Some(expected_processing), Some(expected_embedding))? == 0 {
            return Ok(None);
        }

        let removed = tx
            .execute(
                "DELETE FROM document_chunks WHERE document_id = ?1",
                params![document.id.to_string()],
            )
            .map_err(|e| Error::persistence(format!("Failed to delete chunks: {}", e)))?;

        tx.commit()
            .map_err(|e| Error::persistence(format!("Failed to commit transaction: {}", e)))?;

        Ok(Some(removed))
    }

    fn list_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM documents WHERE user_id = ?1 ORDER BY created_at DESC",
                DOCUMENT_COLUMNS
            ))
            .map_err(|e| Error::persistence(format!("Failed to prepare query: {}", e)))?;

        let documents = stmt
            .query_map(params![user_id], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::persistence(format!("Failed to list documents: {}", e)))?;

        Ok(documents)
    }

    fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock();

        let tx = conn
            .transaction()
            .map_err(|e| Error::persistence(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO document_chunks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    CHUNK_COLUMNS
                ))
                .map_err(|e| Error::persistence(format!("Failed to prepare insert: {}", e)))?;

            for chunk in chunks {
                stmt.execute(params![
                    chunk.id.to_string(),
                    chunk.document_id.to_string(),
                    chunk.user_id,
                    chunk.chunk_index as i64,
                    chunk.chunk_text,
                    chunk.token_count as i64,
                    chunk.pinecone_id,
                    chunk.created_at,
                ])
                .map_err(|e| {
                    Error::persistence(format!(
                        "Failed to insert chunk {}: {}",
                        chunk.chunk_index, e
                    ))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| Error::persistence(format!("Failed to commit transaction: {}", e)))?;

        tracing::debug!("Inserted {} chunks", chunks.len());
        Ok(())
    }

    fn get_chunks(&self, document_id: &Uuid) -> Result<Vec<Chunk>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM document_chunks WHERE document_id = ?1 ORDER BY chunk_index",
                CHUNK_COLUMNS
            ))
            .map_err(|e| Error::persistence(format!("Failed to prepare query: {}", e)))?;

        let chunks = stmt
            .query_map(params![document_id.to_string()], row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::persistence(format!("Failed to get chunks: {}", e)))?;

        Ok(chunks)
    }

    fn delete_chunks(&self, document_id: &Uuid) -> Result<usize> {
        let conn = self.conn.lock();

        let deleted = conn
            .execute(
                "DELETE FROM document_chunks WHERE document_id = ?1",
                params![document_id.to_string()],
            )
            .map_err(|e| Error::persistence(format!("Failed to delete chunks: {}", e)))?;

        Ok(deleted)
    }
}

/// Update the mutable columns of a document, optionally guarded by its stored statuses
fn write_document(
    conn: &Connection,
    document: &Document,
    expected_processing: Option<ProcessingStatus>,
    expected_embedding: Option<EmbeddingStatus>,
) -> Result<usize> {
    let summary_json = summary_to_json(document.summary_data.as_ref())?;

    conn.execute(
        r#"
        UPDATE documents SET
            title = ?2,
            chunks_count = ?3,
            processing_status = ?4,
            embedding_status = ?5,
            summary_data = ?6,
            summary_generated = ?7,
            error_message = ?8,
            updated_at = ?9
        WHERE id = ?1
            AND (?10 IS NULL OR processing_status = ?10)
            AND (?11 IS NULL OR embedding_status = ?11)
        "#,
        params![
            document.id.to_string(),
            document.title,
            document.chunks_count as i64,
            document.processing_status.as_str(),
            document.embedding_status.as_str(),
            summary_json,
            document.summary_generated,
            document.error_message,
            document.updated_at,
            expected_processing.map(ProcessingStatus::as_str),
            expected_embedding.map(EmbeddingStatus::as_str),
        ],
    )
    .map_err(|e| Error::persistence(format!("Failed to update document: {}", e)))
}

fn summary_to_json(summary: Option<&SummaryData>) -> Result<Option<String>> {
    summary.map(serde_json::to_string).transpose().map_err(Error::from)
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn parse_uuid(row: &Row, column: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(column)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(column, e))
}

fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let processing_status: String = row.get(8)?;
    let embedding_status: String = row.get(9)?;
    let summary_json: Option<String> = row.get(10)?;
    let file_size: i64 = row.get(5)?;
    let chunks_count: i64 = row.get(7)?;
    let created_at: DateTime<Utc> = row.get(13)?;
    let updated_at: DateTime<Utc> = row.get(14)?;

    let summary_data = summary_json
        .map(|json| serde_json::from_str::<SummaryData>(&json))
        .transpose()
        .map_err(|e| conversion_error(10, e))?;

    Ok(Document {
        id: parse_uuid(row, 0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        original_filename: row.get(3)?,
        file_type: row.get(4)?,
        file_size: file_size as u64,
        file_path: row.get(6)?,
        chunks_count: chunks_count as u32,
        processing_status: processing_status
            .parse()
            .map_err(|e| conversion_error(8, e))?,
        embedding_status: embedding_status
            .parse()
            .map_err(|e| conversion_error(9, e))?,
        summary_data,
        summary_generated: row.get(11)?,
        error_message: row.get(12)?,
        created_at,
        updated_at,
    })
}

fn row_to_chunk(row: &Row) -> rusqlite::Result<Chunk> {
    let chunk_index: i64 = row.get(3)?;
    let token_count: i64 = row.get(5)?;

    Ok(Chunk {
        id: parse_uuid(row, 0)?,
        document_id: parse_uuid(row, 1)?,
        user_id: row.get(2)?,
        chunk_index: chunk_index as u32,
        chunk_text: row.get(4)?,
        token_count: token_count as usize,
        pinecone_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}
