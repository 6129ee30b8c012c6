//! Paper repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide catalog reads (existence, completion backlog, counts) and the
//!   write paths that feed them.
//! - Translate SQLite failures into catalog errors without masking them.
//!
//! # Invariants
//! - Write paths call `Paper::validate()` before any SQL mutation.
//! - Read paths reject invalid persisted rows instead of skipping them.
//! - A missing row is `false`/`None`/`0`; a storage failure is always `Err`.
//! - Category labels are trimmed, lowercased and deduplicated.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::paper::{Paper, PaperId, PaperValidationError, NO_ABSTRACT};
use rusqlite::{params, Connection, ErrorCode, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PAPER_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    mendeley_id,
    year,
    abstract,
    publication_outlet,
    doi,
    mendeley_url,
    categories,
    identifiers,
    issue,
    pages,
    stats,
    paper_type,
    volume,
    public_file_hash,
    paper_topic,
    keywords
FROM papers";

const REQUIRED_PAPER_COLUMNS: &[&str] = &[
    "uuid",
    "title",
    "mendeley_id",
    "year",
    "abstract",
    "publication_outlet",
    "doi",
    "mendeley_url",
    "categories",
    "identifiers",
    "issue",
    "pages",
    "stats",
    "paper_type",
    "volume",
    "public_file_hash",
    "paper_topic",
    "keywords",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for paper persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PaperValidationError),
    /// The engine could not serve the request (locked, I/O, unreadable file).
    StorageUnavailable(DbError),
    /// A write would break a schema constraint, e.g. a duplicate `mendeley_id`.
    ConstraintViolation(String),
    Db(DbError),
    NotFound(PaperId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "paper not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted paper data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StorageUnavailable(err) | Self::Db(err) => Some(err),
            Self::ConstraintViolation(_)
            | Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl RepoError {
    /// Whether the failure came from the engine being unreachable or busy.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl From<PaperValidationError> for RepoError {
    fn from(value: PaperValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => {
                let message = match &value {
                    rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
                    other => other.to_string(),
                };
                Self::ConstraintViolation(message)
            }
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::DiskFull
                | ErrorCode::FileLockingProtocolFailed,
            ) => Self::StorageUnavailable(DbError::Sqlite(value)),
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Repository interface for the paper catalog.
pub trait PaperRepository {
    fn create_paper(&self, paper: &Paper) -> RepoResult<PaperId>;
    /// Replaces every stored field of the paper with the same id.
    fn update_paper(&self, paper: &Paper) -> RepoResult<()>;
    fn get_paper(&self, id: PaperId) -> RepoResult<Option<Paper>>;
    fn get_paper_by_mendeley_id(&self, mendeley_id: &str) -> RepoResult<Option<Paper>>;
    /// Exact-match existence check on `mendeley_id`.
    fn paper_exists(&self, mendeley_id: &str) -> RepoResult<bool>;
    /// Papers whose abstract is empty, minus papers marked `No abstract.`.
    fn list_papers_to_complete(&self) -> RepoResult<Vec<Paper>>;
    /// Total count, or the count of papers associated with `category`.
    fn count_papers(&self, category: Option<&str>) -> RepoResult<u64>;
    /// Replaces the whole category set of a paper in one transaction.
    fn set_paper_categories(&self, id: PaperId, categories: &[String]) -> RepoResult<()>;
    fn list_paper_categories(&self, id: PaperId) -> RepoResult<Vec<String>>;
    fn list_categories(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed paper repository.
pub struct SqlitePaperRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePaperRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is not current.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` for damaged schemas.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PaperRepository for SqlitePaperRepository<'_> {
    fn create_paper(&self, paper: &Paper) -> RepoResult<PaperId> {
        paper.validate()?;

        self.conn.execute(
            "INSERT INTO papers (
                uuid,
                title,
                mendeley_id,
                year,
                abstract,
                publication_outlet,
                doi,
                mendeley_url,
                categories,
                identifiers,
                issue,
                pages,
                stats,
                paper_type,
                volume,
                public_file_hash,
                paper_topic,
                keywords
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18);",
            params![
                paper.id.to_string(),
                paper.title.as_str(),
                paper.mendeley_id.as_deref(),
                paper.year,
                paper.abstract_text.as_str(),
                paper.publication_outlet.as_str(),
                paper.doi.as_str(),
                paper.mendeley_url.as_str(),
                paper.categories.as_str(),
                paper.identifiers.as_str(),
                paper.issue.as_str(),
                paper.pages.as_str(),
                paper.stats.as_str(),
                paper.paper_type.as_str(),
                paper.volume.as_str(),
                paper.public_file_hash.as_str(),
                paper.paper_topic.as_str(),
                paper.keywords.as_str(),
            ],
        )?;

        Ok(paper.id)
    }

    fn update_paper(&self, paper: &Paper) -> RepoResult<()> {
        paper.validate()?;

        let changed = self.conn.execute(
            "UPDATE papers
             SET
                title = ?1,
                mendeley_id = ?2,
                year = ?3,
                abstract = ?4,
                publication_outlet = ?5,
                doi = ?6,
                mendeley_url = ?7,
                categories = ?8,
                identifiers = ?9,
                issue = ?10,
                pages = ?11,
                stats = ?12,
                paper_type = ?13,
                volume = ?14,
                public_file_hash = ?15,
                paper_topic = ?16,
                keywords = ?17,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?18;",
            params![
                paper.title.as_str(),
                paper.mendeley_id.as_deref(),
                paper.year,
                paper.abstract_text.as_str(),
                paper.publication_outlet.as_str(),
                paper.doi.as_str(),
                paper.mendeley_url.as_str(),
                paper.categories.as_str(),
                paper.identifiers.as_str(),
                paper.issue.as_str(),
                paper.pages.as_str(),
                paper.stats.as_str(),
                paper.paper_type.as_str(),
                paper.volume.as_str(),
                paper.public_file_hash.as_str(),
                paper.paper_topic.as_str(),
                paper.keywords.as_str(),
                paper.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(paper.id));
        }

        Ok(())
    }

    fn get_paper(&self, id: PaperId) -> RepoResult<Option<Paper>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PAPER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_paper_row(row)?));
        }

        Ok(None)
    }

    fn get_paper_by_mendeley_id(&self, mendeley_id: &str) -> RepoResult<Option<Paper>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PAPER_SELECT_SQL} WHERE mendeley_id = ?1;"))?;
        let mut rows = stmt.query([mendeley_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_paper_row(row)?));
        }

        Ok(None)
    }

    fn paper_exists(&self, mendeley_id: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM papers
                WHERE mendeley_id = ?1
            );",
            [mendeley_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_papers_to_complete(&self) -> RepoResult<Vec<Paper>> {
        // The exclusion can never remove a row selected by the first clause;
        // both are kept so the result stays "pending minus no-abstract".
        let mut stmt = self.conn.prepare(&format!(
            "{PAPER_SELECT_SQL}
             WHERE abstract = ?1
               AND NOT (abstract = ?2)
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query(params!["", NO_ABSTRACT])?;
        let mut papers = Vec::new();
        while let Some(row) = rows.next()? {
            papers.push(parse_paper_row(row)?);
        }

        Ok(papers)
    }

    fn count_papers(&self, category: Option<&str>) -> RepoResult<u64> {
        let count: i64 = match category {
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM papers;", [], |row| row.get(0))?,
            Some(raw) => {
                let Some(name) = normalize_category(raw) else {
                    return Ok(0);
                };
                self.conn.query_row(
                    "SELECT COUNT(*)
                     FROM papers p
                     WHERE EXISTS (
                        SELECT 1
                        FROM paper_categories pc
                        INNER JOIN categories c ON c.id = pc.category_id
                        WHERE pc.paper_uuid = p.uuid
                          AND c.name = ?1 COLLATE NOCASE
                     );",
                    [name.as_str()],
                    |row| row.get(0),
                )?
            }
        };

        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative paper count `{count}`")))
    }

    fn set_paper_categories(&self, id: PaperId, categories: &[String]) -> RepoResult<()> {
        let id_text = id.to_string();
        let categories = normalize_categories(categories);
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !paper_exists_in_tx(&tx, &id_text)? {
            return Err(RepoError::NotFound(id));
        }

        tx.execute(
            "DELETE FROM paper_categories WHERE paper_uuid = ?1;",
            [id_text.as_str()],
        )?;

        for name in &categories {
            tx.execute(
                "INSERT OR IGNORE INTO categories (name) VALUES (?1);",
                [name.as_str()],
            )?;
            tx.execute(
                "INSERT INTO paper_categories (paper_uuid, category_id)
                 SELECT ?1, id
                 FROM categories
                 WHERE name = ?2 COLLATE NOCASE;",
                params![id_text.as_str(), name.as_str()],
            )?;
        }

        tx.execute(
            "UPDATE papers
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id_text.as_str()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn list_paper_categories(&self, id: PaperId) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.name
             FROM paper_categories pc
             INNER JOIN categories c ON c.id = pc.category_id
             WHERE pc.paper_uuid = ?1
             ORDER BY c.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            names.push(name.to_lowercase());
        }
        Ok(names)
    }

    fn list_categories(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM categories ORDER BY name COLLATE NOCASE ASC;")?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get("name")?;
            names.push(name.to_lowercase());
        }
        Ok(names)
    }
}

/// Normalizes one category label; blank labels yield `None`.
pub fn normalize_category(category: &str) -> Option<String> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts category labels.
pub fn normalize_categories(categories: &[String]) -> Vec<String> {
    categories
        .iter()
        .filter_map(|category| normalize_category(category))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn parse_paper_row(row: &Row<'_>) -> RepoResult<Paper> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in papers.uuid"))
    })?;

    let year = match row.get::<_, Option<i64>>("year")? {
        Some(value) => Some(u32::try_from(value).map_err(|_| {
            RepoError::InvalidData(format!("invalid year `{value}` in papers.year"))
        })?),
        None => None,
    };

    let paper = Paper {
        id,
        title: row.get("title")?,
        mendeley_id: row.get("mendeley_id")?,
        year,
        abstract_text: row.get("abstract")?,
        publication_outlet: row.get("publication_outlet")?,
        doi: row.get("doi")?,
        mendeley_url: row.get("mendeley_url")?,
        categories: row.get("categories")?,
        identifiers: row.get("identifiers")?,
        issue: row.get("issue")?,
        pages: row.get("pages")?,
        stats: row.get("stats")?,
        paper_type: row.get("paper_type")?,
        volume: row.get("volume")?,
        public_file_hash: row.get("public_file_hash")?,
        paper_topic: row.get("paper_topic")?,
        keywords: row.get("keywords")?,
    };
    paper
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("paper {uuid_text}: {err}")))?;
    Ok(paper)
}

fn paper_exists_in_tx(tx: &Transaction<'_>, paper_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM papers WHERE uuid = ?1);",
        [paper_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["papers", "categories", "paper_categories"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for &column in REQUIRED_PAPER_COLUMNS {
        if !table_has_column(conn, "papers", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "papers",
                column,
            });
        }
    }

    for column in ["paper_uuid", "category_id"] {
        if !table_has_column(conn, "paper_categories", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "paper_categories",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{normalize_categories, normalize_category, RepoError};
    use rusqlite::ffi;

    #[test]
    fn normalize_category_trims_and_lowercases() {
        assert_eq!(
            normalize_category("  Computer Science "),
            Some("computer science".to_string())
        );
        assert_eq!(normalize_category("   "), None);
    }

    #[test]
    fn normalize_categories_dedups_case_insensitively() {
        let input = vec![
            "Biology".to_string(),
            "biology ".to_string(),
            "".to_string(),
            "Arts".to_string(),
        ];
        assert_eq!(normalize_categories(&input), vec!["arts", "biology"]);
    }

    #[test]
    fn busy_sqlite_errors_classify_as_storage_unavailable() {
        let busy = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None);
        assert!(RepoError::from(busy).is_storage_unavailable());

        let unique = rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed: papers.mendeley_id".to_string()),
        );
        match RepoError::from(unique) {
            RepoError::ConstraintViolation(message) => assert!(message.contains("mendeley_id")),
            other => panic!("unexpected error: {other}"),
        }

        let misuse = rusqlite::Error::InvalidQuery;
        assert!(matches!(RepoError::from(misuse), RepoError::Db(_)));
    }
}
