use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use es_core::{
    Article, CreateOutcome, Error, EventSet, NewArticle, NewSignal, Result, Signal, SignalStorage,
    SignalView,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::sync::Arc;
use crate::{StorageBackend, StorageConfig};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        authors TEXT NOT NULL,
        text TEXT NOT NULL,
        published_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS signals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        article_id INTEGER NOT NULL REFERENCES articles(id),
        sentiment_label TEXT NOT NULL,
        sentiment_score REAL NOT NULL,
        events TEXT NOT NULL,
        score REAL NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_signals_created_at ON signals (created_at DESC, id DESC)",
    // Add future migrations here
];

const ARTICLE_COLUMNS: &str = "a.id AS a_id, a.url AS a_url, a.title AS a_title, \
    a.authors AS a_authors, a.text AS a_text, a.published_at AS a_published_at, \
    a.created_at AS a_created_at";

const SIGNAL_COLUMNS: &str = "s.id AS s_id, s.article_id AS s_article_id, \
    s.sentiment_label AS s_sentiment_label, s.sentiment_score AS s_sentiment_score, \
    s.events AS s_events, s.score AS s_score, s.created_at AS s_created_at";

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database path should be writable"
    }

    async fn new(config: &StorageConfig) -> Result<Self> where Self: Sized {
        Self::new_with_path(&config.sqlite_path).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| storage_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| storage_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn fetch_article(&self, filter: &str, bind: ArticleKey<'_>) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles a WHERE {} LIMIT 1", ARTICLE_COLUMNS, filter);
        let query = sqlx::query(&sql);
        let query = match bind {
            ArticleKey::Id(id) => query.bind(id),
            ArticleKey::Url(url) => query.bind(url),
        };
        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| storage_error("Failed to load article", e))?;
        row.as_ref().map(article_from_row).transpose()
    }
}

enum ArticleKey<'a> {
    Id(i64),
    Url(&'a str),
}

#[async_trait]
impl SignalStorage for SQLiteStorage {
    async fn find_article_by_url(&self, url: &str) -> Result<Option<Article>> {
        self.fetch_article("a.url = ?", ArticleKey::Url(url)).await
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        self.fetch_article("a.id = ?", ArticleKey::Id(id)).await
    }

    async fn create_article(&self, article: NewArticle) -> Result<CreateOutcome> {
        let created_at = Utc::now().trunc_subsecs(6);
        let authors = serde_json::to_string(&article.authors)?;

        let result = sqlx::query(
            r#"
            INSERT INTO articles (url, title, authors, text, published_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.url)
        .bind(&article.title)
        .bind(&authors)
        .bind(&article.text)
        .bind(article.published_at.map(format_timestamp))
        .bind(format_timestamp(created_at))
        .execute(&*self.pool)
        .await;

        match result {
            Ok(done) => Ok(CreateOutcome::Created(Article {
                id: done.last_insert_rowid(),
                url: article.url,
                title: article.title,
                authors: article.authors,
                text: article.text,
                published_at: article.published_at,
                created_at,
            })),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(storage_error("Failed to store article", e)),
        }
    }

    async fn create_signal(&self, signal: NewSignal) -> Result<Signal> {
        let created_at = Utc::now().trunc_subsecs(6);
        let events = serde_json::to_string(&signal.events)?;

        let done = sqlx::query(
            r#"
            INSERT INTO signals (article_id, sentiment_label, sentiment_score, events, score, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signal.article_id)
        .bind(&signal.sentiment_label)
        .bind(signal.sentiment_score)
        .bind(&events)
        .bind(signal.score)
        .bind(format_timestamp(created_at))
        .execute(&*self.pool)
        .await
        .map_err(|e| storage_error("Failed to store signal", e))?;

        Ok(Signal {
            id: done.last_insert_rowid(),
            article_id: signal.article_id,
            sentiment_label: signal.sentiment_label,
            sentiment_score: signal.sentiment_score,
            events: signal.events,
            score: signal.score,
            created_at,
        })
    }

    async fn list_signals(&self, limit: usize, offset: usize) -> Result<Vec<SignalView>> {
        let sql = format!(
            r#"
            SELECT {}, {} FROM signals s
            JOIN articles a ON a.id = s.article_id
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT ? OFFSET ?
            "#,
            SIGNAL_COLUMNS, ARTICLE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| storage_error("Failed to list signals", e))?;

        rows.iter()
            .map(|row| {
                Ok(SignalView {
                    signal: signal_from_row(row)?,
                    article: article_from_row(row)?,
                })
            })
            .collect()
    }
}

fn storage_error(context: &str, e: sqlx::Error) -> Error {
    Error::Storage(format!("{}: {}", context, e))
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("Failed to parse date {:?}: {}", raw, e)))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| storage_error(&format!("Failed to read column {}", name), e))
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let authors: String = column(row, "a_authors")?;
    let published_at: Option<String> = column(row, "a_published_at")?;
    let created_at: String = column(row, "a_created_at")?;

    Ok(Article {
        id: column(row, "a_id")?,
        url: column(row, "a_url")?,
        title: column(row, "a_title")?,
        authors: serde_json::from_str(&authors)?,
        text: column(row, "a_text")?,
        published_at: published_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn signal_from_row(row: &SqliteRow) -> Result<Signal> {
    let events: String = column(row, "s_events")?;
    let created_at: String = column(row, "s_created_at")?;

    Ok(Signal {
        id: column(row, "s_id")?,
        article_id: column(row, "s_article_id")?,
        sentiment_label: column(row, "s_sentiment_label")?,
        sentiment_score: column(row, "s_sentiment_score")?,
        events: serde_json::from_str::<EventSet>(&events)?,
        score: column(row, "s_score")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
