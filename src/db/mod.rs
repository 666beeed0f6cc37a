use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

/// Read-only view of the course catalog that the scraper depends on.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Look up one course; `Ok(None)` when the id is unknown.
    async fn get_course_by_id(&self, id: i64) -> Result<Option<GolfCourse>>;

    async fn list_courses(&self) -> Result<Vec<GolfCourse>>;
}

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    /// `":memory:"` gives a private in-memory catalog.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Insert a course, or overwrite the existing row with the same id.
    pub fn upsert_course(&self, course: &GolfCourse) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO golf_courses (
                id, name, img, location, booking_software, fetch_url, booking_url
             ) VALUES (?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(id) DO UPDATE SET
                name=excluded.name,
                img=excluded.img,
                location=excluded.location,
                booking_software=excluded.booking_software,
                fetch_url=excluded.fetch_url,
                booking_url=excluded.booking_url",
            params![
                course.id,
                course.name,
                course.img,
                course.location,
                course.booking_software,
                course.fetch_url,
                course.booking_url,
            ],
        )?;
        Ok(())
    }

    /// Load a JSON array of courses (same shape the API serves) into the catalog.
    pub fn load_courses_file(&self, path: &Path) -> Result<usize> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read courses file {}", path.display()))?;
        let courses: Vec<GolfCourse> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse courses file {}", path.display()))?;
        for course in &courses {
            self.upsert_course(course)?;
        }
        Ok(courses.len())
    }

    pub fn get_course(&self, id: i64) -> Result<Option<GolfCourse>> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                "SELECT id, name, img, location, booking_software, fetch_url, booking_url
                 FROM golf_courses WHERE id = ?1",
                params![id],
                map_course,
            )
            .optional()?;
        Ok(course)
    }

    pub fn list_courses(&self) -> Result<Vec<GolfCourse>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, img, location, booking_software, fetch_url, booking_url
             FROM golf_courses ORDER BY id",
        )?;
        let courses = stmt
            .query_map([], map_course)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(courses)
    }
}

#[async_trait]
impl CourseCatalog for Database {
    async fn get_course_by_id(&self, id: i64) -> Result<Option<GolfCourse>> {
        self.get_course(id)
    }

    async fn list_courses(&self) -> Result<Vec<GolfCourse>> {
        Database::list_courses(self)
    }
}

fn map_course(row: &rusqlite::Row) -> rusqlite::Result<GolfCourse> {
    Ok(GolfCourse {
        id: row.get(0)?,
        name: row.get(1)?,
        img: row.get(2)?,
        location: row.get(3)?,
        booking_software: row.get(4)?,
        fetch_url: row.get(5)?,
        booking_url: row.get(6)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS golf_courses (
    id               INTEGER PRIMARY KEY,
    name             TEXT    NOT NULL,
    img              TEXT,
    location         TEXT,
    booking_software TEXT    NOT NULL,
    fetch_url        TEXT    NOT NULL,
    booking_url      TEXT    NOT NULL
);
"#;
