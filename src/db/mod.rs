mod migrations;

use rusqlite::{Connection, OptionalExtension};

fn db_path() -> anyhow::Result<std::path::PathBuf> {
    Ok(crate::paths::data_dir()?.join("database.sqlite3"))
}

fn connect() -> anyhow::Result<Connection> {
    let mut conn = Connection::open(db_path()?)?;
    migrations::run(&mut conn)?;
    Ok(conn)
}

pub fn initialize() -> anyhow::Result<()> {
    connect()?;
    Ok(())
}

pub fn reset() -> anyhow::Result<()> {
    let path = db_path()?;
    if path.exists() {
        std::fs::remove_file(&path)?;
        tracing::debug!("removed database file");
    }
    initialize()?;
    Ok(())
}

/// True when `err` is a SQLite UNIQUE violation on `column`
/// (e.g. `"members.domain_name"`).
pub fn is_unique_violation(err: &anyhow::Error, column: &str) -> bool {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, Some(msg))) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.starts_with("UNIQUE constraint failed")
                && msg.contains(column)
        }
        _ => false,
    }
}

/// No member holds the requested domain name.
#[derive(Debug, thiserror::Error)]
#[error("member not found: {0}")]
pub struct NotFound(pub String);

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Member {
    pub id: String,
    pub identifier: String,
    pub display_name: String,
    pub domain_name: String,
    pub referral_code: String,
    pub created_at: String,
    pub updated_at: String,
}

const MEMBER_COLUMNS: &str =
    "id, identifier, display_name, domain_name, referral_code, created_at, updated_at";

fn row_to_member(row: &rusqlite::Row) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        identifier: row.get(1)?,
        display_name: row.get(2)?,
        domain_name: row.get(3)?,
        referral_code: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn insert_member(
    conn: &Connection,
    identifier: &str,
    display_name: &str,
    domain_name: &str,
    referral_code: &str,
) -> anyhow::Result<Member> {
    let id = crate::id::new_id();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO members (id, identifier, display_name, domain_name, referral_code, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![id, identifier, display_name, domain_name, referral_code, &now, &now],
    )?;
    Ok(Member {
        id,
        identifier: identifier.to_string(),
        display_name: display_name.to_string(),
        domain_name: domain_name.to_string(),
        referral_code: referral_code.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

fn find_member(conn: &Connection, domain_name: &str) -> anyhow::Result<Option<Member>> {
    let member = conn
        .query_row(
            &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE domain_name = ?1"),
            rusqlite::params![domain_name],
            row_to_member,
        )
        .optional()?;
    Ok(member)
}

fn domain_taken(conn: &Connection, name: &str) -> anyhow::Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM members WHERE domain_name = ?1)",
        rusqlite::params![name],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn create_member(
    identifier: &str,
    display_name: &str,
    domain_name: &str,
    referral_code: &str,
) -> anyhow::Result<Member> {
    let conn = connect()?;
    insert_member(&conn, identifier, display_name, domain_name, referral_code)
}

pub fn get_member(domain_name: &str) -> anyhow::Result<Member> {
    let conn = connect()?;
    find_member(&conn, domain_name)?
        .ok_or_else(|| NotFound(domain_name.to_string()).into())
}

pub fn list_members() -> anyhow::Result<Vec<Member>> {
    let conn = connect()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members ORDER BY domain_name"
    ))?;
    let members = stmt
        .query_map([], row_to_member)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

pub fn delete_member(domain_name: &str) -> anyhow::Result<()> {
    let conn = connect()?;
    let rows = conn.execute(
        "DELETE FROM members WHERE domain_name = ?1",
        rusqlite::params![domain_name],
    )?;
    if rows == 0 {
        return Err(NotFound(domain_name.to_string()).into());
    }
    Ok(())
}

/// Existence probe for domain allocation. Read-only.
pub fn domain_exists(name: &str) -> anyhow::Result<bool> {
    let conn = connect()?;
    domain_taken(&conn, name)
}
