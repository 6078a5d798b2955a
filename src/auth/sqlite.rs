use super::{dummy_verify, verify_secret, IdentityProvider, Principal};
use anyhow::anyhow;
use sqlite::{Connection, State};
use std::sync::Mutex;

/// Identities stored in SQLite database. Table is created when missing;
/// rows are maintained outside of the server.
pub(crate) struct SQLiteIdentityProvider {
    connection: Mutex<Connection>,
}

impl SQLiteIdentityProvider {
    pub(crate) fn open(db_path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS identities (
                    nick TEXT PRIMARY KEY,
                    password TEXT NOT NULL,
                    account TEXT
                )",
        )?;
        Ok(SQLiteIdentityProvider {
            connection: Mutex::new(conn),
        })
    }
}

impl IdentityProvider for SQLiteIdentityProvider {
    fn verify(&self, identifier: &str, secret: Option<&str>) -> anyhow::Result<Option<Principal>> {
        let (hash, account) = {
            let db_guard = self
                .connection
                .lock()
                .map_err(|_| anyhow!("identity database lock poisoned"))?;
            let mut statement =
                db_guard.prepare("SELECT password, account FROM identities WHERE nick = ?")?;
            statement.bind((1, identifier))?;
            match statement.next()? {
                State::Row => {
                    let hash: String = statement.read("password")?;
                    let account: Option<String> = statement.read("account")?;
                    (hash, account.unwrap_or_else(|| identifier.to_string()))
                }
                State::Done => {
                    drop(statement);
                    drop(db_guard);
                    dummy_verify(secret);
                    return Ok(None);
                }
            }
        };
        // hash verification runs without holding the database lock.
        verify_secret(&hash, secret, &account)
    }
}
