//! Account operations — registration, credential lookup, role assignments.
//!
//! Registration inserts the person, their phone numbers, and their role
//! assignments in a single transaction: a duplicate username (or any other
//! failure) leaves no partial rows behind.

use anyhow::Result;
use serde::Serialize;

use super::Database;
use crate::roles::RoleSet;

/// Credential row for login: the stored PHC hash plus the comma-joined
/// role list from the act/role join (empty string when no roles).
#[derive(Serialize, sqlx::FromRow)]
pub struct PersonAuthRow {
    pub username: String,
    pub password: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub roles: String,
}

impl PersonAuthRow {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.fname, self.lname)
    }

    pub fn role_set(&self) -> Result<RoleSet> {
        RoleSet::parse_csv(&self.roles)
    }
}

/// Registration input. `password` is already an Argon2 PHC string.
pub struct NewPerson<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub fname: &'a str,
    pub lname: &'a str,
    pub email: &'a str,
    pub phones: &'a [String],
    pub roles: &'a RoleSet,
}

impl Database {
    // ── Registration ──────────────────────────────────────────────

    /// Register a new account: person + phones + role assignments, one
    /// transaction. A duplicate username surfaces as a unique violation
    /// with no partial side effects.
    pub async fn register_person(&self, person: &NewPerson<'_>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO person (username, password, fname, lname, email)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(person.username)
        .bind(person.password)
        .bind(person.fname)
        .bind(person.lname)
        .bind(person.email)
        .execute(&mut *tx)
        .await?;

        for phone in person.phones {
            sqlx::query("INSERT INTO person_phone (username, phone) VALUES ($1, $2)")
                .bind(person.username)
                .bind(phone)
                .execute(&mut *tx)
                .await?;
        }

        for role in person.roles.iter() {
            sqlx::query("INSERT INTO act (username, role_id) VALUES ($1, $2)")
                .bind(person.username)
                .bind(role.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ── Lookup ────────────────────────────────────────────────────

    /// Fetch a person with their comma-joined role list.
    ///
    /// Returns None for unknown usernames; the login handler collapses
    /// that and a bad password into one generic failure.
    pub async fn get_person_with_roles(&self, username: &str) -> Result<Option<PersonAuthRow>> {
        let row = sqlx::query_as::<_, PersonAuthRow>(
            "SELECT p.username, p.password, p.fname, p.lname, p.email,
                    COALESCE(string_agg(r.role_id, ','), '') AS roles
             FROM person p
             LEFT JOIN act a ON p.username = a.username
             LEFT JOIN role r ON a.role_id = r.role_id
             WHERE p.username = $1
             GROUP BY p.username",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Phone numbers on file for an account.
    pub async fn get_phones(&self, username: &str) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT phone FROM person_phone WHERE username = $1 ORDER BY phone",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The role catalog (seeded reference data).
    pub async fn list_roles(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>("SELECT role_id FROM role ORDER BY role_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn person_exists(&self, username: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM person WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Donor validation for donation intake: the account must exist and
    /// hold the donor role.
    pub async fn is_donor(&self, username: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM act WHERE username = $1 AND role_id = 'donor'",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// "fname lname" for an account, used when echoing intake confirmations.
    pub async fn display_name(&self, username: &str) -> Result<Option<String>> {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT fname || ' ' || lname FROM person WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(name)
    }
}
