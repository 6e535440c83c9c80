//! # User Repository
//!
//! Login accounts. Passwords are stored as Argon2 PHC strings with a
//! random salt; the plain text never touches the database.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use mortar_core::validation::validate_password;
use mortar_core::{NewUser, User};

use crate::error::{DbError, DbResult};

const COLUMNS: &str = "id, username, email, password_hash, is_admin, created_at";

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a user. Username and email must both be unused.
    pub async fn register(&self, user: &NewUser) -> DbResult<User> {
        user.validate()?;
        let password_hash = hash_password(&user.password)?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, is_admin, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user.username.trim())
        .bind(user.email.trim())
        .bind(&password_hash)
        .bind(user.is_admin)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(user_id = id, username = %user.username, is_admin = user.is_admin, "User registered");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("SELECT {} FROM users WHERE username = ?1", COLUMNS))
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Checks a username and password.
    ///
    /// ## Returns
    /// * `Ok(User)` - Credentials match
    /// * `Err(DbError::InvalidCredentials)` - Unknown user or wrong password
    pub async fn verify_credentials(&self, username: &str, password: &str) -> DbResult<User> {
        let user = match self.get_by_username(username).await? {
            Some(user) => user,
            None => {
                debug!(username = %username, "Login for unknown user");
                return Err(DbError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, "Password mismatch");
            return Err(DbError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Replaces a password after checking the current one.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> DbResult<()> {
        let user = self
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("User", user_id))?;

        if !verify_password(current_password, &user.password_hash) {
            return Err(DbError::InvalidCredentials);
        }

        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;

        sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Hashes a password into a PHC string.
fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// A malformed stored hash counts as a mismatch.
fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "Sup3r@secret".to_string(),
            is_admin: false,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Sup3r@secret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Sup3r@secret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("Sup3r@secret", "not a hash"));
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();

        let user = users.register(&new_user("pharma.admin", "admin@example.com")).await.unwrap();
        assert_ne!(user.password_hash, "Sup3r@secret");

        let logged_in = users.verify_credentials("pharma.admin", "Sup3r@secret").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let err = users.verify_credentials("pharma.admin", "Wr0ng@pass").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidCredentials));
        let err = users.verify_credentials("nobody", "Sup3r@secret").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password_and_duplicates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();

        let mut weak = new_user("clerk", "clerk@example.com");
        weak.password = "password".to_string();
        assert_eq!(users.register(&weak).await.unwrap_err().kind(), ErrorKind::Validation);

        users.register(&new_user("clerk", "clerk@example.com")).await.unwrap();
        let err = users
            .register(&new_user("clerk", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(err.user_message(), "This username is already taken.");
        assert_eq!(users.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        let user = users.register(&new_user("clerk", "clerk@example.com")).await.unwrap();

        let err = users
            .change_password(user.id, "Wr0ng@pass", "N3w@password")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidCredentials));

        users
            .change_password(user.id, "Sup3r@secret", "N3w@password")
            .await
            .unwrap();
        assert!(users.verify_credentials("clerk", "N3w@password").await.is_ok());
        assert!(users.verify_credentials("clerk", "Sup3r@secret").await.is_err());
    }
}
