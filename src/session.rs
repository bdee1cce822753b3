//! Password hashing and the session cookie's view of the signed-in user.

use crate::orm::users;
use actix_session::Session;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

/// Session key holding the signed-in user's id.
pub const SESSION_USER_KEY: &str = "user_id";

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(Argon2::default);

pub fn get_argon2() -> &'static Argon2<'static> {
    &ARGON2
}

/// Hashes a plain-text password into a PHC string.
pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(get_argon2()
        .hash_password(plain.as_bytes(), &salt)?
        .to_string())
}

/// Checks a plain-text password against a stored hash. Malformed hashes fail.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => get_argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

pub fn login(session: &Session, user_id: i32) -> Result<(), actix_web::Error> {
    session.renew();
    session.insert(SESSION_USER_KEY, user_id)?;
    Ok(())
}

pub fn logout(session: &Session) {
    session.purge();
}

/// Resolves the session to an active, non-deleted user.
pub async fn authenticate_client_by_session(
    db: &DatabaseConnection,
    session: &Session,
) -> Result<Option<users::Model>, DbErr> {
    let user_id = match session.get::<i32>(SESSION_USER_KEY) {
        Ok(Some(id)) => id,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::warn!("Discarding unreadable session: {}", e);
            session.remove(SESSION_USER_KEY);
            return Ok(None);
        }
    };

    users::Entity::find_by_id(user_id)
        .filter(users::Column::Active.eq(true))
        .filter(users::Column::DeletedAt.is_null())
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Quack!Quack1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Quack!Quack1", &hash));
        assert!(!verify_password("quack!quack1", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-hash"));
    }
}
