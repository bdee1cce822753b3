//! Accounts: sign up with e-mail verification, sign in, password reset and
//! leaving the site. Profile edits live in [`profile`].

pub mod profile;

use crate::app_config;
use crate::community;
use crate::email::{self, templates};
use crate::error::ServiceError;
use crate::orm::user_sns::SnsPlatform;
use crate::orm::{
    user_avatars, user_backdrops, user_password_resets, user_sns, user_verification_emails, users,
};
use crate::session::{hash_password, verify_password};
use chrono::{Duration, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    entity::*, query::*, ConnectionTrait, DatabaseConnection, Iterable, PaginatorTrait,
    TransactionTrait,
};
use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Phrase a user must type to delete their account.
pub const GOODBYE_CONFIRMATION: &str = "탈퇴하는데 동의합니다";

pub const DEFAULT_AVATAR_FILENAME: &str = "default_avatar.jpg";
pub const DEFAULT_AVATAR_URL: &str = "/auth/static/images/avatar/default_avatar.jpg";
pub const DEFAULT_BACKDROP_FILENAME: &str = "default_backdrop.jpg";
pub const DEFAULT_BACKDROP_URL: &str = "/auth/static/images/backdrop/default_backdrop.jpg";

const PASSWORD_SPECIALS: &str = "`~!@#$%^&*()_+-=";

static NICKNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[가-힣a-zA-Z0-9_-]{2,20}$").expect("nickname pattern"));

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn new_vcode() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn policy_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// 8 to 30 characters with an upper and a lower case letter, a digit and
/// one of `` `~!@#$%^&*()_+-= ``. Nothing else is allowed.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(8..=30).contains(&len) {
        return Err(policy_error(
            "password_length",
            "Password must be 8 to 30 characters",
        ));
    }

    let (mut upper, mut lower, mut digit, mut special) = (false, false, false, false);
    for c in password.chars() {
        if c.is_ascii_uppercase() {
            upper = true;
        } else if c.is_ascii_lowercase() {
            lower = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else if PASSWORD_SPECIALS.contains(c) {
            special = true;
        } else {
            return Err(policy_error(
                "password_charset",
                "Password contains a character that is not allowed",
            ));
        }
    }

    if upper && lower && digit && special {
        Ok(())
    } else {
        Err(policy_error(
            "password_strength",
            "Password needs upper and lower case letters, a digit and a symbol",
        ))
    }
}

/// 2 to 20 Hangul syllables, ASCII letters, digits, `-` or `_`.
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    if NICKNAME_REGEX.is_match(nickname) {
        Ok(())
    } else {
        Err(policy_error(
            "nickname",
            "Nickname must be 2 to 20 letters, digits, - or _",
        ))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpForm {
    #[validate(email)]
    pub username: String,
    #[validate(custom = "validate_nickname")]
    pub nickname: String,
    #[validate(custom = "validate_password")]
    pub password: String,
}

/// Active account by sign-in name.
pub async fn find_user_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<Option<users::Model>, ServiceError> {
    Ok(users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .filter(users::Column::DeletedAt.is_null())
        .one(db)
        .await?)
}

pub async fn get_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<users::Model, ServiceError> {
    users::Entity::find_by_id(user_id)
        .filter(users::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("User"))
}

async fn nickname_taken<C: ConnectionTrait>(db: &C, nickname: &str) -> Result<bool, ServiceError> {
    Ok(users::Entity::find()
        .filter(users::Column::Nickname.eq(nickname))
        .count(db)
        .await?
        > 0)
}

async fn username_taken<C: ConnectionTrait>(db: &C, username: &str) -> Result<bool, ServiceError> {
    Ok(users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .count(db)
        .await?
        > 0)
}

/// Creates an unverified account with the default avatar, backdrop and
/// empty profile links, then mails the verification link.
///
/// Taken names answer 400 with an `HX-Trigger` JSON object naming each
/// clash, e.g. `{"username-exists":"","nickname-exists":""}`.
pub async fn sign_up(db: &DatabaseConnection, form: &SignUpForm) -> Result<users::Model, ServiceError> {
    form.validate()?;

    let mut clashes = serde_json::Map::new();
    if username_taken(db, &form.username).await? {
        clashes.insert("username-exists".to_owned(), "".into());
    }
    if nickname_taken(db, &form.nickname).await? {
        clashes.insert("nickname-exists".to_owned(), "".into());
    }
    if !clashes.is_empty() {
        log::warn!("Sign up rejected for {}: name taken", form.username);
        return Err(ServiceError::validation("Username or nickname is taken")
            .with_trigger(serde_json::Value::Object(clashes).to_string()));
    }

    let password = hash_password(&form.password).map_err(|e| {
        log::error!("Failed to hash password: {}", e);
        ServiceError::Internal("password hashing failed".to_owned())
    })?;
    let created_at = now();
    let vcode = new_vcode();

    let txn = db.begin().await?;
    let user = users::ActiveModel {
        username: Set(form.username.clone()),
        nickname: Set(form.nickname.clone()),
        password: Set(password),
        active: Set(true),
        verified: Set(false),
        role: Set(users::Role::User),
        about_me: Set(None),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    user_avatars::ActiveModel {
        user_id: Set(user.id),
        url: Set(DEFAULT_AVATAR_URL.to_owned()),
        filename: Set(DEFAULT_AVATAR_FILENAME.to_owned()),
        original_filename: Set(Some(DEFAULT_AVATAR_FILENAME.to_owned())),
        mimetype: Set(Some("image/jpeg".to_owned())),
        filesize: Set(None),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    user_backdrops::ActiveModel {
        user_id: Set(user.id),
        url: Set(DEFAULT_BACKDROP_URL.to_owned()),
        filename: Set(DEFAULT_BACKDROP_FILENAME.to_owned()),
        original_filename: Set(Some(DEFAULT_BACKDROP_FILENAME.to_owned())),
        mimetype: Set(Some("image/jpeg".to_owned())),
        filesize: Set(None),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for platform in SnsPlatform::iter() {
        user_sns::ActiveModel {
            user_id: Set(user.id),
            platform: Set(platform),
            link: Set(String::new()),
            public: Set(false),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    user_verification_emails::ActiveModel {
        user_id: Set(user.id),
        vcode: Set(vcode.clone()),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    log::info!("User {} signed up as {}", user.id, user.nickname);

    let site = app_config::site();
    match templates::verification_email(
        &site.name,
        &site.base_url,
        &user.username,
        &user.nickname,
        &vcode,
    ) {
        Ok(mail) => email::spawn_email(mail),
        Err(e) => log::error!("Cannot build verification link from {}: {}", site.base_url, e),
    }

    Ok(user)
}

/// Marks the account verified. Any mismatch is a plain 400.
pub async fn verify_sign_up(
    db: &DatabaseConnection,
    username: &str,
    vcode: &str,
) -> Result<users::Model, ServiceError> {
    let bad_link = || ServiceError::validation("Invalid verification link");

    let user = find_user_by_username(db, username)
        .await?
        .ok_or_else(bad_link)?;
    let verification = user_verification_emails::Entity::find()
        .filter(user_verification_emails::Column::UserId.eq(user.id))
        .one(db)
        .await?
        .ok_or_else(bad_link)?;
    if verification.vcode != vcode {
        return Err(bad_link());
    }

    let txn = db.begin().await?;
    let mut active: users::ActiveModel = user.into();
    active.verified = Set(true);
    let user = active.update(&txn).await?;
    verification.delete(&txn).await?;
    txn.commit().await?;

    log::info!("User {} verified their e-mail", user.id);
    Ok(user)
}

/// Checks credentials. Unknown names and wrong passwords are told apart so
/// the sign-in modal can point at the right field.
pub async fn sign_in(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<users::Model, ServiceError> {
    let user = find_user_by_username(db, username)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized.with_trigger("username-dont-exist"))?;

    if !verify_password(password, &user.password) {
        log::warn!("Wrong password for user {}", user.id);
        return Err(ServiceError::Unauthorized.with_trigger("password-dont-match"));
    }
    if !user.active {
        return Err(ServiceError::Forbidden);
    }
    if !user.verified {
        return Err(ServiceError::Unauthorized.with_trigger("email-not-verified"));
    }

    Ok(user)
}

/// Deletes the account with everything it wrote, cast or caused, in one
/// transaction.
pub async fn goodbye(
    db: &DatabaseConnection,
    user_id: i32,
    password: &str,
    confirm: &str,
) -> Result<(), ServiceError> {
    if confirm != GOODBYE_CONFIRMATION {
        return Err(ServiceError::validation("Confirmation phrase does not match"));
    }

    let user = get_user(db, user_id).await?;
    if !verify_password(password, &user.password) {
        return Err(ServiceError::Unauthorized.with_trigger("password-dont-match"));
    }

    let txn = db.begin().await?;
    community::purge_user_content(&txn, user.id).await?;
    users::Entity::delete_by_id(user.id).exec(&txn).await?;
    txn.commit().await?;

    log::info!("User {} left", user_id);
    Ok(())
}

/// Issues a fresh reset code, replacing any earlier one, and mails it.
pub async fn forgot_password(
    db: &DatabaseConnection,
    username: &str,
) -> Result<users::Model, ServiceError> {
    let user = find_user_by_username(db, username)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User").with_trigger("username-dont-exist"))?;
    let vcode = new_vcode();

    let txn = db.begin().await?;
    user_password_resets::Entity::delete_many()
        .filter(user_password_resets::Column::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    user_password_resets::ActiveModel {
        user_id: Set(user.id),
        vcode: Set(vcode.clone()),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    let site = app_config::site();
    let minutes = app_config::security().password_reset_minutes;
    match templates::password_reset_email(
        &site.name,
        &site.base_url,
        &user.username,
        &user.nickname,
        &vcode,
        minutes,
    ) {
        Ok(mail) => email::spawn_email(mail),
        Err(e) => log::error!("Cannot build reset link from {}: {}", site.base_url, e),
    }

    Ok(user)
}

/// Resolves a reset link to its user. Expired codes are removed and
/// answered with 410.
async fn check_reset_code(
    db: &DatabaseConnection,
    username: &str,
    vcode: &str,
) -> Result<(users::Model, user_password_resets::Model), ServiceError> {
    let bad_link = || ServiceError::validation("Invalid password reset link");

    let user = find_user_by_username(db, username)
        .await?
        .ok_or_else(bad_link)?;
    let reset = user_password_resets::Entity::find()
        .filter(user_password_resets::Column::UserId.eq(user.id))
        .one(db)
        .await?
        .ok_or_else(bad_link)?;
    if reset.vcode != vcode {
        return Err(bad_link());
    }

    let window = Duration::minutes(app_config::security().password_reset_minutes);
    if now() - reset.created_at > window {
        reset.delete(db).await?;
        return Err(ServiceError::Gone("Password reset link has expired".to_owned()));
    }

    Ok((user, reset))
}

pub async fn verify_forgot_password(
    db: &DatabaseConnection,
    username: &str,
    vcode: &str,
) -> Result<users::Model, ServiceError> {
    let (user, _) = check_reset_code(db, username, vcode).await?;
    Ok(user)
}

/// Sets a new password from a still-valid reset link and burns the code.
pub async fn reset_password(
    db: &DatabaseConnection,
    username: &str,
    vcode: &str,
    newpassword: &str,
) -> Result<(), ServiceError> {
    let (user, reset) = check_reset_code(db, username, vcode).await?;
    validate_password(newpassword).map_err(|e| ServiceError::validation(e.to_string()))?;
    let password = hash_password(newpassword)
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {}", e)))?;

    let txn = db.begin().await?;
    let user_id = user.id;
    let mut active: users::ActiveModel = user.into();
    active.password = Set(password);
    active.update(&txn).await?;
    reset.delete(&txn).await?;
    txn.commit().await?;

    log::info!("User {} reset their password", user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy() {
        assert!(validate_password("Quack!Quack1").is_ok());
        assert!(validate_password("Aa1-").is_err());
        assert!(validate_password("quack!quack1").is_err());
        assert!(validate_password("QUACK!QUACK1").is_err());
        assert!(validate_password("Quack!Quack").is_err());
        assert!(validate_password("QuackQuack1").is_err());
        assert!(validate_password("Quack Quack1!").is_err());
        assert!(validate_password(&format!("Aa1!{}", "a".repeat(27))).is_err());
        assert!(validate_password(&format!("Aa1!{}", "a".repeat(26))).is_ok());
    }

    #[test]
    fn test_nickname_policy() {
        assert!(validate_nickname("덕덕이").is_ok());
        assert!(validate_nickname("duck_2-go").is_ok());
        assert!(validate_nickname("d").is_err());
        assert!(validate_nickname("duck duck").is_err());
        assert!(validate_nickname("duck!").is_err());
        assert!(validate_nickname(&"오".repeat(20)).is_ok());
        assert!(validate_nickname(&"오".repeat(21)).is_err());
    }

    #[test]
    fn test_sign_up_form_validation() {
        let form = SignUpForm {
            username: "duck@example.com".to_owned(),
            nickname: "duck".to_owned(),
            password: "Quack!Quack1".to_owned(),
        };
        assert!(form.validate().is_ok());

        let form = SignUpForm {
            username: "not-an-email".to_owned(),
            nickname: "duck".to_owned(),
            password: "Quack!Quack1".to_owned(),
        };
        let err = form.validate().unwrap_err();
        assert!(err.field_errors().contains_key("username"));
    }

    #[test]
    fn test_vcode_is_simple_hex() {
        let code = new_vcode();
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
