//! Input validation for users, posts, and comments.
//!
//! Each validator returns the first [`ValidationError`] found, checking fields
//! in declaration order.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::identity::decode_public_key;
use crate::types::{Comment, Post, User};

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 80;
/// Longest accepted bio, in characters.
pub const MAX_BIO_LEN: usize = 500;
/// Longest accepted location, in characters.
pub const MAX_LOCATION_LEN: usize = 120;
/// Longest accepted post or comment body, in characters.
pub const MAX_TEXT_LEN: usize = 5_000;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("id must be a valid UUIDv7, got: {0:?}")]
    InvalidId(String),

    #[error("name must not be empty")]
    EmptyName,

    #[error("name must be at most {MAX_NAME_LEN} characters")]
    NameTooLong,

    #[error("email is not a valid address: {0:?}")]
    InvalidEmail(String),

    #[error("bio must be at most {MAX_BIO_LEN} characters")]
    BioTooLong,

    #[error("location must be at most {MAX_LOCATION_LEN} characters")]
    LocationTooLong,

    #[error("{0} must be an http(s) URL, got: {1:?}")]
    InvalidUrl(&'static str, String),

    #[error("public key is invalid: {0}")]
    InvalidPublicKey(String),

    #[error("text must not be empty")]
    EmptyText,

    #[error("text must be at most {MAX_TEXT_LEN} characters")]
    TextTooLong,
}

pub fn validate_user(user: &User) -> Result<(), ValidationError> {
    validate_uuid_v7(&user.id).map_err(|_| ValidationError::InvalidId(user.id.clone()))?;
    validate_name(&user.name)?;
    validate_email(&user.email)?;
    if let Some(bio) = &user.bio {
        validate_bio(bio)?;
    }
    if let Some(location) = &user.location {
        validate_location(location)?;
    }
    validate_optional_url("profile_picture", user.profile_picture.as_deref())?;
    validate_optional_url("cover_picture", user.cover_picture.as_deref())?;
    decode_public_key(&user.public_key)
        .map_err(|e| ValidationError::InvalidPublicKey(e.to_string()))?;
    Ok(())
}

pub fn validate_post(post: &Post) -> Result<(), ValidationError> {
    validate_uuid_v7(&post.id).map_err(|_| ValidationError::InvalidId(post.id.clone()))?;
    validate_text(&post.text)?;
    validate_optional_url("image", post.image.as_deref())
}

pub fn validate_comment(comment: &Comment) -> Result<(), ValidationError> {
    validate_uuid_v7(&comment.id).map_err(|_| ValidationError::InvalidId(comment.id.clone()))?;
    validate_text(&comment.text)
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_bio(bio: &str) -> Result<(), ValidationError> {
    if bio.chars().count() > MAX_BIO_LEN {
        return Err(ValidationError::BioTooLong);
    }
    Ok(())
}

pub fn validate_location(location: &str) -> Result<(), ValidationError> {
    if location.chars().count() > MAX_LOCATION_LEN {
        return Err(ValidationError::LocationTooLong);
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TextTooLong);
    }
    Ok(())
}

pub fn validate_optional_url(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if !URL_RE.is_match(v) => Err(ValidationError::InvalidUrl(field, v.to_string())),
        _ => Ok(()),
    }
}

/// Whether `s` parses as a version-7 UUID.
pub fn is_uuid_v7(s: &str) -> bool {
    validate_uuid_v7(s).is_ok()
}

// --- helpers -----------------------------------------------------------------

fn validate_uuid_v7(s: &str) -> Result<(), ()> {
    match uuid::Uuid::parse_str(s) {
        Ok(u) if u.get_version_num() == 7 => Ok(()),
        _ => Err(()),
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("invalid url regex"));
