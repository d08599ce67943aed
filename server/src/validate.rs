use once_cell::sync::Lazy;
use platform_api::{ApiError, ApiResult};
use regex::Regex;

pub const USERNAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const PERSON_NAME_MAX: usize = 150;
pub const NAME_MAX: usize = 256;
pub const SLUG_MAX: usize = 50;
pub const SCORE_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

// Hardcoded patterns; a failure here is a source bug.
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+\z").expect("hardcoded username regex is invalid"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid")
});
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("hardcoded slug regex is invalid"));

pub fn required<T>(field: &'static str, value: Option<T>) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::invalid_field(field, "this field is required"))
}

pub fn max_len(field: &'static str, value: &str, max: usize) -> ApiResult<()> {
    if value.chars().count() > max {
        return Err(ApiError::invalid_field(
            field,
            format!("ensure this field has no more than {max} characters"),
        ));
    }
    Ok(())
}

/// Trims and rejects blank input.
pub fn text(field: &'static str, value: &str, max: Option<usize>) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(field, "this field may not be blank"));
    }
    if let Some(max) = max {
        max_len(field, trimmed, max)?;
    }
    Ok(trimmed.to_string())
}

pub fn username(value: &str) -> ApiResult<String> {
    let value = text("username", value, Some(USERNAME_MAX))?;
    if !USERNAME_RE.is_match(&value) {
        return Err(ApiError::invalid_field(
            "username",
            "letters, digits and @/./+/-/_ only",
        ));
    }
    // `me` would shadow the self-profile route.
    if value == "me" {
        return Err(ApiError::invalid_field(
            "username",
            "the username \"me\" is reserved",
        ));
    }
    Ok(value)
}

pub fn email(value: &str) -> ApiResult<String> {
    let value = text("email", value, Some(EMAIL_MAX))?;
    if !EMAIL_RE.is_match(&value) {
        return Err(ApiError::invalid_field("email", "enter a valid email address"));
    }
    Ok(value)
}

pub fn slug(value: &str) -> ApiResult<String> {
    let value = text("slug", value, Some(SLUG_MAX))?;
    if !SLUG_RE.is_match(&value) {
        return Err(ApiError::invalid_field(
            "slug",
            "letters, numbers, underscores or hyphens only",
        ));
    }
    Ok(value)
}

pub fn score(value: i32) -> ApiResult<i32> {
    if !SCORE_RANGE.contains(&value) {
        return Err(ApiError::invalid_field(
            "score",
            format!(
                "score must be between {} and {}",
                SCORE_RANGE.start(),
                SCORE_RANGE.end()
            ),
        ));
    }
    Ok(value)
}

pub fn year(value: i32, current_year: i32) -> ApiResult<i32> {
    if value > current_year {
        return Err(ApiError::invalid_field(
            "year",
            "the release year cannot be in the future",
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert_eq!(username("  ada.l@x+y-z_ ").unwrap(), "ada.l@x+y-z_");
        assert!(username("me").is_err());
        assert!(username("mel").is_ok());
        assert!(username("has space").is_err());
        assert!(username("").is_err());
        assert!(username(&"a".repeat(USERNAME_MAX + 1)).is_err());
    }

    #[test]
    fn emails() {
        assert!(email("ada@example.test").is_ok());
        assert!(email("not-an-email").is_err());
        let long = format!("{}@example.test", "a".repeat(EMAIL_MAX));
        assert!(email(&long).is_err());
    }

    #[test]
    fn slugs() {
        assert!(slug("sci-fi_2").is_ok());
        assert!(slug("sci fi").is_err());
        assert!(slug(&"s".repeat(SLUG_MAX + 1)).is_err());
    }

    #[test]
    fn scores_and_years() {
        assert!(score(0).is_err());
        assert!(score(1).is_ok());
        assert!(score(10).is_ok());
        assert!(score(11).is_err());
        assert!(year(2024, 2024).is_ok());
        assert!(year(2025, 2024).is_err());
    }

    #[test]
    fn required_names_the_field() {
        match required::<String>("text", None) {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, Some("text")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
