use crate::{AuthzError, Principal};

/// Refuses a second review by the same author for one title.
///
/// `existing_authors` are the author ids of reviews already stored for the
/// title. Only the creation path calls this; updates of an existing review
/// never do. The unique index on `(title_id, author_id)` remains the
/// authority when two creations race.
pub fn validate_create<I>(principal: &Principal, existing_authors: I) -> Result<(), AuthzError>
where
    I: IntoIterator<Item = i32>,
{
    let author_id = assign_author_on_create(principal)?;
    if existing_authors.into_iter().any(|id| id == author_id) {
        return Err(AuthzError::DuplicateReview);
    }
    Ok(())
}

/// The author of a new review or comment is always the authenticated caller.
pub fn assign_author_on_create(principal: &Principal) -> Result<i32, AuthzError> {
    principal.user_id().ok_or(AuthzError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn first_review_is_accepted() {
        let principal = Principal::authenticated(5, Role::User);
        assert_eq!(validate_create(&principal, [1, 2, 3]), Ok(()));
        assert_eq!(validate_create(&principal, []), Ok(()));
    }

    #[test]
    fn second_review_is_rejected() {
        let principal = Principal::authenticated(5, Role::User);
        assert_eq!(
            validate_create(&principal, [1, 5]),
            Err(AuthzError::DuplicateReview)
        );
    }

    #[test]
    fn moderators_get_no_exemption() {
        let principal = Principal::authenticated(5, Role::Moderator);
        assert_eq!(
            validate_create(&principal, [5]),
            Err(AuthzError::DuplicateReview)
        );
    }

    #[test]
    fn anonymous_cannot_author() {
        let principal = Principal::from_parts(Some(5), false, true, true, Role::Admin);
        assert_eq!(
            assign_author_on_create(&principal),
            Err(AuthzError::Unauthenticated)
        );
    }
}
