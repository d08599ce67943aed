//! Authorization primitives for the review catalog.
//!
//! Every decision here is a pure function of the request method, the caller
//! ([`Principal`]) and, for object-level checks, the target [`Resource`].
//! Handlers evaluate the action-level gate first and the object-level gate
//! only once the target instance has been loaded.

mod ownership;
mod policy;
mod principal;

use thiserror::Error;

pub use ownership::{assign_author_on_create, validate_create};
pub use policy::{Access, Policy, Resource, authorize};
pub use principal::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication credentials were not provided")]
    Unauthenticated,
    #[error("{policy} denied {access} access")]
    Denied { policy: Policy, access: Access },
    #[error("you can only leave one review per title")]
    DuplicateReview,
}
