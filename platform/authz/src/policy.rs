use std::fmt;

use crate::{AuthzError, Principal};

/// Whether a request only reads or may mutate state.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Access {
    Safe,
    Unsafe,
}

impl Access {
    /// GET, HEAD and OPTIONS are safe; everything else is a write.
    pub fn for_method(method: &str) -> Self {
        if matches!(method, "GET" | "HEAD" | "OPTIONS") {
            Access::Safe
        } else {
            Access::Unsafe
        }
    }

    pub fn is_safe(self) -> bool {
        self == Access::Safe
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Safe => f.write_str("read"),
            Access::Unsafe => f.write_str("write"),
        }
    }
}

/// Ownership of a review or comment, as seen by object-level checks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Resource {
    pub author_id: i32,
}

impl Resource {
    pub fn authored_by(author_id: i32) -> Self {
        Self { author_id }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Policy {
    ReadOnlyPublic,
    AdminWrite,
    StaffOrAdminWrite,
    AuthorOrModeratorOrAdmin,
    SuperuserOrStaffOrAdmin,
    AdminOnly,
}

impl Policy {
    pub fn as_str(self) -> &'static str {
        match self {
            Policy::ReadOnlyPublic => "read-only-public",
            Policy::AdminWrite => "admin-write",
            Policy::StaffOrAdminWrite => "staff-or-admin-write",
            Policy::AuthorOrModeratorOrAdmin => "author-or-moderator-or-admin",
            Policy::SuperuserOrStaffOrAdmin => "superuser-or-staff-or-admin",
            Policy::AdminOnly => "admin-only",
        }
    }

    /// Action-level gate: may this principal touch this resource type at all.
    pub fn has_permission(self, access: Access, principal: &Principal) -> bool {
        let authenticated = principal.is_authenticated();
        match self {
            Policy::ReadOnlyPublic => access.is_safe(),
            Policy::AdminWrite => access.is_safe() || (authenticated && principal.is_admin()),
            Policy::StaffOrAdminWrite => {
                access.is_safe()
                    || (authenticated && (principal.is_staff() || principal.is_admin()))
            }
            Policy::AuthorOrModeratorOrAdmin => access.is_safe() || authenticated,
            Policy::SuperuserOrStaffOrAdmin => {
                authenticated
                    && (principal.is_superuser() || principal.is_staff() || principal.is_admin())
            }
            Policy::AdminOnly => authenticated && principal.is_admin(),
        }
    }

    /// Object-level gate, evaluated after [`Policy::has_permission`] passed.
    pub fn has_object_permission(
        self,
        access: Access,
        principal: &Principal,
        resource: &Resource,
    ) -> bool {
        match self {
            Policy::AuthorOrModeratorOrAdmin => {
                access.is_safe()
                    || (principal.is_authenticated()
                        && (principal.user_id() == Some(resource.author_id)
                            || principal.is_moderator()
                            || principal.is_admin()))
            }
            _ => true,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs both gates. A denial for an anonymous caller is reported as
/// [`AuthzError::Unauthenticated`] so the transport can answer 401 instead of 403.
pub fn authorize(
    policy: Policy,
    access: Access,
    principal: &Principal,
    resource: Option<&Resource>,
) -> Result<(), AuthzError> {
    let allowed = policy.has_permission(access, principal)
        && resource
            .is_none_or(|resource| policy.has_object_permission(access, principal, resource));
    if allowed {
        return Ok(());
    }
    if principal.is_authenticated() {
        Err(AuthzError::Denied { policy, access })
    } else {
        Err(AuthzError::Unauthenticated)
    }
}
