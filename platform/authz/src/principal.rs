#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The caller of an action, authenticated or anonymous.
///
/// `is_admin` and `is_moderator` are derived once at construction so that
/// policies never compare role strings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Principal {
    user_id: Option<i32>,
    is_authenticated: bool,
    is_staff: bool,
    is_superuser: bool,
    role: Role,
    is_admin: bool,
    is_moderator: bool,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::from_parts(None, false, false, false, Role::User)
    }

    pub fn authenticated(user_id: i32, role: Role) -> Self {
        Self::from_parts(Some(user_id), true, false, false, role)
    }

    /// Builds a principal from raw attributes. Used by token resolution and
    /// by tests that need unusual combinations (e.g. an admin role on an
    /// unauthenticated caller).
    pub fn from_parts(
        user_id: Option<i32>,
        is_authenticated: bool,
        is_staff: bool,
        is_superuser: bool,
        role: Role,
    ) -> Self {
        Self {
            user_id,
            is_authenticated,
            is_staff,
            is_superuser,
            role,
            is_admin: is_staff || role == Role::Admin,
            is_moderator: role == Role::Moderator,
        }
    }

    pub fn with_staff(self, is_staff: bool) -> Self {
        Self::from_parts(
            self.user_id,
            self.is_authenticated,
            is_staff,
            self.is_superuser,
            self.role,
        )
    }

    pub fn with_superuser(self, is_superuser: bool) -> Self {
        Self::from_parts(
            self.user_id,
            self.is_authenticated,
            self.is_staff,
            is_superuser,
            self.role,
        )
    }

    /// Authenticated callers only; anonymous principals never carry an id
    /// that policies may match against.
    pub fn user_id(&self) -> Option<i32> {
        if self.is_authenticated { self.user_id } else { None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn is_moderator(&self) -> bool {
        self.is_moderator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_flag_counts_as_admin() {
        let principal = Principal::authenticated(1, Role::User).with_staff(true);
        assert!(principal.is_admin());
        assert!(!principal.is_moderator());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Moderator, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("ADMIN"), None);
    }

    #[test]
    fn anonymous_hides_user_id() {
        let principal = Principal::from_parts(Some(7), false, false, false, Role::Admin);
        assert_eq!(principal.user_id(), None);
    }
}
