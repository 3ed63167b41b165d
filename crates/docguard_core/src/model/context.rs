//! Request actor context and role resolution.

use uuid::Uuid;

/// Role of anonymous callers; in a permission list it marks a public field.
pub const PUBLIC_ROLE: &str = "null";
/// Role that can view every field.
pub const ADMIN_ROLE: &str = "admin";

/// Authenticated caller attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUser {
    pub id: String,
    /// Access level used for field visibility (`user`, `admin`, ...).
    pub kind: String,
}

impl ActiveUser {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// Per-request session data consulted by CRUD operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub active_user: Option<ActiveUser>,
}

impl RequestContext {
    /// Context for a caller without an active user.
    pub fn anonymous() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            active_user: None,
        }
    }

    pub fn for_user(user: ActiveUser) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            active_user: Some(user),
        }
    }

    /// Role of the active user, or `"null"` when nobody is signed in.
    pub fn role(&self) -> &str {
        self.active_user
            .as_ref()
            .map_or(PUBLIC_ROLE, |user| user.kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{ActiveUser, RequestContext, PUBLIC_ROLE};

    #[test]
    fn anonymous_context_resolves_public_role() {
        assert_eq!(RequestContext::anonymous().role(), PUBLIC_ROLE);
    }

    #[test]
    fn active_user_kind_is_the_role() {
        let ctx = RequestContext::for_user(ActiveUser::new("u-1", "support"));
        assert_eq!(ctx.role(), "support");
    }

    #[test]
    fn contexts_get_distinct_request_ids() {
        assert_ne!(
            RequestContext::anonymous().request_id,
            RequestContext::anonymous().request_id
        );
    }
}
