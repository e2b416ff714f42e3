//! Authorization policy
//!
//! Every endpoint asks [`decide`] whether an [`Actor`] may perform an
//! [`Action`] on a [`ResourceKind`]. The answer comes from a fixed table
//! ([`rule_for`]) so the whole policy can be read in one place:
//!
//! | resource                  | list / retrieve | create        | update / delete        |
//! |---------------------------|-----------------|---------------|------------------------|
//! | title, genre, category    | anyone          | admin         | admin                  |
//! | review, comment           | anyone          | authenticated | author, moderator, admin |
//! | user                      | admin / owner   | admin         | owner or admin / admin |
//!
//! Superusers count as admins. Moderators have no say over the catalog.

use tracing::debug;

use crate::models::{Role, User};

/// Identity of an authenticated caller, as far as the policy cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
    pub is_superuser: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.role == Role::Admin
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            is_superuser: user.is_superuser,
        }
    }
}

/// Caller of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Authenticated(Principal),
}

impl Actor {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Actor::Anonymous => None,
            Actor::Authenticated(principal) => Some(principal),
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::Authenticated(Principal::from(user))
    }
}

/// Kind of resource an endpoint operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Title,
    Genre,
    Category,
    Review,
    Comment,
    User,
}

/// Operation requested on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Read-only actions
    pub fn is_safe(&self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

/// Requirement attached to a `(ResourceKind, Action)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Anyone, including anonymous callers
    Public,
    /// Any authenticated caller
    Authenticated,
    /// Admin role or superuser
    Admin,
    /// The resource's author, a moderator or an admin
    AuthorOrStaff,
    /// The account owner or an admin
    OwnerOrAdmin,
}

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// The caller must authenticate first
    Unauthenticated,
    /// The caller is known but not allowed
    Forbidden,
}

/// The policy table
pub fn rule_for(kind: ResourceKind, action: Action) -> Rule {
    use Action::*;
    use ResourceKind::*;

    match (kind, action) {
        (Title | Genre | Category, List | Retrieve) => Rule::Public,
        (Title | Genre | Category, Create | Update | Delete) => Rule::Admin,

        (Review | Comment, List | Retrieve) => Rule::Public,
        (Review | Comment, Create) => Rule::Authenticated,
        (Review | Comment, Update | Delete) => Rule::AuthorOrStaff,

        (User, Retrieve | Update) => Rule::OwnerOrAdmin,
        (User, List | Create | Delete) => Rule::Admin,
    }
}

/// Decide whether `actor` may perform `action` on a resource of `kind`
///
/// `owner` is the id of the user owning the target: the author of a review or
/// comment, or the account itself for user resources. Anonymous callers are
/// turned away before it is looked at.
pub fn decide(actor: &Actor, kind: ResourceKind, action: Action, owner: Option<i64>) -> Decision {
    let rule = rule_for(kind, action);
    if rule == Rule::Public {
        return Decision::Allow;
    }

    let Actor::Authenticated(principal) = actor else {
        debug!(?kind, ?action, "access denied: anonymous caller");
        return Decision::Unauthenticated;
    };

    let is_owner = owner == Some(principal.user_id);
    let allowed = match rule {
        Rule::Public | Rule::Authenticated => true,
        Rule::Admin => principal.is_admin(),
        Rule::AuthorOrStaff => principal.is_admin() || principal.is_moderator() || is_owner,
        Rule::OwnerOrAdmin => principal.is_admin() || is_owner,
    };

    if allowed {
        Decision::Allow
    } else {
        debug!(
            user_id = principal.user_id,
            role = %principal.role,
            ?kind,
            ?action,
            "access denied: insufficient role"
        );
        Decision::Forbidden
    }
}

/// Only admins and superusers may change a user's role
pub fn may_assign_role(actor: &Actor) -> bool {
    actor.principal().is_some_and(Principal::is_admin)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: [ResourceKind; 3] = [ResourceKind::Title, ResourceKind::Genre, ResourceKind::Category];
    const CONTENT: [ResourceKind; 2] = [ResourceKind::Review, ResourceKind::Comment];
    const MUTATIONS: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    fn actor(user_id: i64, role: Role) -> Actor {
        Actor::Authenticated(Principal {
            user_id,
            role,
            is_superuser: false,
        })
    }

    fn superuser(user_id: i64) -> Actor {
        Actor::Authenticated(Principal {
            user_id,
            role: Role::User,
            is_superuser: true,
        })
    }

    #[test]
    fn test_anyone_reads_catalog_and_content() {
        for kind in CATALOG.into_iter().chain(CONTENT) {
            for action in [Action::List, Action::Retrieve] {
                assert_eq!(decide(&Actor::Anonymous, kind, action, None), Decision::Allow);
                assert_eq!(decide(&actor(1, Role::User), kind, action, None), Decision::Allow);
            }
        }
    }

    #[test]
    fn test_anonymous_mutations_require_authentication() {
        for kind in CATALOG.into_iter().chain(CONTENT).chain([ResourceKind::User]) {
            for action in MUTATIONS {
                assert_eq!(
                    decide(&Actor::Anonymous, kind, action, Some(1)),
                    Decision::Unauthenticated,
                    "{kind:?} {action:?}"
                );
            }
        }
    }

    #[test]
    fn test_only_admins_mutate_catalog() {
        for kind in CATALOG {
            for action in MUTATIONS {
                assert_eq!(decide(&actor(1, Role::Admin), kind, action, None), Decision::Allow);
                assert_eq!(decide(&superuser(1), kind, action, None), Decision::Allow);
                assert_eq!(decide(&actor(1, Role::User), kind, action, None), Decision::Forbidden);
                assert_eq!(
                    decide(&actor(1, Role::Moderator), kind, action, None),
                    Decision::Forbidden
                );
            }
        }
    }

    #[test]
    fn test_any_authenticated_user_creates_content() {
        for kind in CONTENT {
            for role in [Role::User, Role::Moderator, Role::Admin] {
                assert_eq!(decide(&actor(9, role), kind, Action::Create, None), Decision::Allow);
            }
        }
    }

    #[test]
    fn test_author_edits_own_content() {
        for kind in CONTENT {
            for action in [Action::Update, Action::Delete] {
                assert_eq!(decide(&actor(5, Role::User), kind, action, Some(5)), Decision::Allow);
                assert_eq!(
                    decide(&actor(5, Role::User), kind, action, Some(6)),
                    Decision::Forbidden
                );
            }
        }
    }

    #[test]
    fn test_staff_edits_any_content() {
        for kind in CONTENT {
            for action in [Action::Update, Action::Delete] {
                assert_eq!(decide(&actor(1, Role::Moderator), kind, action, Some(2)), Decision::Allow);
                assert_eq!(decide(&actor(1, Role::Admin), kind, action, Some(2)), Decision::Allow);
                assert_eq!(decide(&superuser(1), kind, action, Some(2)), Decision::Allow);
            }
        }
    }

    #[test]
    fn test_user_management() {
        let admin = actor(1, Role::Admin);
        let moderator = actor(2, Role::Moderator);
        let user = actor(3, Role::User);

        for action in [Action::List, Action::Create, Action::Delete] {
            assert_eq!(decide(&admin, ResourceKind::User, action, Some(3)), Decision::Allow);
            assert_eq!(decide(&moderator, ResourceKind::User, action, Some(3)), Decision::Forbidden);
            assert_eq!(decide(&user, ResourceKind::User, action, Some(3)), Decision::Forbidden);
        }

        for action in [Action::Retrieve, Action::Update] {
            assert_eq!(decide(&user, ResourceKind::User, action, Some(3)), Decision::Allow);
            assert_eq!(decide(&user, ResourceKind::User, action, Some(1)), Decision::Forbidden);
            assert_eq!(decide(&admin, ResourceKind::User, action, Some(3)), Decision::Allow);
        }

        assert_eq!(
            decide(&Actor::Anonymous, ResourceKind::User, Action::List, None),
            Decision::Unauthenticated
        );
        assert_eq!(
            decide(&Actor::Anonymous, ResourceKind::User, Action::Retrieve, None),
            Decision::Unauthenticated
        );
    }

    #[test]
    fn test_role_assignment() {
        assert!(may_assign_role(&actor(1, Role::Admin)));
        assert!(may_assign_role(&superuser(1)));
        assert!(!may_assign_role(&actor(1, Role::Moderator)));
        assert!(!may_assign_role(&actor(1, Role::User)));
        assert!(!may_assign_role(&Actor::Anonymous));
    }

    #[test]
    fn test_safe_actions() {
        assert!(Action::List.is_safe());
        assert!(Action::Retrieve.is_safe());
        assert!(MUTATIONS.iter().all(|a| !a.is_safe()));
    }
}
