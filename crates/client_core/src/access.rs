use shared::domain::Role;

use crate::AuthState;

/// Outcome of gating a page on the current auth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// A login is in flight; show a spinner rather than deciding.
    Pending,
    RequiresLogin,
    Forbidden,
    Granted,
}

impl AccessDecision {
    pub fn is_granted(self) -> bool {
        self == AccessDecision::Granted
    }
}

/// An empty `allowed` list admits every role.
pub fn evaluate(auth: &AuthState, allowed: &[Role]) -> AccessDecision {
    if auth.is_loading {
        return AccessDecision::Pending;
    }

    let session = match (&auth.session, auth.is_authenticated) {
        (Some(session), true) => session,
        _ => return AccessDecision::RequiresLogin,
    };

    let allowed = if allowed.is_empty() {
        &Role::ALL[..]
    } else {
        allowed
    };
    if allowed.contains(&session.role) {
        AccessDecision::Granted
    } else {
        AccessDecision::Forbidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{Session, UserId};

    fn signed_in(role: Role) -> AuthState {
        AuthState {
            session: Some(Session {
                user_id: UserId::new("2"),
                name: "John Doe".into(),
                email: "member@example.com".into(),
                role,
                avatar_url: None,
            }),
            is_authenticated: true,
            ..AuthState::default()
        }
    }

    #[test]
    fn loading_wins_over_everything() {
        let state = AuthState {
            is_loading: true,
            ..signed_in(Role::Admin)
        };
        assert_eq!(evaluate(&state, &[Role::Admin]), AccessDecision::Pending);
    }

    #[test]
    fn anonymous_visitor_must_log_in() {
        assert_eq!(
            evaluate(&AuthState::default(), &[]),
            AccessDecision::RequiresLogin
        );
    }

    #[test]
    fn roles_are_checked_against_the_allow_list() {
        let member = signed_in(Role::Member);
        assert_eq!(evaluate(&member, &[Role::Admin]), AccessDecision::Forbidden);
        assert!(evaluate(&member, &[Role::Member]).is_granted());
        assert!(evaluate(&member, &[]).is_granted());
        assert!(evaluate(&signed_in(Role::Admin), &Role::ALL).is_granted());
    }
}
