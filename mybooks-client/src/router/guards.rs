//! Navigation guards.
//!
//! The decision functions are pure: they look at the session state and the
//! target route and say whether navigation may proceed. Only the admin check
//! may need the network, when no user is cached yet.

use super::routes::{Route, RouteName};
use crate::models::User;
use crate::services::AuthService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Public,
    Authenticated,
    Admin,
    /// Only for visitors without a session, e.g. the login page.
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: RouteName,
    pub query: Vec<(String, String)>,
}

impl Redirect {
    pub fn to(to: RouteName) -> Self {
        Self {
            to,
            query: Vec::new(),
        }
    }

    /// Send the visitor to the login page, coming back to `target` after.
    pub fn login_returning_to(target: &Route) -> Self {
        Self {
            to: RouteName::Login,
            query: vec![("redirect".to_string(), target.full_path.clone())],
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Path with an encoded query string, e.g. `/login?redirect=%2Fprofile`.
    pub fn location(&self) -> String {
        if self.query.is_empty() {
            return self.to.path().to_string();
        }

        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.to.path(), query.join("&"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(Redirect),
}

impl Navigation {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Navigation::Proceed)
    }
}

pub fn require_auth(authenticated: bool, target: &Route) -> Navigation {
    if authenticated {
        Navigation::Proceed
    } else {
        Navigation::Redirect(Redirect::login_returning_to(target))
    }
}

/// Admin check against the cached user. No cached user means no proof of
/// the role, so access is denied.
pub fn require_admin(authenticated: bool, user: Option<&User>, target: &Route) -> Navigation {
    if !authenticated {
        return Navigation::Redirect(Redirect::login_returning_to(target));
    }
    match user {
        Some(user) if user.is_admin() => Navigation::Proceed,
        _ => Navigation::Redirect(Redirect::to(RouteName::AccessDenied)),
    }
}

pub fn require_guest(authenticated: bool) -> Navigation {
    if authenticated {
        Navigation::Redirect(Redirect::to(RouteName::Home))
    } else {
        Navigation::Proceed
    }
}

pub fn evaluate(guard: Guard, authenticated: bool, user: Option<&User>, target: &Route) -> Navigation {
    match guard {
        Guard::Public => Navigation::Proceed,
        Guard::Authenticated => require_auth(authenticated, target),
        Guard::Admin => require_admin(authenticated, user, target),
        Guard::Guest => require_guest(authenticated),
    }
}

/// Admin check that fetches the profile first when no user is cached.
/// A failed fetch denies access.
pub async fn require_admin_fetching(auth: &AuthService, target: &Route) -> Navigation {
    if !auth.is_authenticated() {
        return Navigation::Redirect(Redirect::login_returning_to(target));
    }

    match auth.ensure_user().await {
        Ok(user) => require_admin(true, Some(&user), target),
        Err(e) => {
            tracing::warn!(kind = e.kind(), "Could not load user for admin check: {}", e);
            Navigation::Redirect(Redirect::to(RouteName::AccessDenied))
        }
    }
}

/// Resolve `full_path` and run its guard against the current session.
pub async fn guard_navigation(auth: &AuthService, full_path: &str) -> (Route, Navigation) {
    let target = Route::resolve(full_path);
    let navigation = match target.guard() {
        Guard::Admin => require_admin_fetching(auth, &target).await,
        guard => evaluate(guard, auth.is_authenticated(), None, &target),
    };

    if let Navigation::Redirect(redirect) = &navigation {
        tracing::debug!(
            route = %target.name,
            to = %redirect.to,
            "Navigation redirected"
        );
    }
    (target, navigation)
}

/// Where to send the visitor once the backend has rejected the session.
/// Nothing happens when the login page is already showing.
pub fn redirect_for_session_expiry(current: &Route) -> Option<Redirect> {
    if current.name == RouteName::Login {
        return None;
    }
    Some(Redirect::login_returning_to(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::sample_user;

    #[test]
    fn anonymous_visitor_is_sent_to_login_with_return_path() {
        let target = Route::resolve("/profile");
        let nav = require_auth(false, &target);

        match nav {
            Navigation::Redirect(redirect) => {
                assert_eq!(redirect.to, RouteName::Login);
                assert_eq!(redirect.query_value("redirect"), Some("/profile"));
                assert_eq!(redirect.location(), "/login?redirect=%2Fprofile");
            }
            other => panic!("unexpected navigation: {:?}", other),
        }
    }

    #[test]
    fn admin_guard_distinguishes_roles() {
        let target = Route::resolve("/admin");
        let admin = sample_user("ROLE_ADMIN");
        let reader = sample_user("USER");

        assert!(require_admin(true, Some(&admin), &target).is_proceed());
        assert_eq!(
            require_admin(true, Some(&reader), &target),
            Navigation::Redirect(Redirect::to(RouteName::AccessDenied))
        );
        assert_eq!(
            require_admin(true, None, &target),
            Navigation::Redirect(Redirect::to(RouteName::AccessDenied))
        );
        assert_eq!(
            require_admin(false, Some(&admin), &target),
            Navigation::Redirect(Redirect::login_returning_to(&target))
        );
    }

    #[test]
    fn guests_only_pages_bounce_sessions_home() {
        assert_eq!(
            require_guest(true),
            Navigation::Redirect(Redirect::to(RouteName::Home))
        );
        assert!(require_guest(false).is_proceed());
    }

    #[test]
    fn expiry_redirect_is_suppressed_on_login() {
        assert!(redirect_for_session_expiry(&Route::resolve("/login?redirect=%2Fadmin")).is_none());

        let redirect = redirect_for_session_expiry(&Route::resolve("/category/3?page=2")).unwrap();
        assert_eq!(redirect.query_value("redirect"), Some("/category/3?page=2"));
    }
}
