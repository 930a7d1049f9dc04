use super::guards::Guard;
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_TITLE: &str = "MyBooks - Librairie en ligne";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Home,
    Profile,
    AccessDenied,
    AdminDashboard,
    RegisterSuccess,
    CategoryBooks,
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    NotFound,
}

struct RouteDef {
    name: RouteName,
    pattern: &'static str,
    title: Option<&'static str>,
    guard: Guard,
}

const ROUTES: &[RouteDef] = &[
    RouteDef {
        name: RouteName::Home,
        pattern: "/",
        title: Some("Accueil | MyBooks"),
        guard: Guard::Public,
    },
    RouteDef {
        name: RouteName::Profile,
        pattern: "/profile",
        title: Some("Mon profil | MyBooks"),
        guard: Guard::Authenticated,
    },
    RouteDef {
        name: RouteName::AccessDenied,
        pattern: "/access-denied",
        title: Some("Accès refusé | MyBooks"),
        guard: Guard::Public,
    },
    RouteDef {
        name: RouteName::AdminDashboard,
        pattern: "/admin",
        title: Some("Tableau de bord administrateur | MyBooks"),
        guard: Guard::Admin,
    },
    RouteDef {
        name: RouteName::RegisterSuccess,
        pattern: "/register-success",
        title: Some("Inscription réussie - MyBooks"),
        guard: Guard::Guest,
    },
    RouteDef {
        name: RouteName::CategoryBooks,
        pattern: "/category/:id",
        title: None,
        guard: Guard::Public,
    },
    RouteDef {
        name: RouteName::Login,
        pattern: "/login",
        title: Some("Connexion - MyBooks"),
        guard: Guard::Guest,
    },
    RouteDef {
        name: RouteName::Register,
        pattern: "/register",
        title: Some("Inscription - MyBooks"),
        guard: Guard::Guest,
    },
    RouteDef {
        name: RouteName::ForgotPassword,
        pattern: "/forgot-password",
        title: Some("Mot de passe oublié - MyBooks"),
        guard: Guard::Guest,
    },
    RouteDef {
        name: RouteName::ResetPassword,
        pattern: "/reset-password/:token",
        title: Some("Réinitialisation du mot de passe - MyBooks"),
        guard: Guard::Guest,
    },
    // Catch-all, matched last
    RouteDef {
        name: RouteName::NotFound,
        pattern: "/*",
        title: Some("Page non trouvée | MyBooks"),
        guard: Guard::Public,
    },
];

impl RouteName {
    fn def(self) -> &'static RouteDef {
        ROUTES
            .iter()
            .find(|r| r.name == self)
            .unwrap_or(&ROUTES[ROUTES.len() - 1])
    }

    pub fn guard(self) -> Guard {
        self.def().guard
    }

    pub fn title(self) -> &'static str {
        self.def().title.unwrap_or(DEFAULT_TITLE)
    }

    /// Path of a parameterless route. Parameterized routes return their
    /// pattern, e.g. `/category/:id`.
    pub fn path(self) -> &'static str {
        self.def().pattern
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A navigation target matched against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: RouteName,
    /// Path and query string as requested, used for login redirects.
    pub full_path: String,
    pub params: HashMap<String, String>,
}

impl Route {
    pub fn resolve(full_path: &str) -> Self {
        let path = full_path.split(['?', '#']).next().unwrap_or("/");
        let path = if path.is_empty() { "/" } else { path };

        for def in ROUTES {
            if let Some(params) = match_pattern(def.pattern, path) {
                return Self {
                    name: def.name,
                    full_path: full_path.to_string(),
                    params,
                };
            }
        }

        Self {
            name: RouteName::NotFound,
            full_path: full_path.to_string(),
            params: HashMap::new(),
        }
    }

    pub fn guard(&self) -> Guard {
        self.name.guard()
    }

    pub fn title(&self) -> &'static str {
        self.name.title()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    if pattern == "/*" {
        return Some(HashMap::new());
    }

    let expected: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let actual: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (want, got) in expected.iter().zip(actual.iter()) {
        match want.strip_prefix(':') {
            Some(name) => {
                let value = urlencoding::decode(got).ok()?;
                params.insert(name.to_string(), value.into_owned());
            }
            None if want == got => {}
            None => return None,
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_and_parameterized_routes_resolve() {
        assert_eq!(Route::resolve("/").name, RouteName::Home);
        assert_eq!(Route::resolve("/admin?tab=orders").name, RouteName::AdminDashboard);

        let category = Route::resolve("/category/12");
        assert_eq!(category.name, RouteName::CategoryBooks);
        assert_eq!(category.param("id"), Some("12"));

        let reset = Route::resolve("/reset-password/abc%2Ddef");
        assert_eq!(reset.param("token"), Some("abc-def"));
    }

    #[test]
    fn unknown_paths_fall_through_to_not_found() {
        assert_eq!(Route::resolve("/nowhere/at/all").name, RouteName::NotFound);
        assert_eq!(Route::resolve("/category").name, RouteName::NotFound);
    }

    #[test]
    fn titles_default_when_unset() {
        assert_eq!(RouteName::CategoryBooks.title(), DEFAULT_TITLE);
        assert_eq!(RouteName::Login.title(), "Connexion - MyBooks");
    }

    #[test]
    fn guards_follow_the_route_table() {
        assert_eq!(RouteName::Profile.guard(), Guard::Authenticated);
        assert_eq!(RouteName::AdminDashboard.guard(), Guard::Admin);
        assert_eq!(RouteName::ResetPassword.guard(), Guard::Guest);
        assert_eq!(RouteName::Home.guard(), Guard::Public);
    }
}
