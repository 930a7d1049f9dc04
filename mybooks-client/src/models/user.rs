use serde::{Deserialize, Serialize};
use validator::Validate;

pub type UserId = i64;

/// Normalized user role.
///
/// The backend is inconsistent about role spelling (`ADMIN`, `admin`,
/// `ROLE_ADMIN`, `ROLE_admin`); all of them parse to the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Manager,
    Author,
    User,
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);

        match name {
            "ADMIN" => Role::Admin,
            "MANAGER" => Role::Manager,
            "AUTHOR" => Role::Author,
            "USER" => Role::User,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Author => "AUTHOR",
            Role::User => "USER",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Role::parse(&raw)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl User {
    pub fn has_role(&self, role: &Role) -> bool {
        self.role.as_ref() == Some(role) || self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::Admin)
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ if !self.username.is_empty() => self.username.clone(),
            _ => self.email.split('@').next().unwrap_or("User").to_string(),
        }
    }
}

#[derive(Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of a registration as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// The backend logged the new user in straight away.
    LoggedIn(User),
    /// An activation email was sent; the account is not usable yet.
    ConfirmationRequired { message: String },
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Clone, Serialize, Validate)]
pub struct PasswordReset {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Availability {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Account created from the admin back-office.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl NewUser {
    /// Usernames and emails are matched case-insensitively by the backend.
    pub fn cleaned(mut self) -> Self {
        self.username = self.username.trim().to_lowercase();
        self.email = self.email.trim().to_lowercase();
        self
    }
}

/// Admin edit of an existing account; unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl UserQuery {
    pub fn first_page() -> Self {
        Self {
            page: 0,
            size: 10,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_spellings_normalize_to_one_role() {
        for raw in ["ADMIN", "admin", "ROLE_ADMIN", "ROLE_admin", " Admin "] {
            assert_eq!(Role::parse(raw), Role::Admin, "{raw}");
        }
        assert_eq!(Role::parse("role_user"), Role::User);
        assert_eq!(Role::parse("editor"), Role::Other("EDITOR".to_string()));
    }

    #[test]
    fn user_roles_deserialize_normalized() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 7,
            "username": "alice",
            "email": "alice@example.com",
            "role": "ROLE_admin",
            "roles": ["ROLE_USER"]
        }))
        .unwrap();

        assert!(user.is_admin());
        assert!(user.has_role(&Role::User));
        assert!(!user.has_role(&Role::Manager));
    }

    #[test]
    fn roles_serialize_in_canonical_form() {
        let json = serde_json::to_value(Role::parse("role_manager")).unwrap();
        assert_eq!(json, serde_json::json!("MANAGER"));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new("a@b.c", "hunter22");
        assert!(!format!("{:?}", credentials).contains("hunter22"));
    }

    #[test]
    fn registration_requires_long_password() {
        let request = RegisterRequest {
            username: "bob".into(),
            email: "bob@example.com".into(),
            password: "short".into(),
            first_name: None,
            last_name: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let user = User {
            id: 1,
            username: String::new(),
            email: "carol@example.com".into(),
            first_name: None,
            last_name: None,
            role: None,
            roles: vec![],
            status: None,
        };
        assert_eq!(user.display_name(), "carol");
    }
}
