use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::user::{NewUser, UserId};

pub type BookId = i64;
pub type AuthorId = i64;
pub type EditorId = i64;
pub type CategoryId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub price: Decimal,
    #[serde(default, alias = "stockQuantity")]
    pub stock: u32,
    #[serde(default, rename = "ISBN")]
    pub isbn: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub editor: Option<Editor>,
}

impl Book {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Payload for creating or updating a book. Only flat ids are sent so the
/// backend never has to resolve nested entities.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub detail: String,
    #[validate(custom(function = "non_negative_price"))]
    pub price: Decimal,
    pub stock: u32,
    #[serde(rename = "ISBN")]
    pub isbn: String,
    #[serde(rename = "publication_date")]
    pub publication_date: Option<String>,
    pub author_id: AuthorId,
    pub editor_id: Option<EditorId>,
    pub category_ids: Vec<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

fn non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("negative_price"));
    }
    Ok(())
}

/// Authoritative stock count for one book, as returned by the stock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub id: BookId,
    pub stock_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: AuthorId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl Author {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInput {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[validate(custom(function = "plausible_birth_date"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    /// Login account created together with the author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<NewUser>,
}

impl AuthorInput {
    /// Trim text fields and drop the ones left empty.
    pub fn cleaned(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.biography = trimmed_non_empty(self.biography);
        self.nationality = trimmed_non_empty(self.nationality);
        self.user = self.user.map(NewUser::cleaned);
        self
    }
}

fn plausible_birth_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        return Err(ValidationError::new("birth_date_in_future"));
    }
    if date.year() < 1800 {
        return Err(ValidationError::new("birth_date_too_old"));
    }
    Ok(())
}

pub(crate) fn trimmed_non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Editor {
    pub id: EditorId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditorInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[validate(url(message = "Invalid website"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub books_count: Option<u32>,
    #[serde(default)]
    pub active_books: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: i64,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub book_id: BookId,
    pub content: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub book_id: BookId,
    #[validate(length(min = 1, max = 2000, message = "Comment cannot be empty"))]
    pub content: String,
    #[validate(range(min = 1, max = 5))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_accepts_backend_field_names() {
        let book: Book = serde_json::from_value(serde_json::json!({
            "id": 3,
            "title": "1984",
            "price": 12.5,
            "stock": 4,
            "ISBN": "978-0451524935",
            "categories": [{ "id": 1, "name": "Roman" }],
            "author": { "id": 42, "firstName": "George", "lastName": "Orwell" }
        }))
        .unwrap();

        assert_eq!(book.price, Decimal::new(125, 1));
        assert_eq!(book.isbn.as_deref(), Some("978-0451524935"));
        assert_eq!(book.author.unwrap().full_name(), "George Orwell");
        assert!(book.editor.is_none());
    }

    #[test]
    fn author_input_is_trimmed_before_validation() {
        let input = AuthorInput {
            first_name: "  Victor ".into(),
            last_name: " Hugo".into(),
            biography: Some("   ".into()),
            ..Default::default()
        }
        .cleaned();

        assert_eq!(input.first_name, "Victor");
        assert_eq!(input.last_name, "Hugo");
        assert!(input.biography.is_none());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn author_without_names_is_rejected() {
        let input = AuthorInput {
            first_name: "   ".into(),
            ..Default::default()
        }
        .cleaned();

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("last_name"));
    }

    #[test]
    fn future_birth_date_is_rejected() {
        let input = AuthorInput {
            first_name: "Jules".into(),
            last_name: "Verne".into(),
            birth_date: Some(Utc::now().date_naive() + chrono::Duration::days(30)),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let input = BookInput {
            title: "Dune".into(),
            detail: String::new(),
            price: Decimal::new(-1, 0),
            stock: 1,
            isbn: String::new(),
            publication_date: None,
            author_id: 1,
            editor_id: None,
            category_ids: vec![],
            user_id: None,
        };
        assert!(input.validate().is_err());
    }
}
