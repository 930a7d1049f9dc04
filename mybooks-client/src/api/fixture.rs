//! In-memory stand-in for the bookstore backend.
//!
//! Serves the login, catalog, basket, stock, promo and order endpoints from
//! a seeded data set so the client can run with no server at all. Answers
//! go through the same status-to-error mapping as real HTTP responses.

use super::backend::{ApiRequest, Backend};
use crate::basket::LineItem;
use crate::models::{
    Book, BookId, Category, DashboardStats, NewOrder, Order, OrderLine, OrderStats, OrderStatus,
    Page, PromoCode, Role, Settings, StockLevel, User, UserId,
};
use crate::utils::jwt::{self, JwtClaims};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use mybooks_core::ApiError;
use reqwest::Method;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const WELCOME_PROMO_CODE: &str = "WELCOME10";

struct Account {
    user: User,
    password: String,
}

struct FixtureState {
    accounts: Vec<Account>,
    books: BTreeMap<BookId, Book>,
    categories: Vec<Category>,
    baskets: HashMap<UserId, Vec<LineItem>>,
    orders: Vec<(UserId, Order)>,
    settings: Settings,
    revoked: HashSet<String>,
    issued: Vec<String>,
    next_id: i64,
}

pub struct FixtureBackend {
    state: Mutex<FixtureState>,
    token_ttl: Duration,
}

impl Default for FixtureBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockCheckBody {
    book_ids: Vec<BookId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BasketLine {
    book_id: BookId,
    quantity: u32,
}

#[derive(Deserialize)]
struct BasketBody {
    items: Vec<BasketLine>,
}

#[derive(Deserialize)]
struct PromoBody {
    code: String,
}

#[derive(Deserialize)]
struct StockBody {
    quantity: u32,
}

#[derive(Serialize)]
struct LoginAnswer<'a> {
    token: String,
    user: &'a User,
}

fn reject(status: u16, message: &str) -> ApiError {
    ApiError::from_status(status, &json!({ "message": message }).to_string())
}

fn body<T: DeserializeOwned>(request: &ApiRequest) -> Result<T, ApiError> {
    let raw = request.body.clone().unwrap_or(Value::Null);
    serde_json::from_value(raw).map_err(|e| reject(400, &format!("Malformed request body: {}", e)))
}

fn id_param(segment: &str) -> Result<i64, ApiError> {
    segment
        .parse()
        .map_err(|_| reject(400, &format!("Invalid id: {}", segment)))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}

fn paginate<T: Clone>(items: &[T], request: &ApiRequest) -> Page<T> {
    let page: u32 = request
        .query_value("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    let size: u32 = request
        .query_value("size")
        .and_then(|s| s.parse().ok())
        .filter(|s| *s > 0)
        .unwrap_or(10);

    let start = (page as usize).saturating_mul(size as usize);
    let content = items
        .iter()
        .skip(start)
        .take(size as usize)
        .cloned()
        .collect();
    let total = items.len() as u64;

    Page {
        content,
        total_elements: total,
        total_pages: (total.div_ceil(size as u64) as u32).max(1),
        number: page,
        size,
    }
}

fn seed_user(id: UserId, username: &str, role: Role) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{}@mybooks.test", username),
        first_name: None,
        last_name: None,
        role: Some(role),
        roles: vec![],
        status: None,
    }
}

fn seed_categories() -> Vec<Category> {
    [
        (1, "Roman", "Romans littéraires et contemporains"),
        (2, "Science Fiction", "Univers futuristes et dystopiques"),
        (3, "Policier", "Enquêtes et mystères"),
    ]
    .into_iter()
    .map(|(id, name, description)| Category {
        id,
        name: name.to_string(),
        description: Some(description.to_string()),
        icon: None,
        books_count: None,
        active_books: None,
    })
    .collect()
}

/// Twenty books; every seventh one is out of stock.
fn seed_books(categories: &[Category]) -> BTreeMap<BookId, Book> {
    (1..=20)
        .map(|id: i64| {
            let stock = if id % 7 == 0 { 0 } else { (id as u32 * 5) % 23 + 1 };
            let category = categories[(id as usize - 1) % categories.len()].clone();
            let book = Book {
                id,
                title: format!("Livre exemple {}", id),
                detail: Some(format!("Description du livre {}", id)),
                price: Decimal::from(10 + (id * 7) % 41),
                stock,
                isbn: Some(format!("978-123456789{:02}", id - 1)),
                cover_image: Some("/img/default-cover.jpg".to_string()),
                publication_date: None,
                categories: vec![category],
                author: None,
                editor: None,
            };
            (id, book)
        })
        .collect()
}

impl FixtureBackend {
    pub fn new() -> Self {
        let categories = seed_categories();
        let books = seed_books(&categories);

        let accounts = vec![
            Account {
                user: seed_user(1, "admin", Role::Admin),
                password: "admin123".to_string(),
            },
            Account {
                user: seed_user(2, "reader", Role::User),
                password: "reader123".to_string(),
            },
        ];

        Self {
            state: Mutex::new(FixtureState {
                accounts,
                books,
                categories,
                baskets: HashMap::new(),
                orders: Vec::new(),
                settings: Settings::default(),
                revoked: HashSet::new(),
                issued: Vec::new(),
                next_id: 1000,
            }),
            token_ttl: Duration::hours(1),
        }
    }

    /// Lifetime of tokens issued by `/auth/login`. A negative value issues
    /// tokens that are already expired.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Reject every token issued so far, as a backend restart would.
    pub fn revoke_tokens(&self) {
        let mut state = self.lock();
        let issued = std::mem::take(&mut state.issued);
        state.revoked.extend(issued);
    }

    /// Current stock of a seeded book.
    pub fn stock_of(&self, book_id: BookId) -> Option<u32> {
        self.lock().books.get(&book_id).map(|b| b.stock)
    }

    pub fn set_stock(&self, book_id: BookId, stock: u32) {
        if let Some(book) = self.lock().books.get_mut(&book_id) {
            book.stock = stock;
        }
    }

    /// What the backend holds as the saved basket of a user.
    pub fn saved_basket(&self, user_id: UserId) -> Vec<LineItem> {
        self.lock().baskets.get(&user_id).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue_token(&self, state: &mut FixtureState, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let mut roles: Vec<String> = user.role.iter().map(|r| format!("ROLE_{}", r)).collect();
        roles.extend(user.roles.iter().map(|r| format!("ROLE_{}", r)));

        let token = jwt::unsigned_token(&JwtClaims {
            sub: Some(user.id.to_string()),
            exp: Some((now + self.token_ttl).timestamp()),
            iat: Some(now.timestamp()),
            roles,
        })
        .map_err(|e| reject(500, &e.to_string()))?;

        state.issued.push(token.clone());
        Ok(token)
    }

    fn caller(&self, state: &FixtureState, request: &ApiRequest) -> Result<User, ApiError> {
        let token = request
            .bearer
            .as_ref()
            .ok_or_else(|| reject(401, "Authentication required"))?;
        let token = token.expose_secret();

        if state.revoked.contains(token) || !jwt::is_token_valid(token, Utc::now()) {
            return Err(reject(401, "Token expired or revoked"));
        }

        let user_id: UserId = jwt::decode_jwt_claims(token)
            .ok()
            .and_then(|claims| claims.sub)
            .and_then(|sub| sub.parse().ok())
            .ok_or_else(|| reject(401, "Invalid token"))?;

        state
            .accounts
            .iter()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or_else(|| reject(401, "Unknown user"))
    }

    fn admin(&self, state: &FixtureState, request: &ApiRequest) -> Result<User, ApiError> {
        let user = self.caller(state, request)?;
        if !user.is_admin() {
            return Err(reject(403, "Administrator role required"));
        }
        Ok(user)
    }

    fn route(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let segments: Vec<&str> = request.path.split('/').filter(|s| !s.is_empty()).collect();

        match (&request.method, segments.as_slice()) {
            (&Method::POST, ["auth", "login"]) => self.login(state, request),
            (&Method::POST, ["auth", "register"]) => register(state, request),
            (&Method::GET, ["users", "me"]) => to_value(&self.caller(state, request)?),

            (&Method::GET, ["books"]) => {
                let books: Vec<Book> = state.books.values().cloned().collect();
                to_value(&paginate(&books, request))
            }
            (&Method::GET, ["books", "search", "title"]) => {
                let needle = request.query_value("title").unwrap_or("").to_lowercase();
                let books: Vec<Book> = state
                    .books
                    .values()
                    .filter(|b| b.title.to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                to_value(&paginate(&books, request))
            }
            (&Method::GET, ["books", "category", id]) => {
                let id = id_param(id)?;
                let books: Vec<Book> = state
                    .books
                    .values()
                    .filter(|b| b.categories.iter().any(|c| c.id == id))
                    .cloned()
                    .collect();
                to_value(&paginate(&books, request))
            }
            (&Method::POST, ["books", "check-stock"]) => {
                let check: StockCheckBody = body(request)?;
                let levels: Vec<StockLevel> = check
                    .book_ids
                    .iter()
                    .filter_map(|id| state.books.get(id))
                    .map(|b| StockLevel {
                        id: b.id,
                        stock_quantity: b.stock,
                    })
                    .collect();
                to_value(&levels)
            }
            (&Method::GET, ["books", id]) => {
                let id = id_param(id)?;
                match state.books.get(&id) {
                    Some(book) => to_value(book),
                    None => Err(reject(404, "Book not found")),
                }
            }
            (&Method::DELETE, ["books", id]) => {
                self.admin(state, request)?;
                let id = id_param(id)?;
                match state.books.remove(&id) {
                    Some(_) => Ok(Value::Null),
                    None => Err(reject(404, "Book not found")),
                }
            }
            (&Method::PATCH, ["books", id, "stock"]) => {
                self.admin(state, request)?;
                let id = id_param(id)?;
                let update: StockBody = body(request)?;
                match state.books.get_mut(&id) {
                    Some(book) => {
                        book.stock = update.quantity;
                        to_value(book)
                    }
                    None => Err(reject(404, "Book not found")),
                }
            }

            (&Method::GET, ["categories"]) => to_value(&state.categories),
            (&Method::GET, ["categories", id]) => {
                let id = id_param(id)?;
                match state.categories.iter().find(|c| c.id == id) {
                    Some(category) => to_value(category),
                    None => Err(reject(404, "Category not found")),
                }
            }

            (&Method::GET, ["user", "basket"]) => {
                let user = self.caller(state, request)?;
                let lines = saved_lines(state, user.id);
                to_value(&lines)
            }
            (&Method::POST, ["user", "basket"]) => {
                let user = self.caller(state, request)?;
                let basket: BasketBody = body(request)?;
                let lines = basket
                    .items
                    .into_iter()
                    .filter_map(|line| {
                        state.books.get(&line.book_id).map(|book| LineItem {
                            book_id: book.id,
                            title: book.title.clone(),
                            unit_price: book.price,
                            stock_quantity: Some(book.stock),
                            quantity: line.quantity,
                        })
                    })
                    .collect();
                state.baskets.insert(user.id, lines);
                Ok(Value::Null)
            }

            (&Method::POST, ["promo-codes", "validate"]) => {
                let promo: PromoBody = body(request)?;
                if promo.code.trim().eq_ignore_ascii_case(WELCOME_PROMO_CODE) {
                    to_value(&PromoCode {
                        code: WELCOME_PROMO_CODE.to_string(),
                        discount_percent: Some(Decimal::TEN),
                        discount_amount: None,
                        valid: true,
                    })
                } else {
                    Err(reject(400, "Code promo invalide"))
                }
            }

            (&Method::POST, ["orders"]) => {
                let user = self.caller(state, request)?;
                let order: NewOrder = body(request)?;
                to_value(&place_order(state, user.id, order)?)
            }
            (&Method::GET, ["orders", "user", id]) => {
                let user = self.caller(state, request)?;
                let id = id_param(id)?;
                if id != user.id && !user.is_admin() {
                    return Err(reject(403, "Not your orders"));
                }
                let orders: Vec<Order> = state
                    .orders
                    .iter()
                    .filter(|(owner, _)| *owner == id)
                    .map(|(_, order)| order.clone())
                    .collect();
                to_value(&paginate(&orders, request))
            }
            (&Method::GET, ["orders", id]) => {
                let user = self.caller(state, request)?;
                let id = id_param(id)?;
                match state
                    .orders
                    .iter()
                    .find(|(owner, o)| o.id == id && (*owner == user.id || user.is_admin()))
                {
                    Some((_, order)) => to_value(order),
                    None => Err(reject(404, "Order not found")),
                }
            }
            (&Method::PUT, ["orders", id, "cancel"]) => {
                let user = self.caller(state, request)?;
                let id = id_param(id)?;
                cancel_order(state, &user, id)
            }

            (&Method::GET, ["settings"]) => to_value(&state.settings),
            (&Method::GET, ["admin", "orders", "stats"]) => {
                self.admin(state, request)?;
                to_value(&order_stats(state))
            }
            (&Method::GET, ["dashboard", "stats"]) => {
                self.admin(state, request)?;
                to_value(&dashboard_stats(state))
            }

            _ => Err(reject(
                404,
                &format!("No fixture route for {} {}", request.method, request.path),
            )),
        }
    }

    fn login(&self, state: &mut FixtureState, request: &ApiRequest) -> Result<Value, ApiError> {
        let credentials: LoginBody = body(request)?;
        let login = credentials.email.trim().to_lowercase();

        let user = state
            .accounts
            .iter()
            .find(|a| {
                (a.user.email == login || a.user.username == login)
                    && a.password == credentials.password
            })
            .map(|a| a.user.clone())
            .ok_or_else(|| reject(401, "Identifiants invalides"))?;

        let token = self.issue_token(state, &user)?;
        to_value(&LoginAnswer { token, user: &user })
    }
}

fn register(state: &mut FixtureState, request: &ApiRequest) -> Result<Value, ApiError> {
    let registration: RegisterBody = body(request)?;
    let email = registration.email.trim().to_lowercase();
    let username = registration.username.trim().to_lowercase();

    if state
        .accounts
        .iter()
        .any(|a| a.user.email == email || a.user.username == username)
    {
        return Err(reject(409, "Email ou nom d'utilisateur déjà utilisé"));
    }

    state.next_id += 1;
    let mut user = seed_user(state.next_id, &username, Role::User);
    user.email = email;
    user.first_name = registration.first_name;
    user.last_name = registration.last_name;

    state.accounts.push(Account {
        user,
        password: registration.password,
    });

    Ok(json!({ "message": "Un email d'activation a été envoyé" }))
}

/// Saved lines with the current catalog stock, as the backend returns them.
fn saved_lines(state: &FixtureState, user_id: UserId) -> Vec<LineItem> {
    state
        .baskets
        .get(&user_id)
        .map(|lines| {
            lines
                .iter()
                .map(|line| {
                    let mut line = line.clone();
                    if let Some(book) = state.books.get(&line.book_id) {
                        line.stock_quantity = Some(book.stock);
                    }
                    line
                })
                .collect()
        })
        .unwrap_or_default()
}

fn place_order(state: &mut FixtureState, user_id: UserId, order: NewOrder) -> Result<Order, ApiError> {
    if order.items.is_empty() {
        return Err(reject(400, "Order has no items"));
    }

    let mut lines = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let book = state
            .books
            .get(&item.book_id)
            .ok_or_else(|| reject(404, &format!("Book {} not found", item.book_id)))?;
        if item.quantity == 0 || item.quantity > book.stock {
            return Err(reject(409, &format!("Insufficient stock for \"{}\"", book.title)));
        }
        lines.push(OrderLine {
            book_id: book.id,
            title: Some(book.title.clone()),
            quantity: item.quantity,
            unit_price: book.price,
        });
    }

    for line in &lines {
        if let Some(book) = state.books.get_mut(&line.book_id) {
            book.stock = book.stock.saturating_sub(line.quantity);
        }
    }

    let mut total: Decimal = lines
        .iter()
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum();
    if let Some(code) = &order.promo_code {
        if code.trim().eq_ignore_ascii_case(WELCOME_PROMO_CODE) {
            total = total * Decimal::new(90, 2);
        }
    }

    state.next_id += 1;
    let created = Order {
        id: state.next_id,
        order_number: Some(format!("CMD-{:06}", state.next_id)),
        status: OrderStatus::Pending,
        total: total.round_dp(2),
        created_at: Some(Utc::now()),
        items: lines,
    };
    state.orders.push((user_id, created.clone()));
    state.baskets.remove(&user_id);
    Ok(created)
}

fn cancel_order(state: &mut FixtureState, user: &User, order_id: i64) -> Result<Value, ApiError> {
    let (_, order) = state
        .orders
        .iter_mut()
        .find(|(owner, o)| o.id == order_id && (*owner == user.id || user.is_admin()))
        .ok_or_else(|| reject(404, "Order not found"))?;

    if !order.status.is_cancellable() {
        return Err(reject(409, "Order can no longer be cancelled"));
    }
    order.status = OrderStatus::Cancelled;
    let order = order.clone();

    for line in &order.items {
        if let Some(book) = state.books.get_mut(&line.book_id) {
            book.stock += line.quantity;
        }
    }
    to_value(&order)
}

fn order_stats(state: &FixtureState) -> OrderStats {
    let orders = state.orders.iter().map(|(_, o)| o);
    OrderStats {
        total_orders: state.orders.len() as u64,
        total_revenue: orders
            .clone()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .map(|o| o.total)
            .sum(),
        pending_orders: orders
            .clone()
            .filter(|o| o.status == OrderStatus::Pending)
            .count() as u64,
        cancelled_orders: orders
            .filter(|o| o.status == OrderStatus::Cancelled)
            .count() as u64,
    }
}

fn dashboard_stats(state: &FixtureState) -> DashboardStats {
    let stats = order_stats(state);
    DashboardStats {
        total_orders: stats.total_orders,
        total_revenue: stats.total_revenue,
        total_users: state.accounts.len() as u64,
        total_books: state.books.len() as u64,
        out_of_stock: state.books.values().filter(|b| b.stock == 0).count() as u64,
        total_categories: state.categories.len() as u64,
        ..Default::default()
    }
}

#[async_trait]
impl Backend for FixtureBackend {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let result = self.route(&request);
        if let Err(e) = &result {
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                kind = e.kind(),
                "Fixture rejected request"
            );
        }
        result
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    async fn login(backend: &FixtureBackend, email: &str, password: &str) -> String {
        let answer = backend
            .execute(
                ApiRequest::post("/auth/login")
                    .json(&json!({ "email": email, "password": password }))
                    .unwrap(),
            )
            .await
            .unwrap();
        answer["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn login_issues_a_valid_token() {
        let backend = FixtureBackend::new();
        let token = login(&backend, "reader@mybooks.test", "reader123").await;
        assert!(jwt::is_token_valid(&token, Utc::now()));

        let me = backend
            .execute(ApiRequest::get("/users/me").bearer(Some(Secret::new(token))))
            .await
            .unwrap();
        assert_eq!(me["username"], "reader");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let backend = FixtureBackend::new();
        let result = backend
            .execute(
                ApiRequest::post("/auth/login")
                    .json(&json!({ "email": "reader@mybooks.test", "password": "nope" }))
                    .unwrap(),
            )
            .await;
        assert!(matches!(result, Err(ApiError::Auth(_))));
    }

    #[tokio::test]
    async fn admin_routes_reject_regular_users() {
        let backend = FixtureBackend::new();
        let token = login(&backend, "reader@mybooks.test", "reader123").await;

        let result = backend
            .execute(ApiRequest::get("/admin/orders/stats").bearer(Some(Secret::new(token))))
            .await;
        assert!(matches!(result, Err(ApiError::Permission(_))));
    }

    #[tokio::test]
    async fn revoked_tokens_are_unauthorized() {
        let backend = FixtureBackend::new();
        let token = login(&backend, "admin@mybooks.test", "admin123").await;
        backend.revoke_tokens();

        let result = backend
            .execute(ApiRequest::get("/users/me").bearer(Some(Secret::new(token))))
            .await;
        assert!(matches!(result, Err(ApiError::Auth(_))));
    }

    #[tokio::test]
    async fn books_are_paginated() {
        let backend = FixtureBackend::new();
        let page: Page<Book> = serde_json::from_value(
            backend
                .execute(ApiRequest::get("/books").param("page", 1).param("size", 8))
                .await
                .unwrap(),
        )
        .unwrap();

        assert_eq!(page.total_elements, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.content.len(), 8);
        assert_eq!(page.content[0].id, 9);
    }

    #[tokio::test]
    async fn stock_check_reports_known_books_only() {
        let backend = FixtureBackend::new();
        let levels: Vec<StockLevel> = serde_json::from_value(
            backend
                .execute(
                    ApiRequest::post("/books/check-stock")
                        .json(&json!({ "bookIds": [1, 7, 999] }))
                        .unwrap(),
                )
                .await
                .unwrap(),
        )
        .unwrap();

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1], StockLevel { id: 7, stock_quantity: 0 });
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let backend = FixtureBackend::new();
        let result = backend.execute(ApiRequest::get("/nowhere")).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
