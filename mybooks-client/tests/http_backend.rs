mod common;

use chrono::Duration;
use common::{http_app, reader, token_valid_for, READER_EMAIL, READER_PASSWORD};
use mybooks_client::basket::Product;
use mybooks_client::models::Credentials;
use mybooks_client::storage::{Storage, SESSION_KEY};
use mybooks_client::{ApiError, SessionEvent};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn login_then_authenticated_calls_carry_the_token() {
    let server = MockServer::start().await;
    let token = token_valid_for(Duration::hours(1));

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": READER_EMAIL, "password": READER_PASSWORD })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
            "user": reader(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reader()))
        .expect(1)
        .mount(&server)
        .await;

    // Nothing saved server side yet
    Mock::given(method("GET"))
        .and(path("/user/basket"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (app, storage) = http_app(&server.uri());
    let session = app
        .login(&Credentials::new(READER_EMAIL, READER_PASSWORD))
        .await
        .unwrap();

    assert_eq!(session.user.id, 2);
    assert!(storage.get(SESSION_KEY).unwrap().is_some());

    let profile = app.services.auth.refresh_profile().await.unwrap();
    assert_eq!(profile.email, READER_EMAIL);
}

#[tokio::test]
async fn login_without_user_fetches_profile_with_new_token() {
    let server = MockServer::start().await;
    let token = token_valid_for(Duration::hours(1));

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(reader()))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _) = http_app(&server.uri());
    let session = app
        .services
        .auth
        .login(&Credentials::new(READER_EMAIL, READER_PASSWORD))
        .await
        .unwrap();

    assert_eq!(session.user.username, "reader");
}

#[tokio::test]
async fn bad_credentials_surface_the_backend_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Identifiants invalides" })),
        )
        .mount(&server)
        .await;

    let (app, _) = http_app(&server.uri());
    let result = app
        .services
        .auth
        .login(&Credentials::new(READER_EMAIL, "wrong"))
        .await;

    match result {
        Err(ApiError::Auth(message)) => assert_eq!(message, "Identifiants invalides"),
        other => panic!("unexpected result: {:?}", other.map(|s| s.user)),
    }
    assert!(!app.session().is_authenticated());
}

#[tokio::test]
async fn login_rejected_with_bad_request_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Mot de passe incorrect" })),
        )
        .mount(&server)
        .await;

    let (app, _) = http_app(&server.uri());
    let result = app.login(&Credentials::new(READER_EMAIL, "wrong")).await;

    match result {
        Err(ApiError::Auth(message)) => assert_eq!(message, "Mot de passe incorrect"),
        other => panic!("unexpected result: {:?}", other.map(|s| s.user)),
    }
    let active = app.notifications.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].message, "Mot de passe incorrect");
}

#[tokio::test]
async fn burst_of_unauthorized_responses_expires_session_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/books/1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })))
        .expect(2)
        .mount(&server)
        .await;

    let (app, storage) = http_app(&server.uri());
    app.session()
        .establish(token_valid_for(Duration::hours(1)), reader())
        .unwrap();
    let mut events = app.session().subscribe();

    let (first, second) = tokio::join!(app.services.books.get(1), app.services.books.get(1));
    assert!(matches!(first, Err(ApiError::Auth(_))));
    assert!(matches!(second, Err(ApiError::Auth(_))));

    assert!(!app.session().is_authenticated());
    assert!(storage.get(SESSION_KEY).unwrap().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn forbidden_keeps_the_session() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/books/4"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Access denied"))
        .mount(&server)
        .await;

    let (app, _) = http_app(&server.uri());
    app.session()
        .establish(token_valid_for(Duration::hours(1)), reader())
        .unwrap();

    let result = app.services.books.delete(4).await;
    match result {
        Err(ApiError::Permission(message)) => assert_eq!(message, "Access denied"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(app.session().is_authenticated());
}

#[tokio::test]
async fn failing_list_degrades_to_empty_but_single_fetch_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/categories/3"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
        .mount(&server)
        .await;

    let (app, _) = http_app(&server.uri());

    assert!(app.services.categories.list().await.is_empty());
    match app.services.categories.get(3).await {
        Err(ApiError::Server { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // Nothing listens on the discard port
    let (app, _) = http_app("http://127.0.0.1:9");
    let result = app.services.books.get(1).await;
    assert!(matches!(result, Err(ApiError::Network(_))));
}

#[tokio::test]
async fn stock_check_caps_and_drops_basket_lines() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/books/check-stock"))
        .and(body_json(json!({ "bookIds": [1, 2] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "stockQuantity": 0 },
            { "id": 2, "stockQuantity": 3 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _) = http_app(&server.uri());
    for id in [1, 2] {
        app.basket
            .add_item(
                &Product {
                    book_id: id,
                    title: format!("Livre {}", id),
                    unit_price: Decimal::new(1250, 2),
                    stock_quantity: 10,
                },
                5,
            )
            .await
            .unwrap();
    }

    assert!(app.basket.verify_stock().await);
    assert!(!app.basket.is_in_basket(1));
    assert_eq!(app.basket.quantity_of(2), 3);
    assert_eq!(app.basket.total_price(), Decimal::new(3750, 2));
}

#[tokio::test]
async fn saved_basket_in_upload_shape_is_merged_and_stock_checked() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/basket"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "bookId": 2, "quantity": 3 }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/books/check-stock"))
        .and(body_json(json!({ "bookIds": [2] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 2, "stockQuantity": 5 }])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/basket"))
        .and(body_json(json!({ "items": [{ "bookId": 2, "quantity": 3 }] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _) = http_app(&server.uri());
    app.session()
        .establish(token_valid_for(Duration::hours(1)), reader())
        .unwrap();

    app.basket.load_saved_basket().await.unwrap();

    assert_eq!(app.basket.quantity_of(2), 3);
    let line = app.basket.items().into_iter().next().unwrap();
    assert_eq!(line.stock_quantity, Some(5));
}
