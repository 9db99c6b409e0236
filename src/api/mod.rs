//! REST surface under `/api/v1`.
//!
//! Handlers are thin: they decode the request, call into `core`, and wrap the
//! result in JSON. All shared state lives in `AppState`.

mod accounts;
mod catalog;
/// Error-to-response mapping
pub mod error;
/// Request extractors, including the authenticated user
pub mod extract;
mod products;
mod shopping;

use crate::{
    config::AppConfig,
    core::locks::EntityLocks,
    errors::{Error, Result},
};
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, patch, post, put},
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// State shared by every request.
#[derive(Debug)]
pub struct AppState {
    /// Connection pool
    pub database: DatabaseConnection,
    /// Entity lock registry
    pub locks: EntityLocks,
    /// Loaded configuration
    pub config: AppConfig,
}

/// Handle passed to handlers
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Bundles the pool and configuration with a fresh lock registry.
    #[must_use]
    pub fn new(database: DatabaseConnection, config: AppConfig) -> SharedState {
        Arc::new(Self {
            database,
            locks: EntityLocks::new(),
            config,
        })
    }
}

fn routes() -> Router<SharedState> {
    Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/user", get(accounts::profile))
        .route("/user/address", put(accounts::update_address))
        .route(
            "/store",
            post(accounts::create_store).put(accounts::update_store),
        )
        .route("/store/{id}/products", get(accounts::store_products))
        .route(
            "/category",
            post(catalog::create_category).get(catalog::list_categories),
        )
        .route(
            "/category/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/subcategory", post(catalog::create_subcategory))
        .route(
            "/subcategory/{id}",
            get(catalog::list_subcategories)
                .put(catalog::update_subcategory)
                .delete(catalog::delete_subcategory),
        )
        .route(
            "/products",
            post(products::create_product).get(products::list_products),
        )
        .route("/categoryproducts", get(products::category_products))
        .route("/productbykeyword", get(products::products_by_keyword))
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/{id}/ratings", patch(products::submit_rating))
        .route(
            "/cart",
            post(shopping::add_to_cart)
                .get(shopping::get_cart)
                .delete(shopping::clear_cart),
        )
        .route(
            "/cart/{id}",
            put(shopping::update_cart_item).delete(shopping::remove_cart_item),
        )
        .route(
            "/orders",
            post(shopping::create_order).get(shopping::list_orders),
        )
        .route(
            "/orders/{id}",
            patch(shopping::update_order_status).delete(shopping::cancel_order),
        )
        .route("/payment", post(shopping::process_payment))
}

fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() {
        return AllowOrigin::any();
    }
    AllowOrigin::list(
        origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok()),
    )
}

/// Builds the application router with CORS and request tracing.
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.server.allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let mut app = Router::new()
        .nest("/api/v1", routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    if state.config.errors.expose_internal_detail {
        warn!("Internal error details will be included in responses");
        app = app.layer(middleware::map_response(error::attach_internal_detail));
    }
    app.with_state(state)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: SharedState) -> Result<()> {
    let address = format!("{}:{}", state.config.server.host, state.config.server.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::from)?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::test_utils::setup_test_db;
    use axum::{
        body::{Body, to_bytes},
        http::{
            Request, StatusCode,
            header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN},
        },
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct Client {
        app: Router,
    }

    impl Client {
        async fn new() -> Self {
            let db = setup_test_db().await.expect("test database");
            Self {
                app: router(AppState::new(db, AppConfig::default())),
            }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => request
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();

            let response: Response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn register(&self, name: &str, email: &str) -> String {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/api/v1/register",
                    None,
                    Some(json!({ "name": name, "email": email, "password": "pw" })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn test_authentication_required() {
        let client = Client::new().await;
        let (status, body) = client.send(Method::GET, "/api/v1/cart", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["message"].is_string());

        let (status, _) = client
            .send(Method::GET, "/api/v1/user", Some("bogus"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    async fn preflight(app: Router, origin: &str) -> Response {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/products")
            .header(ORIGIN, origin)
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin_by_default() {
        let client = Client::new().await;
        let response = preflight(client.app.clone(), "http://localhost:3000").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_cors_preflight_honours_configured_origins() {
        let db = setup_test_db().await.expect("test database");
        let mut config = AppConfig::default();
        config.server.allowed_origins = vec!["http://shop.example".to_string()];
        let app = router(AppState::new(db, config));

        let allowed = preflight(app.clone(), "http://shop.example").await;
        assert_eq!(
            allowed.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://shop.example"
        );

        let other = preflight(app, "http://elsewhere.example").await;
        assert!(other.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_register_login_profile() {
        let client = Client::new().await;
        client.register("Ada", "ada@example.com").await;

        let (status, body) = client
            .send(
                Method::POST,
                "/api/v1/login",
                None,
                Some(json!({ "email": "ada@example.com", "password": "pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["user"].get("passwordDigest").is_none());
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = client
            .send(Method::GET, "/api/v1/user", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "buyer");
        assert!(body["store"].is_null());

        let (status, _) = client
            .send(
                Method::POST,
                "/api/v1/login",
                None,
                Some(json!({ "email": "ada@example.com", "password": "wrong" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let client = Client::new().await;
        let token = client.register("Ada", "ada@example.com").await;
        let (status, body) = client
            .send(
                Method::POST,
                "/api/v1/payment",
                Some(&token),
                Some(json!({ "orderId": "not-a-number" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_shopping_flow() {
        let client = Client::new().await;
        let seller = client.register("Sam", "sam@example.com").await;
        let buyer = client.register("Bea", "bea@example.com").await;

        let (status, body) = client
            .send(
                Method::POST,
                "/api/v1/store",
                Some(&seller),
                Some(json!({ "shopName": "Sam's", "address": "1 Market St", "category": "home" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let store_id = body["store"]["id"].as_i64().unwrap();

        let (_, body) = client
            .send(
                Method::POST,
                "/api/v1/category",
                None,
                Some(json!({ "name": "Home" })),
            )
            .await;
        let category_id = body["category"]["id"].as_i64().unwrap();

        // Buyers without a store cannot list products
        let product = json!({
            "name": "Lamp",
            "description": "A desk lamp",
            "price": 20.0,
            "stock": 5,
            "categoryId": category_id,
        });
        let (status, _) = client
            .send(
                Method::POST,
                "/api/v1/products",
                Some(&buyer),
                Some(product.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = client
            .send(Method::POST, "/api/v1/products", Some(&seller), Some(product))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let product_id = body["product"]["id"].as_i64().unwrap();

        let (status, body) = client
            .send(
                Method::GET,
                &format!("/api/v1/store/{store_id}/products"),
                Some(&buyer),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"][0]["id"], product_id);

        let (status, body) = client
            .send(
                Method::PATCH,
                &format!("/api/v1/products/{product_id}/ratings"),
                Some(&buyer),
                Some(json!({ "rating": 4, "comment": "Bright" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["averageRating"], 4.0);
        assert_eq!(body["ratings"][0]["name"], "Bea");

        let (status, _) = client
            .send(
                Method::POST,
                "/api/v1/cart",
                Some(&buyer),
                Some(json!({ "productId": product_id, "quantity": 9 })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = client
            .send(
                Method::POST,
                "/api/v1/cart",
                Some(&buyer),
                Some(json!({ "productId": product_id, "quantity": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cart"]["subtotal"], 40.0);

        let (status, body) = client
            .send(
                Method::POST,
                "/api/v1/orders",
                Some(&buyer),
                Some(json!({
                    "products": [{ "productId": product_id, "quantity": 2 }],
                    "totalAmount": 40.0,
                    "shippingAddress": "2 Main St",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["order"]["status"], "Pending");
        let order_id = body["order"]["id"].as_i64().unwrap();

        let (status, body) = client
            .send(
                Method::POST,
                "/api/v1/payment",
                Some(&buyer),
                Some(json!({ "orderId": order_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"]["paymentStatus"], "Paid");

        let (status, _) = client
            .send(
                Method::POST,
                "/api/v1/payment",
                Some(&buyer),
                Some(json!({ "orderId": order_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Orders are private to their buyer
        let (status, _) = client
            .send(
                Method::DELETE,
                &format!("/api/v1/orders/{order_id}"),
                Some(&seller),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = client
            .send(
                Method::PATCH,
                &format!("/api/v1/orders/{order_id}"),
                Some(&buyer),
                Some(json!({ "status": "Shipped" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"]["status"], "Shipped");
    }

    #[tokio::test]
    async fn test_category_cascade_over_http() {
        let client = Client::new().await;
        let (_, body) = client
            .send(
                Method::POST,
                "/api/v1/category",
                None,
                Some(json!({ "name": "Garden" })),
            )
            .await;
        let category_id = body["category"]["id"].as_i64().unwrap();

        let (status, _) = client
            .send(
                Method::POST,
                "/api/v1/subcategory",
                None,
                Some(json!({ "name": "Tools", "categoryId": category_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = client
            .send(
                Method::DELETE,
                &format!("/api/v1/category/{category_id}"),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subcategoriesDeleted"], 1);

        let (_, body) = client
            .send(
                Method::GET,
                &format!("/api/v1/subcategory/{category_id}"),
                None,
                None,
            )
            .await;
        assert_eq!(body["subcategories"], json!([]));

        let (status, body) = client
            .send(
                Method::DELETE,
                &format!("/api/v1/category/{category_id}"),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Category not found");
    }

    #[tokio::test]
    async fn test_keyword_search_requires_keyword() {
        let client = Client::new().await;
        let (status, _) = client
            .send(Method::GET, "/api/v1/productbykeyword", None, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = client
            .send(Method::GET, "/api/v1/productbykeyword?keyword=lamp", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
        assert_eq!(body["page"], 1);
    }
}
