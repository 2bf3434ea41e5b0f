//! HTTP surface.

use axum::{extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post, put}, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogService;
use crate::domain::aggregates::{CustomerInfo, OrderAddress, OrderItem, OrderStatus, ProductView, RatingSummary, Review};
use crate::domain::value_objects::{Money, Quantity, Rating};
use crate::orders::{OrderDetails, OrderService};
use crate::publisher::EventPublisher;
use crate::store::Store;
use crate::EcommerceError;

#[derive(Clone)]
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub catalog: CatalogService<S>,
    pub publisher: EventPublisher,
    pub currency: String,
}

pub fn router<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "nabaat-store"})) }))
        .route("/api/v1/products/:id", get(get_product::<S>))
        .route("/api/v1/products/:id/reviews", get(list_reviews::<S>).post(create_review::<S>))
        .route("/api/v1/products/:id/rates", post(create_rate::<S>))
        .route("/api/v1/orders", post(create_order::<S>))
        .route("/api/v1/orders/:id", get(get_order::<S>).delete(delete_order::<S>))
        .route("/api/v1/orders/:id/status", put(set_order_status::<S>))
        .route("/api/v1/orders/:id/support", put(assign_order_support::<S>))
        .route("/api/v1/orders/:id/items", post(add_order_item::<S>))
        .route("/api/v1/order-items/:id", put(update_order_item::<S>).delete(delete_order_item::<S>))
        .with_state(state)
}

pub struct ApiError(EcommerceError);

impl From<EcommerceError> for ApiError {
    fn from(e: EcommerceError) -> Self { Self(e) }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self { Self(EcommerceError::Validation(e.to_string())) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EcommerceError::ProductNotFound(_)
            | EcommerceError::ComponentNotFound(_)
            | EcommerceError::CategoryNotFound(_)
            | EcommerceError::OrderNotFound(_)
            | EcommerceError::OrderItemNotFound(_) => StatusCode::NOT_FOUND,
            EcommerceError::InvalidQuantity(_) | EcommerceError::InvalidRating(_) | EcommerceError::Validation(_) => StatusCode::BAD_REQUEST,
            EcommerceError::Integrity(_) | EcommerceError::InsufficientStock { .. } => StatusCode::CONFLICT,
            EcommerceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({"error": self.0.to_string()}))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerRequest {
    #[validate(length(min = 1, max = 255))] pub name: String,
    #[validate(length(min = 1, max = 15))] pub phone_number: String,
    #[validate(email)] pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 255))] pub city: String,
    #[validate(length(min = 1))] pub address: String,
    #[validate(length(min = 1, max = 10))] pub postal_code: String,
    #[validate(length(min = 1, max = 15))] pub phone_number: String,
    #[validate(url)] pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest { pub customer: Option<CustomerRequest>, pub address: Option<AddressRequest> }

#[derive(Debug, Deserialize, Validate)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 32767))] pub quantity: u32,
}

#[derive(Debug, Deserialize)] pub struct StatusRequest { pub status: OrderStatus }

#[derive(Debug, Deserialize)] pub struct SupportRequest { pub support_id: Option<Uuid> }

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest { pub user_id: Uuid, #[validate(length(max = 5000))] pub text: Option<String> }

#[derive(Debug, Deserialize, Validate)]
pub struct RateRequest { pub user_id: Uuid, #[validate(range(min = 1, max = 5))] pub value: u8 }

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)] pub details: OrderDetails,
    pub status_label: &'static str,
    pub subtotal: Money,
}

fn order_response<S: Store>(s: &AppState<S>, details: OrderDetails) -> OrderResponse {
    let subtotal = crate::domain::aggregates::Order::subtotal(&details.items, &s.currency);
    OrderResponse { status_label: details.order.status.label(), details, subtotal }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse { #[serde(flatten)] pub view: ProductView, pub rating: RatingSummary }

async fn get_product<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>) -> ApiResult<Json<ProductResponse>> {
    let view = s.catalog.product(id).await?;
    let rating = s.catalog.rating(id).await?;
    Ok(Json(ProductResponse { view, rating }))
}

async fn list_reviews<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(s.catalog.reviews(id).await?))
}

async fn create_review<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>, Json(r): Json<ReviewRequest>) -> ApiResult<(StatusCode, Json<Review>)> {
    r.validate()?;
    Ok((StatusCode::CREATED, Json(s.catalog.add_review(r.user_id, id, r.text).await?)))
}

async fn create_rate<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>, Json(r): Json<RateRequest>) -> ApiResult<(StatusCode, Json<RatingSummary>)> {
    r.validate()?;
    Ok((StatusCode::CREATED, Json(s.catalog.rate(r.user_id, id, Rating::new(r.value)?).await?)))
}

async fn create_order<S: Store>(State(s): State<AppState<S>>, Json(r): Json<CreateOrderRequest>) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    if let Some(c) = &r.customer { c.validate()?; }
    if let Some(a) = &r.address { a.validate()?; }
    let customer = r.customer.map(|c| CustomerInfo { name: c.name, phone_number: c.phone_number, email: c.email });
    let address = r.address.map(|a| OrderAddress { city: a.city, address: a.address, postal_code: a.postal_code, phone_number: a.phone_number, location: a.location });
    let order = s.orders.create_order(customer, address).await?;
    Ok((StatusCode::CREATED, Json(order_response(&s, OrderDetails { order, items: vec![] }))))
}

async fn get_order<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>) -> ApiResult<Json<OrderResponse>> {
    let details = s.orders.order(id).await?;
    Ok(Json(order_response(&s, details)))
}

async fn set_order_status<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>, Json(r): Json<StatusRequest>) -> ApiResult<Json<OrderResponse>> {
    s.orders.set_status(id, r.status).await?;
    let details = s.orders.order(id).await?;
    Ok(Json(order_response(&s, details)))
}

async fn assign_order_support<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>, Json(r): Json<SupportRequest>) -> ApiResult<Json<OrderResponse>> {
    s.orders.assign_support(id, r.support_id).await?;
    let details = s.orders.order(id).await?;
    Ok(Json(order_response(&s, details)))
}

async fn delete_order<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let out = s.orders.delete_order(id).await?;
    s.publisher.publish_all(&out.events).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_order_item<S: Store>(State(s): State<AppState<S>>, Path(order_id): Path<Uuid>, Json(r): Json<OrderItemRequest>) -> ApiResult<(StatusCode, Json<OrderItem>)> {
    r.validate()?;
    let out = s.orders.add_item(order_id, r.product_id, Quantity::new(r.quantity)?).await?;
    s.publisher.publish_all(&out.events).await;
    Ok((StatusCode::CREATED, Json(out.value)))
}

async fn update_order_item<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>, Json(r): Json<OrderItemRequest>) -> ApiResult<Json<OrderItem>> {
    r.validate()?;
    let out = s.orders.update_item(id, r.product_id, Quantity::new(r.quantity)?).await?;
    s.publisher.publish_all(&out.events).await;
    Ok(Json(out.value))
}

async fn delete_order_item<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let out = s.orders.delete_item(id).await?;
    s.publisher.publish_all(&out.events).await;
    Ok(StatusCode::NO_CONTENT)
}
