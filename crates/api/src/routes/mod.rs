//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/v1/auth/login                     - Exchange credentials for tokens
//! POST   /api/v1/auth/refresh                   - Exchange a refresh token
//! GET    /api/v1/auth/me                        - Current user
//!
//! # Users and staff
//! GET    /api/v1/users                          - List accounts
//! POST   /api/v1/users                          - Register an account
//! PATCH  /api/v1/users/{id}/role                - Change role
//! PATCH  /api/v1/users/{id}/active              - Activate / deactivate
//! GET    /api/v1/employees                      - List employees
//! POST   /api/v1/employees                      - Create employee
//! GET    /api/v1/employees/{id}                 - Employee detail
//! PUT    /api/v1/employees/{id}                 - Update employee
//!
//! # Listings
//! GET    /api/v1/properties                     - List (advisors: own only)
//! POST   /api/v1/properties                     - Create
//! GET    /api/v1/properties/{id}                - Detail with images and documents
//! PUT    /api/v1/properties/{id}                - Update
//! DELETE /api/v1/properties/{id}                - Deactivate
//! POST   /api/v1/properties/{id}/status         - Change status
//! POST   /api/v1/properties/{id}/images         - Attach image
//! DELETE /api/v1/properties/{id}/images/{image_id}
//! POST   /api/v1/properties/{id}/images/{image_id}/cover
//! POST   /api/v1/properties/{id}/documents      - Attach document
//! DELETE /api/v1/properties/{id}/documents/{document_id}
//!
//! # Clients
//! GET    /api/v1/clients                        - List
//! POST   /api/v1/clients                        - Register
//! GET    /api/v1/clients/{id}                   - Detail
//! PUT    /api/v1/clients/{id}                   - Update
//! GET    /api/v1/clients/{id}/interactions      - History
//! POST   /api/v1/clients/{id}/interactions      - Append to history
//!
//! # Visits
//! GET    /api/v1/visits                         - List (advisors: own only)
//! POST   /api/v1/visits                         - Schedule (rotation when no advisor)
//! GET    /api/v1/visits/{id}                    - Detail
//! POST   /api/v1/visits/{id}/outcome            - Record outcome
//! POST   /api/v1/visits/{id}/reschedule         - Move to another slot
//! POST   /api/v1/visits/{id}/cancel             - Cancel
//! POST   /api/v1/visits/{id}/assign             - Hand to another advisor
//!
//! # Operations
//! GET    /api/v1/operations                     - List
//! POST   /api/v1/operations                     - Register with commission
//! GET    /api/v1/operations/{id}                - Detail with shares
//! POST   /api/v1/operations/{id}/recompute      - Recompute shares
//! POST   /api/v1/operations/{id}/finalize       - Close the deal
//! PATCH  /api/v1/operations/{id}/payment        - Payment status
//!
//! # Reports
//! GET    /api/v1/reports/operations
//! GET    /api/v1/reports/visits
//! GET    /api/v1/reports/advisors
//! GET    /api/v1/reports/advisors/{employee_id}
//!
//! # Public catalog (no authentication)
//! GET    /api/v1/catalog/properties
//! GET    /api/v1/catalog/properties/{code}
//! ```

pub mod auth;
pub mod catalog;
pub mod clients;
pub mod employees;
pub mod operations;
pub mod properties;
pub mod reports;
pub mod users;
pub mod visits;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
}

/// Create the user account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::create))
        .route("/{id}/role", patch(users::update_role))
        .route("/{id}/active", patch(users::set_active))
}

/// Create the employee routes router.
pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(employees::index).post(employees::create))
        .route("/{id}", get(employees::show).put(employees::update))
}

/// Create the property routes router.
pub fn property_routes() -> Router<AppState> {
    use axum::routing::delete;

    Router::new()
        .route("/", get(properties::index).post(properties::create))
        .route(
            "/{id}",
            get(properties::show)
                .put(properties::update)
                .delete(properties::deactivate),
        )
        .route("/{id}/status", post(properties::change_status))
        .route("/{id}/images", post(properties::add_image))
        .route("/{id}/images/{image_id}", delete(properties::delete_image))
        .route("/{id}/images/{image_id}/cover", post(properties::set_cover))
        .route("/{id}/documents", post(properties::add_document))
        .route(
            "/{id}/documents/{document_id}",
            delete(properties::delete_document),
        )
}

/// Create the client routes router.
pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(clients::index).post(clients::create))
        .route("/{id}", get(clients::show).put(clients::update))
        .route(
            "/{id}/interactions",
            get(clients::interactions).post(clients::add_interaction),
        )
}

/// Create the visit routes router.
pub fn visit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(visits::index).post(visits::create))
        .route("/{id}", get(visits::show))
        .route("/{id}/outcome", post(visits::record_outcome))
        .route("/{id}/reschedule", post(visits::reschedule))
        .route("/{id}/cancel", post(visits::cancel))
        .route("/{id}/assign", post(visits::assign))
}

/// Create the operation routes router.
pub fn operation_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(operations::index).post(operations::create))
        .route("/{id}", get(operations::show))
        .route("/{id}/recompute", post(operations::recompute))
        .route("/{id}/finalize", post(operations::finalize))
        .route("/{id}/payment", patch(operations::update_payment))
}

/// Create the report routes router.
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/operations", get(reports::operations))
        .route("/visits", get(reports::visits))
        .route("/advisors", get(reports::advisors))
        .route("/advisors/{employee_id}", get(reports::advisor))
}

/// Create the public catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/properties", get(catalog::index))
        .route("/properties/{code}", get(catalog::show))
}

/// Create all `/api/v1` routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/employees", employee_routes())
        .nest("/properties", property_routes())
        .nest("/clients", client_routes())
        .nest("/visits", visit_routes())
        .nest("/operations", operation_routes())
        .nest("/reports", report_routes())
        .nest("/catalog", catalog_routes());

    Router::new().nest("/api/v1", api)
}
