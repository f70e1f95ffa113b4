//! Platform assembly
//!
//! Builds repositories, services and the Access Gate over one pool, and
//! exposes the combined HTTP router with its collected OpenAPI document.

use std::sync::Arc;

use sqlx::SqlitePool;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::auth::access_gate::AccessGate;
use crate::auth::auth_api::{auth_router, AuthState};
use crate::auth::password_service::{Argon2Config, PasswordPolicy, PasswordService};
use crate::auth::token_service::{TokenConfig, TokenService};
use crate::item::api::{items_router, ItemsState};
use crate::item::repository::ItemRepository;
use crate::item::service::ItemService;
use crate::request::api::{requests_router, RequestsState};
use crate::request::notifier::RequestNotifier;
use crate::request::repository::RequestRepository;
use crate::request::service::RequestService;
use crate::seed::AdminSeeder;
use crate::shared::error::Result;
use crate::shared::health_api::{health_router, HealthState};
use crate::shared::middleware::{AppState, AuthLayer};
use crate::user::api::{users_router, UsersState};
use crate::user::repository::UserRepository;

/// Runtime settings derived from configuration
#[derive(Debug, Clone)]
pub struct PlatformSettings {
    pub token: TokenConfig,
    pub argon2: Argon2Config,
    pub password_policy: PasswordPolicy,
}

impl PlatformSettings {
    pub fn new(token: TokenConfig) -> Self {
        Self {
            token,
            argon2: Argon2Config::default(),
            password_policy: PasswordPolicy::default(),
        }
    }
}

pub struct Platform {
    pool: SqlitePool,
    pub user_repo: Arc<UserRepository>,
    pub password_service: Arc<PasswordService>,
    pub token_service: Arc<TokenService>,
    pub gate: Arc<AccessGate>,
    pub item_service: Arc<ItemService>,
    pub request_service: Arc<RequestService>,
}

impl Platform {
    pub fn new(
        pool: SqlitePool,
        settings: PlatformSettings,
        notifier: Arc<dyn RequestNotifier>,
    ) -> Result<Self> {
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let item_repo = Arc::new(ItemRepository::new(pool.clone()));
        let request_repo = Arc::new(RequestRepository::new(pool.clone()));

        let password_service = Arc::new(PasswordService::new(settings.argon2, settings.password_policy)?);
        let token_service = Arc::new(TokenService::new(settings.token));
        let gate = Arc::new(AccessGate::new(token_service.clone(), user_repo.clone()));

        let item_service = Arc::new(ItemService::new(item_repo.clone()));
        let request_service = Arc::new(RequestService::new(request_repo, item_repo, notifier));

        Ok(Self {
            pool,
            user_repo,
            password_service,
            token_service,
            gate,
            item_service,
            request_service,
        })
    }

    pub fn admin_seeder(&self) -> AdminSeeder {
        AdminSeeder::new(self.user_repo.clone(), self.password_service.clone())
    }

    /// All API routes behind the auth layer, plus the OpenAPI document
    /// collected from them.
    pub fn router(&self) -> (axum::Router, OpenApi) {
        let auth_state = AuthState {
            user_repo: self.user_repo.clone(),
            password_service: self.password_service.clone(),
            token_service: self.token_service.clone(),
        };
        let users_state = UsersState { user_repo: self.user_repo.clone() };
        let items_state = ItemsState { item_service: self.item_service.clone() };
        let requests_state = RequestsState { request_service: self.request_service.clone() };
        let health_state = HealthState {
            pool: self.pool.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let (router, mut openapi) = OpenApiRouter::new()
            .nest("/auth", auth_router(auth_state))
            .nest("/users", users_router(users_state))
            .nest("/items", items_router(items_state))
            .nest("/requests", requests_router(requests_state))
            .nest("/health", health_router(health_state))
            .split_for_parts();

        openapi.info.title = "ReUse Exchange API".to_string();
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
        openapi.info.description = Some("Campus item exchange: accounts, items and requests".to_string());
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );

        let app_state = AppState { gate: self.gate.clone() };
        (router.layer(AuthLayer::new(app_state)), openapi)
    }
}
