//! Shop service: carts, deals and order lifecycle over Postgres.
//!
//! Domain logic lives in [`domain`] and [`application`], behind ports that
//! the Diesel adapters in [`infrastructure`] implement. Handlers map the
//! services onto HTTP.

pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::deal_service::DealService;
use application::order_service::OrderService;
use config::AppConfig;
use domain::clock::SystemClock;
use infrastructure::address_repo::{DieselAddressStore, DieselUserStore};
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::catalog_repo::DieselCatalogStore;
use infrastructure::deal_repo::DieselDealRepository;
use infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type PgCartService =
    CartService<DieselCartRepository, DieselCatalogStore, DieselDealRepository, SystemClock>;
pub type PgDealService = DealService<DieselDealRepository, DieselCatalogStore, SystemClock>;
pub type PgOrderService = OrderService<
    DieselOrderRepository,
    DieselCatalogStore,
    DieselUserStore,
    DieselAddressStore,
    SystemClock,
>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::deals::list_deals,
        handlers::deals::list_active_deals,
        handlers::deals::get_deal,
        handlers::deals::deals_for_product,
        handlers::deals::create_deal,
        handlers::deals::update_deal,
        handlers::deals::delete_deal,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::orders_for_user,
        handlers::orders::update_status,
        handlers::orders::cancel_order,
        handlers::orders::delete_order,
    ),
    components(schemas(
        handlers::cart::AddItemRequest,
        handlers::cart::UpdateItemRequest,
        handlers::cart::CartItemResponse,
        handlers::cart::CartResponse,
        handlers::deals::DealRequest,
        handlers::deals::DealResponse,
        handlers::orders::CreateOrderItemRequest,
        handlers::orders::CreateOrderRequest,
        handlers::orders::UpdateStatusRequest,
        handlers::orders::OrderItemResponse,
        handlers::orders::OrderResponse,
        handlers::orders::ListOrdersResponse,
    )),
    tags(
        (name = "cart", description = "Per-user shopping carts"),
        (name = "deals", description = "Time-windowed discount management"),
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or spawning) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    config: AppConfig,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let cart_service = web::Data::new(CartService::new(
        DieselCartRepository::new(pool.clone()),
        DieselCatalogStore::new(pool.clone()),
        DieselDealRepository::new(pool.clone()),
        SystemClock,
    ));
    let deal_service = web::Data::new(DealService::new(
        DieselDealRepository::new(pool.clone()),
        DieselCatalogStore::new(pool.clone()),
        SystemClock,
    ));
    let order_service = web::Data::new(OrderService::new(
        DieselOrderRepository::new(pool.clone()),
        DieselCatalogStore::new(pool.clone()),
        DieselUserStore::new(pool.clone()),
        DieselAddressStore::new(pool),
        config.pricing,
        SystemClock,
    ));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(cart_service.clone())
            .app_data(deal_service.clone())
            .app_data(order_service.clone())
            .wrap(Logger::default())
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/cart")
                    .route("/{user_id}", web::get().to(handlers::cart::get_cart))
                    .route("/{user_id}", web::delete().to(handlers::cart::clear_cart))
                    .route("/{user_id}/items", web::post().to(handlers::cart::add_item))
                    .route(
                        "/{user_id}/items/{item_id}",
                        web::put().to(handlers::cart::update_item),
                    )
                    .route(
                        "/{user_id}/items/{item_id}",
                        web::delete().to(handlers::cart::remove_item),
                    ),
            )
            .service(
                web::scope("/deals")
                    .route("", web::get().to(handlers::deals::list_deals))
                    .route("", web::post().to(handlers::deals::create_deal))
                    // Must come before /{id} so "active" is not parsed as a UUID.
                    .route("/active", web::get().to(handlers::deals::list_active_deals))
                    .route("/{id}", web::get().to(handlers::deals::get_deal))
                    .route("/{id}", web::put().to(handlers::deals::update_deal))
                    .route("/{id}", web::delete().to(handlers::deals::delete_deal)),
            )
            .route(
                "/products/{product_id}/deals",
                web::get().to(handlers::deals::deals_for_product),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::create_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}", web::delete().to(handlers::orders::delete_order))
                    .route(
                        "/{id}/status",
                        web::put().to(handlers::orders::update_status),
                    )
                    .route(
                        "/{id}/cancel",
                        web::post().to(handlers::orders::cancel_order),
                    ),
            )
            .route(
                "/users/{user_id}/orders",
                web::get().to(handlers::orders::orders_for_user),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
