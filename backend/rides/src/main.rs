mod config;
mod delivery;
mod domain;
mod repository;
mod telemetry;
mod usecase;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::State,
    middleware,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::delivery::http::v1::address::resolve_address;
use crate::delivery::http::v1::bookings::{booking_history, request_booking};
use crate::delivery::http::v1::conversations::{
    get_conversation, list_conversations, list_messages, mark_read, send_message,
};
use crate::delivery::http::v1::feed::{catalog_feed, inbox_feed};
use crate::delivery::http::v1::middleware::{auth_middleware, optional_auth_middleware};
use crate::delivery::http::v1::profiles::{
    get_my_profile, get_public_profile, register_profile, update_my_profile,
};
use crate::delivery::http::v1::ride_requests::{
    accept_ride_request, decline_ride_request, list_ride_requests,
};
use crate::delivery::http::v1::routes::{
    complete_route, create_route, delete_route, get_route, list_my_routes, search_routes,
};
use crate::delivery::http::v1::ws::conversation_ws_handler;
use crate::repository::postgres::{
    create_pool, PostgresBookingRepository, PostgresConversationRepository,
    PostgresProfileRepository, PostgresRideRequestRepository, PostgresRouteRepository,
};
use crate::usecase::address::AddressUseCase;
use crate::usecase::bookings::BookingsUseCase;
use crate::usecase::feed::ChangeFeed;
use crate::usecase::jwt::JwtService;
use crate::usecase::messaging::MessagingUseCase;
use crate::usecase::openai::OpenAIClient;
use crate::usecase::profiles::ProfilesUseCase;
use crate::usecase::ride_requests::RideRequestsUseCase;
use crate::usecase::routes::RoutesUseCase;

pub struct AppState {
    pub routes_usecase: RoutesUseCase<PostgresRouteRepository, PostgresBookingRepository>,
    pub bookings_usecase: BookingsUseCase<
        PostgresRouteRepository,
        PostgresProfileRepository,
        PostgresConversationRepository,
        PostgresBookingRepository,
    >,
    pub ride_requests_usecase: RideRequestsUseCase<PostgresRideRequestRepository>,
    pub messaging_usecase: MessagingUseCase<PostgresConversationRepository>,
    pub profiles_usecase: ProfilesUseCase<PostgresProfileRepository>,
    pub address_usecase: AddressUseCase<OpenAIClient>,
    pub feed: ChangeFeed,
    pub jwt_service: JwtService,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::AppConfig::from_env().context("failed to load configuration")?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let tracer_provider = if config.telemetry_enabled {
        let telemetry_config = telemetry::TelemetryConfig::from(&config);
        Some(
            telemetry::init_telemetry_with_subscriber(&telemetry_config, env_filter)
                .context("failed to initialize telemetry")?,
        )
    } else {
        telemetry::init_subscriber_without_telemetry(env_filter)?;
        None
    };

    tracing::info!("starting the rides service");

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    metrics_process::Collector::default().describe();
    tracing::info!("prometheus metrics initialized");

    tracing::info!("config loaded, telemetry_enabled={}", config.telemetry_enabled);

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to create database pool")?;
    tracing::info!("database pool created");

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database migrations applied");

    let route_repository = PostgresRouteRepository::new(pool.clone());
    let profile_repository = PostgresProfileRepository::new(pool.clone());
    let ride_request_repository = PostgresRideRequestRepository::new(pool.clone());
    let conversation_repository = PostgresConversationRepository::new(pool.clone());
    let booking_repository = PostgresBookingRepository::new(pool);

    let feed = ChangeFeed::new(config.feed_capacity);
    let jwt_service = JwtService::new(config.jwt_secret.clone());

    let address_resolver = match &config.openai_api_key {
        Some(api_key) => {
            let client = OpenAIClient::new(
                config.openai_base_url.clone(),
                config.openai_model.clone(),
                api_key.clone(),
            )?;
            tracing::info!(model = %client.model(), "address resolver enabled");
            Some(client)
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set, address resolution will be unavailable");
            None
        }
    };

    let shared_state = Arc::new(AppState {
        routes_usecase: RoutesUseCase::new(
            route_repository.clone(),
            booking_repository.clone(),
            feed.clone(),
        ),
        bookings_usecase: BookingsUseCase::new(
            route_repository,
            profile_repository.clone(),
            conversation_repository.clone(),
            booking_repository,
            feed.clone(),
            Duration::from_secs(config.booking_timeout_secs),
        ),
        ride_requests_usecase: RideRequestsUseCase::new(ride_request_repository),
        messaging_usecase: MessagingUseCase::new(conversation_repository, feed.clone()),
        profiles_usecase: ProfilesUseCase::new(profile_repository),
        address_usecase: AddressUseCase::new(address_resolver),
        feed,
        jwt_service,
        metrics_handle,
    });

    // Browsing works signed out; booking decides for itself what to do without a session
    let public_api = Router::new()
        .route("/api/v1/routes", get(search_routes))
        .route("/api/v1/routes/{id}", get(get_route))
        .route("/api/v1/routes/{id}/bookings", post(request_booking))
        .route("/api/v1/profiles/{id}", get(get_public_profile))
        .route("/api/v1/feed/catalog", get(catalog_feed))
        .layer(middleware::from_fn_with_state(
            shared_state.clone(),
            optional_auth_middleware,
        ));

    let private_api = Router::new()
        .route("/api/v1/routes", post(create_route))
        .route("/api/v1/routes/{id}", delete(delete_route))
        .route("/api/v1/routes/{id}/complete", post(complete_route))
        .route("/api/v1/me/routes", get(list_my_routes))
        .route("/api/v1/ride-requests", get(list_ride_requests))
        .route("/api/v1/ride-requests/{id}", delete(decline_ride_request))
        .route("/api/v1/ride-requests/{id}/accept", post(accept_ride_request))
        .route("/api/v1/history", get(booking_history))
        .route("/api/v1/conversations", get(list_conversations))
        .route("/api/v1/conversations/{id}", get(get_conversation))
        .route(
            "/api/v1/conversations/{id}/messages",
            get(list_messages).post(send_message),
        )
        .route("/api/v1/conversations/{id}/read", post(mark_read))
        .route("/api/v1/feed/inbox", get(inbox_feed))
        .route(
            "/api/v1/profiles/me",
            get(get_my_profile).post(register_profile).put(update_my_profile),
        )
        .route("/api/v1/address/resolve", post(resolve_address))
        .layer(middleware::from_fn_with_state(
            shared_state.clone(),
            auth_middleware,
        ));

    // Browsers cannot set headers on a WebSocket handshake, so the token comes in the query
    let ws_api = Router::new().route(
        "/api/v1/conversations/{id}/ws",
        get(conversation_ws_handler),
    );

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(public_api)
        .merge(private_api)
        .merge(ws_api)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("rides service running on {}", config.bind_addr);
    axum::serve(listener, router).await?;

    if let Some(provider) = tracer_provider {
        telemetry::shutdown_telemetry(provider);
    }

    Ok(())
}

async fn metrics(State(state): State<Arc<AppState>>) -> String {
    metrics_process::Collector::default().collect();
    state.metrics_handle.render()
}

#[tracing::instrument]
async fn healthz() -> &'static str {
    "OK"
}
