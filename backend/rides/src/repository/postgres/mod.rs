mod bookings;
mod conversations;
mod profiles;
mod ride_requests;
mod routes;

use sqlx::{postgres::PgPoolOptions, PgPool};

pub use bookings::PostgresBookingRepository;
pub use conversations::PostgresConversationRepository;
pub use profiles::PostgresProfileRepository;
pub use ride_requests::PostgresRideRequestRepository;
pub use routes::PostgresRouteRepository;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
