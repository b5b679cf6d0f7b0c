pub mod address;
pub mod bookings;
pub mod conversations;
pub mod feed;
pub mod middleware;
pub mod profiles;
pub mod ride_requests;
pub mod routes;
pub mod ws;
