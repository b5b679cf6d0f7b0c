pub mod address;
pub mod bookings;
pub mod contracts;
pub mod error;
pub mod feed;
pub mod jwt;
pub mod messaging;
pub mod openai;
pub mod profiles;
pub mod ride_requests;
pub mod routes;
pub mod search;
