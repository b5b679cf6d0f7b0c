pub mod booking;
pub mod conversation;
pub mod message;
pub mod ride_request;
pub mod route;
pub mod session;
pub mod user_profile;
