use uuid::Uuid;

use crate::{
    domain::booking::{BookingConfirmation, BookingPlan},
    domain::conversation::Conversation,
    domain::message::Message,
    domain::ride_request::{RideRequest, RideRequestStatus},
    domain::route::Route,
    domain::user_profile::UserProfile,
    repository::errors::RepositoryError,
};

#[cfg_attr(test, mockall::automock)]
pub trait RouteRepository: Send + Sync {
    async fn create(&self, route: &Route) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Route>, RepositoryError>;
    /// Every published route, in publish order.
    async fn find_all(&self) -> Result<Vec<Route>, RepositoryError>;
    async fn find_by_driver(&self, driver_id: Uuid) -> Result<Vec<Route>, RepositoryError>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ProfileRepository: Send + Sync {
    /// Inserts the profile. When one already exists only the identity fields
    /// (email, and a picture if none is set) are refreshed; user edits stay.
    async fn upsert_identity(&self, profile: &UserProfile) -> Result<UserProfile, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, RepositoryError>;
    async fn update(&self, profile: &UserProfile) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait RideRequestRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<RideRequest>, RepositoryError>;
    async fn find_by_driver(&self, driver_id: Uuid) -> Result<Vec<RideRequest>, RepositoryError>;
    async fn find_by_rider(&self, rider_id: Uuid) -> Result<Vec<RideRequest>, RepositoryError>;
    /// Moves the request from `from` to `to`. Returns false when it was no
    /// longer in `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: RideRequestStatus,
        to: RideRequestStatus,
    ) -> Result<bool, RepositoryError>;
    /// Removes the request if it is still pending. Returns whether a row went.
    async fn delete_pending(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, RepositoryError>;
    /// Conversations the user takes part in, most recent activity first.
    async fn find_by_participant(&self, user_id: Uuid) -> Result<Vec<Conversation>, RepositoryError>;
    async fn find_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, RepositoryError>;
    /// Stores the message and, in the same transaction, moves `last_message`
    /// and adds one to the recipient's unread counter.
    async fn append_message(&self, message: &Message, recipient_id: Uuid) -> Result<(), RepositoryError>;
    async fn reset_unread(&self, conversation_id: Uuid, user_id: Uuid) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait BookingRepository: Send + Sync {
    /// Applies the whole plan atomically or not at all.
    async fn commit(&self, plan: &BookingPlan) -> Result<(), RepositoryError>;
    /// Inserts the confirmation and deletes the route in one transaction.
    async fn complete_route(
        &self,
        route_id: Uuid,
        confirmation: &BookingConfirmation,
    ) -> Result<(), RepositoryError>;
    async fn find_confirmations_by_driver(
        &self,
        driver_id: Uuid,
    ) -> Result<Vec<BookingConfirmation>, RepositoryError>;
    async fn find_confirmations_by_rider(
        &self,
        rider_id: Uuid,
    ) -> Result<Vec<BookingConfirmation>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait AddressResolver: Send + Sync {
    /// Turns a free-text place description into a postal-style address.
    async fn resolve_address(&self, location_description: &str) -> anyhow::Result<String>;
}
