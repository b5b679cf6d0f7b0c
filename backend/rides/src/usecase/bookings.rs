use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::booking::{opening_message, BookingConfirmation, BookingPlan, ConversationSeed, Party};
use crate::domain::conversation::{conversation_id_for, Conversation, ParticipantDetails};
use crate::domain::message::Message;
use crate::domain::ride_request::{BookingType, RideRequest};
use crate::domain::session::Session;
use crate::usecase::contracts::{
    BookingRepository, ConversationRepository, ProfileRepository, RouteRepository,
};
use crate::usecase::error::UsecaseError;
use crate::usecase::feed::{ChangeFeed, FeedEvent};

const ANONYMOUS_DISPLAY_NAME: &str = "Me";

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub route_id: Uuid,
    pub booking_type: BookingType,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    /// Where a signed-out client should come back to after signing in.
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub ride_request: RideRequest,
    pub conversation_id: Uuid,
    pub conversation_created: bool,
    pub message: Message,
}

pub struct BookingsUseCase<R, P, C, B>
where
    R: RouteRepository,
    P: ProfileRepository,
    C: ConversationRepository,
    B: BookingRepository,
{
    route_repository: R,
    profile_repository: P,
    conversation_repository: C,
    booking_repository: B,
    feed: ChangeFeed,
    commit_timeout: Duration,
}

impl<R, P, C, B> BookingsUseCase<R, P, C, B>
where
    R: RouteRepository,
    P: ProfileRepository,
    C: ConversationRepository,
    B: BookingRepository,
{
    pub fn new(
        route_repository: R,
        profile_repository: P,
        conversation_repository: C,
        booking_repository: B,
        feed: ChangeFeed,
        commit_timeout: Duration,
    ) -> Self {
        Self {
            route_repository,
            profile_repository,
            conversation_repository,
            booking_repository,
            feed,
            commit_timeout,
        }
    }

    /// Creates a pending ride request, makes sure the rider and driver share a
    /// conversation, and posts the opening message. The three writes land in
    /// one transaction.
    #[tracing::instrument(
        skip(self, session, request),
        fields(route_id = %request.route_id, booking_type = %request.booking_type)
    )]
    pub async fn request_booking(
        &self,
        session: Option<&Session>,
        request: BookingRequest,
    ) -> Result<BookingReceipt, UsecaseError> {
        tracing::debug!("booking requested");

        let Some(session) = session else {
            let redirect_to = request
                .return_to
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| format!("/ride/{}", request.route_id));
            tracing::debug!(%redirect_to, "anonymous booking attempt");
            return Err(UsecaseError::NotAuthenticated { redirect_to });
        };
        let rider_id = session.user_id;

        let route = self
            .route_repository
            .find_by_id(request.route_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Ride".to_string()))?;

        if route.driver_id == rider_id {
            tracing::warn!(%rider_id, "driver tried to book own ride");
            return Err(UsecaseError::Validation("You cannot book your own ride".to_string()));
        }

        let driver = self
            .profile_repository
            .find_by_id(route.driver_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Driver profile".to_string()))?;

        let pickup_location = non_blank(request.pickup_location).unwrap_or_else(|| route.start_point.clone());
        let dropoff_location = non_blank(request.dropoff_location).unwrap_or_else(|| route.end_point.clone());

        let ride_request = RideRequest::pending(
            rider_id,
            &route,
            pickup_location,
            dropoff_location,
            request.booking_type,
        );

        let conversation_id = conversation_id_for(rider_id, driver.id);
        let conversation = match self.conversation_repository.find_by_id(conversation_id).await? {
            Some(existing) => ConversationSeed::Existing(existing.id),
            None => {
                let rider_details = ParticipantDetails {
                    display_name: session
                        .display_name
                        .clone()
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| ANONYMOUS_DISPLAY_NAME.to_string()),
                    avatar_url: session.photo_url.clone().unwrap_or_default(),
                };
                let driver_details = ParticipantDetails {
                    display_name: driver.display_name(),
                    avatar_url: driver.profile_picture_url.clone().unwrap_or_default(),
                };
                ConversationSeed::New(Conversation::between(
                    (rider_id, rider_details),
                    (driver.id, driver_details),
                ))
            }
        };
        let conversation_created = matches!(conversation, ConversationSeed::New(_));

        let message = Message::new(
            conversation_id,
            rider_id,
            opening_message(
                &driver.first_name,
                ride_request.booking_type,
                &ride_request.pickup_location,
                &ride_request.dropoff_location,
            ),
        );

        let plan = BookingPlan {
            ride_request,
            conversation,
            message,
            recipient_id: driver.id,
        };

        match tokio::time::timeout(self.commit_timeout, self.booking_repository.commit(&plan)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "booking commit failed");
                return Err(UsecaseError::BackendWrite(
                    "Could not save your booking request. Please try again.".to_string(),
                ));
            }
            Err(_) => {
                tracing::error!(timeout = ?self.commit_timeout, "booking commit timed out");
                return Err(UsecaseError::Unavailable(
                    "Booking is taking too long. Please try again.".to_string(),
                ));
            }
        }

        self.feed.publish(FeedEvent::MessagePosted {
            participant_ids: vec![rider_id, driver.id],
            message: plan.message.clone(),
        });

        tracing::info!(
            ride_request_id = %plan.ride_request.id,
            %conversation_id,
            conversation_created,
            "booking request committed"
        );

        Ok(BookingReceipt {
            ride_request: plan.ride_request,
            conversation_id,
            conversation_created,
            message: plan.message,
        })
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn history(&self, user_id: Uuid, party: Party) -> Result<Vec<BookingConfirmation>, UsecaseError> {
        tracing::debug!(?party, "getting booking history");

        let confirmations = match party {
            Party::Driver => self.booking_repository.find_confirmations_by_driver(user_id).await?,
            Party::Rider => self.booking_repository.find_confirmations_by_rider(user_id).await?,
        };

        tracing::debug!(count = confirmations.len(), "retrieved booking history");
        Ok(confirmations)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
