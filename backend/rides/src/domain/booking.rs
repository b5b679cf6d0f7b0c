use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::conversation::Conversation;
use crate::domain::message::Message;
use crate::domain::ride_request::{BookingType, RideRequest};
use crate::domain::route::Route;

pub const SELF_COMPLETED: &str = "self-completed";

#[derive(Debug, Error, PartialEq)]
#[error("invalid rider reference {0:?}")]
pub struct InvalidRiderRef(pub String);

/// Rider on a confirmation. A driver closing a route without an external rider
/// is stored as the `self-completed` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiderRef {
    Rider(Uuid),
    SelfCompleted,
}

impl fmt::Display for RiderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiderRef::Rider(id) => write!(f, "{}", id),
            RiderRef::SelfCompleted => f.write_str(SELF_COMPLETED),
        }
    }
}

impl FromStr for RiderRef {
    type Err = InvalidRiderRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == SELF_COMPLETED {
            return Ok(RiderRef::SelfCompleted);
        }
        Uuid::parse_str(s)
            .map(RiderRef::Rider)
            .map_err(|_| InvalidRiderRef(s.to_string()))
    }
}

impl Serialize for RiderRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RiderRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Append-only record of a finished trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub rider_id: RiderRef,
    pub ride_request_id: Option<Uuid>,
    pub route_id: Option<Uuid>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub estimated_cost: f64,
    pub confirmation_time: DateTime<Utc>,
}

impl BookingConfirmation {
    pub fn self_completed(route: &Route) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver_id: route.driver_id,
            rider_id: RiderRef::SelfCompleted,
            ride_request_id: None,
            route_id: Some(route.id),
            pickup_location: route.start_point.clone(),
            dropoff_location: route.end_point.clone(),
            estimated_cost: route.price,
            confirmation_time: Utc::now(),
        }
    }
}

/// Which side of a booking the caller is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Driver,
    Rider,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationSeed {
    Existing(Uuid),
    New(Conversation),
}

impl ConversationSeed {
    pub fn conversation_id(&self) -> Uuid {
        match self {
            ConversationSeed::Existing(id) => *id,
            ConversationSeed::New(conversation) => conversation.id,
        }
    }
}

/// Everything one booking writes. The store applies it in a single transaction:
/// the request, the conversation when it does not exist yet, the opening
/// message, and the recipient's unread counter.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingPlan {
    pub ride_request: RideRequest,
    pub conversation: ConversationSeed,
    pub message: Message,
    pub recipient_id: Uuid,
}

pub fn opening_message(
    driver_first_name: &str,
    booking_type: BookingType,
    pickup_location: &str,
    dropoff_location: &str,
) -> String {
    format!(
        "Hi {}, I'd like to request a {} for your ride from {} to {}.",
        driver_first_name, booking_type, pickup_location, dropoff_location
    )
}
