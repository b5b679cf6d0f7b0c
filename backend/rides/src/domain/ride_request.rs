use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::route::Route;

#[derive(Debug, Error, PartialEq)]
pub enum RideRequestError {
    #[error("unknown booking type {0:?}")]
    UnknownBookingType(String),
    #[error("unknown ride request status {0:?}")]
    UnknownStatus(String),
    #[error("ride request is already {0}")]
    NotPending(RideRequestStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Seat,
    Parcel,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Seat => "seat",
            BookingType::Parcel => "parcel",
        }
    }
}

impl fmt::Display for BookingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingType {
    type Err = RideRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seat" => Ok(BookingType::Seat),
            "parcel" => Ok(BookingType::Parcel),
            other => Err(RideRequestError::UnknownBookingType(other.to_string())),
        }
    }
}

/// A declined request is deleted rather than stored, so only two states persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideRequestStatus {
    Pending,
    Accepted,
}

impl RideRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideRequestStatus::Pending => "pending",
            RideRequestStatus::Accepted => "accepted",
        }
    }
}

impl fmt::Display for RideRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideRequestStatus {
    type Err = RideRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RideRequestStatus::Pending),
            "accepted" => Ok(RideRequestStatus::Accepted),
            other => Err(RideRequestError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideRequest {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Uuid,
    pub route_id: Uuid,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub desired_time: String,
    pub booking_type: BookingType,
    pub status: RideRequestStatus,
    pub created_at: DateTime<Utc>,
}

impl RideRequest {
    pub fn pending(
        rider_id: Uuid,
        route: &Route,
        pickup_location: String,
        dropoff_location: String,
        booking_type: BookingType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rider_id,
            driver_id: route.driver_id,
            route_id: route.id,
            pickup_location,
            dropoff_location,
            desired_time: route.travel_time.clone(),
            booking_type,
            status: RideRequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Accepting records the decision only; seats on the route are left untouched.
    pub fn accept(&mut self) -> Result<(), RideRequestError> {
        if self.status != RideRequestStatus::Pending {
            return Err(RideRequestError::NotPending(self.status));
        }
        self.status = RideRequestStatus::Accepted;
        Ok(())
    }

    /// Only a pending request can be declined.
    pub fn decline(&self) -> Result<(), RideRequestError> {
        if self.status != RideRequestStatus::Pending {
            return Err(RideRequestError::NotPending(self.status));
        }
        Ok(())
    }
}
