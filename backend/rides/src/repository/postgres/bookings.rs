use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::conversations::{append_message_in, insert_conversation_if_absent};
use super::ride_requests::insert_ride_request;
use crate::{
    domain::booking::{BookingConfirmation, BookingPlan, ConversationSeed, RiderRef},
    repository::errors::RepositoryError,
    usecase::contracts::BookingRepository,
};

const CONFIRMATION_COLUMNS: &str = "id, driver_id, rider_id, ride_request_id, route_id, pickup_location, \
     dropoff_location, estimated_cost, confirmation_time";

#[derive(Debug, sqlx::FromRow)]
struct ConfirmationRow {
    id: Uuid,
    driver_id: Uuid,
    rider_id: String,
    ride_request_id: Option<Uuid>,
    route_id: Option<Uuid>,
    pickup_location: String,
    dropoff_location: String,
    estimated_cost: f64,
    confirmation_time: DateTime<Utc>,
}

impl TryFrom<ConfirmationRow> for BookingConfirmation {
    type Error = RepositoryError;

    fn try_from(row: ConfirmationRow) -> Result<Self, Self::Error> {
        let rider_id = row
            .rider_id
            .parse()
            .map_err(|e| RepositoryError::CorruptRow(format!("confirmation {}: {}", row.id, e)))?;

        Ok(BookingConfirmation {
            id: row.id,
            driver_id: row.driver_id,
            rider_id,
            ride_request_id: row.ride_request_id,
            route_id: row.route_id,
            pickup_location: row.pickup_location,
            dropoff_location: row.dropoff_location,
            estimated_cost: row.estimated_cost,
            confirmation_time: row.confirmation_time,
        })
    }
}

#[derive(Clone)]
pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Bind a `Uuid` for `driver_id` and a string for `rider_id`, which is text
/// because it may hold the self-completed sentinel.
fn confirmations_by(column: &str) -> String {
    format!(
        "SELECT {} FROM booking_confirmations WHERE {} = $1 ORDER BY confirmation_time DESC",
        CONFIRMATION_COLUMNS, column
    )
}

impl BookingRepository for PostgresBookingRepository {
    #[tracing::instrument(
        skip(self, plan),
        fields(ride_request_id = %plan.ride_request.id, conversation_id = %plan.conversation.conversation_id())
    )]
    async fn commit(&self, plan: &BookingPlan) -> Result<(), RepositoryError> {
        tracing::debug!("committing booking plan");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        insert_ride_request(&mut tx, &plan.ride_request)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if let ConversationSeed::New(conversation) = &plan.conversation {
            let created = insert_conversation_if_absent(&mut tx, conversation)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
            tracing::debug!(created, "conversation ensured");
        }

        append_message_in(&mut tx, &plan.message, plan.recipient_id).await?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!("booking plan committed");
        Ok(())
    }

    #[tracing::instrument(skip(self, confirmation), fields(route_id = %route_id, confirmation_id = %confirmation.id))]
    async fn complete_route(
        &self,
        route_id: Uuid,
        confirmation: &BookingConfirmation,
    ) -> Result<(), RepositoryError> {
        tracing::debug!("completing route");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query(&format!(
            "INSERT INTO booking_confirmations ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            CONFIRMATION_COLUMNS
        ))
        .bind(confirmation.id)
        .bind(confirmation.driver_id)
        .bind(confirmation.rider_id.to_string())
        .bind(confirmation.ride_request_id)
        .bind(confirmation.route_id)
        .bind(&confirmation.pickup_location)
        .bind(&confirmation.dropoff_location)
        .bind(confirmation.estimated_cost)
        .bind(confirmation.confirmation_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let deleted = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(route_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if deleted.rows_affected() == 0 {
            // Dropping the transaction rolls the confirmation back.
            return Err(RepositoryError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!("route completed");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id))]
    async fn find_confirmations_by_driver(
        &self,
        driver_id: Uuid,
    ) -> Result<Vec<BookingConfirmation>, RepositoryError> {
        tracing::debug!("finding confirmations by driver");

        let rows = sqlx::query_as::<_, ConfirmationRow>(&confirmations_by("driver_id"))
            .bind(driver_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(BookingConfirmation::try_from).collect()
    }

    #[tracing::instrument(skip(self), fields(rider_id = %rider_id))]
    async fn find_confirmations_by_rider(
        &self,
        rider_id: Uuid,
    ) -> Result<Vec<BookingConfirmation>, RepositoryError> {
        tracing::debug!("finding confirmations by rider");

        let rows = sqlx::query_as::<_, ConfirmationRow>(&confirmations_by("rider_id"))
            .bind(RiderRef::Rider(rider_id).to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(BookingConfirmation::try_from).collect()
    }
}
