use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    domain::ride_request::{RideRequest, RideRequestError, RideRequestStatus},
    repository::errors::RepositoryError,
    usecase::contracts::RideRequestRepository,
};

const RIDE_REQUEST_COLUMNS: &str = "id, rider_id, driver_id, route_id, pickup_location, dropoff_location, \
     desired_time, booking_type, status, created_at";

#[derive(Debug, sqlx::FromRow)]
struct RideRequestRow {
    id: Uuid,
    rider_id: Uuid,
    driver_id: Uuid,
    route_id: Uuid,
    pickup_location: String,
    dropoff_location: String,
    desired_time: String,
    booking_type: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RideRequestRow> for RideRequest {
    type Error = RepositoryError;

    fn try_from(row: RideRequestRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |e: RideRequestError| {
            RepositoryError::CorruptRow(format!("ride request {}: {}", id, e))
        };

        Ok(RideRequest {
            id: row.id,
            rider_id: row.rider_id,
            driver_id: row.driver_id,
            route_id: row.route_id,
            booking_type: row.booking_type.parse().map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            pickup_location: row.pickup_location,
            dropoff_location: row.dropoff_location,
            desired_time: row.desired_time,
            created_at: row.created_at,
        })
    }
}

/// Shared with the booking transaction.
pub(super) async fn insert_ride_request(
    tx: &mut Transaction<'_, Postgres>,
    request: &RideRequest,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO ride_requests (id, rider_id, driver_id, route_id, pickup_location, dropoff_location,
                                   desired_time, booking_type, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#
    )
    .bind(request.id)
    .bind(request.rider_id)
    .bind(request.driver_id)
    .bind(request.route_id)
    .bind(&request.pickup_location)
    .bind(&request.dropoff_location)
    .bind(&request.desired_time)
    .bind(request.booking_type.as_str())
    .bind(request.status.as_str())
    .bind(request.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[derive(Clone)]
pub struct PostgresRideRequestRepository {
    pool: PgPool,
}

impl PostgresRideRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_where(&self, column: &str, value: Uuid) -> Result<Vec<RideRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, RideRequestRow>(&format!(
            "SELECT {} FROM ride_requests WHERE {} = $1 ORDER BY created_at DESC",
            RIDE_REQUEST_COLUMNS, column
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(RideRequest::try_from).collect()
    }
}

impl RideRequestRepository for PostgresRideRequestRepository {
    #[tracing::instrument(skip(self), fields(ride_request_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<RideRequest>, RepositoryError> {
        tracing::debug!("finding ride request by id");

        let row = sqlx::query_as::<_, RideRequestRow>(&format!(
            "SELECT {} FROM ride_requests WHERE id = $1",
            RIDE_REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(RideRequest::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id))]
    async fn find_by_driver(&self, driver_id: Uuid) -> Result<Vec<RideRequest>, RepositoryError> {
        tracing::debug!("finding incoming ride requests");
        self.find_where("driver_id", driver_id).await
    }

    #[tracing::instrument(skip(self), fields(rider_id = %rider_id))]
    async fn find_by_rider(&self, rider_id: Uuid) -> Result<Vec<RideRequest>, RepositoryError> {
        tracing::debug!("finding outgoing ride requests");
        self.find_where("rider_id", rider_id).await
    }

    #[tracing::instrument(skip(self), fields(ride_request_id = %id, %from, %to))]
    async fn update_status(
        &self,
        id: Uuid,
        from: RideRequestStatus,
        to: RideRequestStatus,
    ) -> Result<bool, RepositoryError> {
        tracing::debug!("updating ride request status");

        let result = sqlx::query("UPDATE ride_requests SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(ride_request_id = %id))]
    async fn delete_pending(&self, id: Uuid) -> Result<bool, RepositoryError> {
        tracing::debug!("deleting pending ride request");

        let result = sqlx::query("DELETE FROM ride_requests WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(RideRequestStatus::Pending.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
