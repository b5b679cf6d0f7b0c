use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::route::{Route, RouteDay, Schedule},
    repository::errors::RepositoryError,
    usecase::contracts::RouteRepository,
};

const ROUTE_COLUMNS: &str = "id, driver_id, start_point, end_point, travel_time, available_seats, price, \
     schedule_type, route_days, travel_date, departure_at, arrival_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    driver_id: Uuid,
    start_point: String,
    end_point: String,
    travel_time: String,
    available_seats: i32,
    price: f64,
    schedule_type: String,
    route_days: Vec<String>,
    travel_date: Option<NaiveDate>,
    departure_at: Option<DateTime<Utc>>,
    arrival_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RouteRow> for Route {
    type Error = RepositoryError;

    fn try_from(row: RouteRow) -> Result<Self, Self::Error> {
        let schedule = match row.schedule_type.as_str() {
            Schedule::RECURRING => {
                let route_days = row
                    .route_days
                    .iter()
                    .map(|d| d.parse::<RouteDay>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| RepositoryError::CorruptRow(format!("route {}: {}", row.id, e)))?;
                Schedule::Recurring { route_days }
            }
            Schedule::ONE_TIME => match (row.travel_date, row.departure_at, row.arrival_at) {
                (Some(date), Some(departure_at), Some(arrival_at)) => Schedule::OneTime {
                    date,
                    departure_at,
                    arrival_at,
                },
                _ => {
                    return Err(RepositoryError::CorruptRow(format!(
                        "route {}: one-time route without date or timestamps",
                        row.id
                    )));
                }
            },
            other => {
                return Err(RepositoryError::CorruptRow(format!(
                    "route {}: unknown schedule type {:?}",
                    row.id, other
                )));
            }
        };

        Ok(Route {
            id: row.id,
            driver_id: row.driver_id,
            start_point: row.start_point,
            end_point: row.end_point,
            travel_time: row.travel_time,
            available_seats: row.available_seats,
            price: row.price,
            schedule,
            created_at: row.created_at,
        })
    }
}

fn into_routes(rows: Vec<RouteRow>) -> Result<Vec<Route>, RepositoryError> {
    rows.into_iter().map(Route::try_from).collect()
}

#[derive(Clone)]
pub struct PostgresRouteRepository {
    pool: PgPool,
}

impl PostgresRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RouteRepository for PostgresRouteRepository {
    #[tracing::instrument(skip(self, route), fields(route_id = %route.id, driver_id = %route.driver_id))]
    async fn create(&self, route: &Route) -> Result<(), RepositoryError> {
        tracing::debug!("creating route");

        let (route_days, travel_date, departure_at, arrival_at) = match &route.schedule {
            Schedule::Recurring { route_days } => (
                route_days.iter().map(|d| d.as_str().to_string()).collect::<Vec<_>>(),
                None,
                None,
                None,
            ),
            Schedule::OneTime {
                date,
                departure_at,
                arrival_at,
            } => (Vec::new(), Some(*date), Some(*departure_at), Some(*arrival_at)),
        };

        sqlx::query(
            r#"
            INSERT INTO routes (id, driver_id, start_point, end_point, travel_time, available_seats, price,
                                schedule_type, route_days, travel_date, departure_at, arrival_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#
        )
        .bind(route.id)
        .bind(route.driver_id)
        .bind(&route.start_point)
        .bind(&route.end_point)
        .bind(&route.travel_time)
        .bind(route.available_seats)
        .bind(route.price)
        .bind(route.schedule.schedule_type())
        .bind(&route_days)
        .bind(travel_date)
        .bind(departure_at)
        .bind(arrival_at)
        .bind(route.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(route_id = %route.id, "route created successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(route_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Route>, RepositoryError> {
        tracing::debug!("finding route by id");

        let row = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM routes WHERE id = $1",
            ROUTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(Route::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Route>, RepositoryError> {
        tracing::debug!("listing catalog");

        let rows = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM routes ORDER BY created_at ASC, id ASC",
            ROUTE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = rows.len(), "catalog loaded");
        into_routes(rows)
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id))]
    async fn find_by_driver(&self, driver_id: Uuid) -> Result<Vec<Route>, RepositoryError> {
        tracing::debug!("finding routes by driver");

        let rows = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM routes WHERE driver_id = $1 ORDER BY created_at DESC",
            ROUTE_COLUMNS
        ))
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(driver_id = %driver_id, count = rows.len(), "found routes");
        into_routes(rows)
    }

    #[tracing::instrument(skip(self), fields(route_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        tracing::debug!("deleting route");

        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(schedule_type: &str) -> RouteRow {
        RouteRow {
            id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            start_point: "Vizag".to_string(),
            end_point: "Hyderabad".to_string(),
            travel_time: "09:00".to_string(),
            available_seats: 2,
            price: 25.0,
            schedule_type: schedule_type.to_string(),
            route_days: vec![],
            travel_date: None,
            departure_at: None,
            arrival_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_recurring_row_maps_days() {
        let mut r = row("recurring");
        r.route_days = vec!["mon".to_string(), "sat".to_string()];

        let route = Route::try_from(r).unwrap();

        assert_eq!(
            route.schedule,
            Schedule::Recurring {
                route_days: vec![RouteDay::Mon, RouteDay::Sat]
            }
        );
    }

    #[test]
    fn test_one_time_row_needs_timestamps() {
        let mut r = row("one-time");
        r.travel_date = Some(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());

        assert!(matches!(Route::try_from(r), Err(RepositoryError::CorruptRow(_))));
    }

    #[test]
    fn test_unknown_values_are_corrupt() {
        assert!(matches!(Route::try_from(row("weekly")), Err(RepositoryError::CorruptRow(_))));

        let mut r = row("recurring");
        r.route_days = vec!["funday".to_string()];
        assert!(matches!(Route::try_from(r), Err(RepositoryError::CorruptRow(_))));
    }
}
