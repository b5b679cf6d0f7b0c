use chrono::Utc;
use uuid::Uuid;

use crate::domain::booking::BookingConfirmation;
use crate::domain::route::{Route, RouteDraft};
use crate::usecase::contracts::{BookingRepository, RouteRepository};
use crate::usecase::error::UsecaseError;
use crate::usecase::feed::{ChangeFeed, FeedEvent};
use crate::usecase::search::{search, ANYWHERE};

pub struct RoutesUseCase<R, B>
where
    R: RouteRepository,
    B: BookingRepository,
{
    route_repository: R,
    booking_repository: B,
    feed: ChangeFeed,
}

impl<R, B> RoutesUseCase<R, B>
where
    R: RouteRepository,
    B: BookingRepository,
{
    pub fn new(route_repository: R, booking_repository: B, feed: ChangeFeed) -> Self {
        Self {
            route_repository,
            booking_repository,
            feed,
        }
    }

    #[tracing::instrument(skip(self, draft), fields(driver_id = %driver_id))]
    pub async fn publish(&self, driver_id: Uuid, draft: RouteDraft) -> Result<Route, UsecaseError> {
        tracing::debug!("publishing route");

        let route = draft.publish(driver_id, Utc::now()).map_err(|e| {
            tracing::warn!(error = %e, "route rejected");
            UsecaseError::from(e)
        })?;
        self.route_repository.create(&route).await?;
        self.feed.publish(FeedEvent::RoutePublished { route_id: route.id });

        tracing::info!(route_id = %route.id, schedule_type = route.schedule.schedule_type(), "route published");
        Ok(route)
    }

    #[tracing::instrument(skip(self), fields(route_id = %route_id))]
    pub async fn get_route(&self, route_id: Uuid) -> Result<Route, UsecaseError> {
        tracing::debug!("getting route");

        self.route_repository
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Ride".to_string()))
    }

    #[tracing::instrument(skip(self))]
    pub async fn search(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<Route>, UsecaseError> {
        let from = from.map(str::trim).filter(|f| !f.is_empty()).unwrap_or(ANYWHERE);
        let to = to.map(str::trim).filter(|t| !t.is_empty()).unwrap_or(ANYWHERE);
        tracing::debug!(%from, %to, "searching catalog");

        let catalog = self.route_repository.find_all().await?;
        let total = catalog.len();
        let matches = search(from, to, catalog);

        tracing::debug!(total, matched = matches.len(), "catalog searched");
        Ok(matches)
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id))]
    pub async fn get_driver_routes(&self, driver_id: Uuid) -> Result<Vec<Route>, UsecaseError> {
        tracing::debug!("getting driver routes");

        let routes = self.route_repository.find_by_driver(driver_id).await?;

        tracing::debug!(count = routes.len(), "retrieved driver routes");
        Ok(routes)
    }

    /// Removing an already-gone route succeeds. Ride requests pointing at it
    /// are left as they are.
    #[tracing::instrument(skip(self), fields(driver_id = %driver_id, route_id = %route_id))]
    pub async fn remove_route(&self, driver_id: Uuid, route_id: Uuid) -> Result<(), UsecaseError> {
        tracing::debug!("removing route");

        let Some(route) = self.route_repository.find_by_id(route_id).await? else {
            tracing::debug!("route already absent");
            return Ok(());
        };

        if route.driver_id != driver_id {
            tracing::warn!("unauthorized route delete attempt");
            return Err(UsecaseError::Forbidden("Only the driver can remove this ride".to_string()));
        }

        if self.route_repository.delete(route_id).await? {
            self.feed.publish(FeedEvent::RouteRemoved { route_id });
            tracing::info!("route removed");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id, route_id = %route_id))]
    pub async fn complete_route(
        &self,
        driver_id: Uuid,
        route_id: Uuid,
    ) -> Result<BookingConfirmation, UsecaseError> {
        tracing::debug!("completing route");

        let route = self
            .route_repository
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Ride".to_string()))?;

        if route.driver_id != driver_id {
            tracing::warn!("unauthorized route complete attempt");
            return Err(UsecaseError::Forbidden("Only the driver can complete this ride".to_string()));
        }

        let confirmation = BookingConfirmation::self_completed(&route);
        self.booking_repository
            .complete_route(route.id, &confirmation)
            .await?;
        self.feed.publish(FeedEvent::RouteRemoved { route_id });

        tracing::info!(confirmation_id = %confirmation.id, estimated_cost = confirmation.estimated_cost, "route completed");
        Ok(confirmation)
    }
}
