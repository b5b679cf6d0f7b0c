use uuid::Uuid;

use crate::domain::booking::Party;
use crate::domain::ride_request::{RideRequest, RideRequestStatus};
use crate::usecase::contracts::RideRequestRepository;
use crate::usecase::error::UsecaseError;

pub struct RideRequestsUseCase<Q>
where
    Q: RideRequestRepository,
{
    ride_request_repository: Q,
}

impl<Q> RideRequestsUseCase<Q>
where
    Q: RideRequestRepository,
{
    pub fn new(ride_request_repository: Q) -> Self {
        Self {
            ride_request_repository,
        }
    }

    /// Incoming requests for a driver or outgoing ones for a rider, newest first.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list(&self, user_id: Uuid, party: Party) -> Result<Vec<RideRequest>, UsecaseError> {
        tracing::debug!(?party, "listing ride requests");

        let mut requests = match party {
            Party::Driver => self.ride_request_repository.find_by_driver(user_id).await?,
            Party::Rider => self.ride_request_repository.find_by_rider(user_id).await?,
        };
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        tracing::debug!(count = requests.len(), "retrieved ride requests");
        Ok(requests)
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id, ride_request_id = %ride_request_id))]
    pub async fn accept(&self, driver_id: Uuid, ride_request_id: Uuid) -> Result<RideRequest, UsecaseError> {
        tracing::debug!("accepting ride request");

        let mut request = self.owned_by_driver(driver_id, ride_request_id).await?;
        request.accept()?;
        let updated = self
            .ride_request_repository
            .update_status(request.id, RideRequestStatus::Pending, request.status)
            .await?;
        if !updated {
            tracing::warn!("ride request answered concurrently");
            return Err(no_longer_pending());
        }

        tracing::info!(rider_id = %request.rider_id, "ride request accepted");
        Ok(request)
    }

    /// Declining removes a pending request; there is no declined state.
    #[tracing::instrument(skip(self), fields(driver_id = %driver_id, ride_request_id = %ride_request_id))]
    pub async fn decline(&self, driver_id: Uuid, ride_request_id: Uuid) -> Result<(), UsecaseError> {
        tracing::debug!("declining ride request");

        let request = self.owned_by_driver(driver_id, ride_request_id).await?;
        request.decline()?;
        if !self.ride_request_repository.delete_pending(request.id).await? {
            tracing::warn!("ride request answered concurrently");
            return Err(no_longer_pending());
        }

        tracing::info!(rider_id = %request.rider_id, "ride request declined");
        Ok(())
    }

    async fn owned_by_driver(&self, driver_id: Uuid, ride_request_id: Uuid) -> Result<RideRequest, UsecaseError> {
        let request = self
            .ride_request_repository
            .find_by_id(ride_request_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Ride request".to_string()))?;

        if request.driver_id != driver_id {
            tracing::warn!("ride request belongs to another driver");
            return Err(UsecaseError::Forbidden(
                "Only the driver of this ride can answer the request".to_string(),
            ));
        }
        Ok(request)
    }
}

fn no_longer_pending() -> UsecaseError {
    UsecaseError::Validation("ride request is no longer pending".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ride_request::BookingType;
    use crate::usecase::contracts::MockRideRequestRepository;
    use chrono::{Duration, Utc};
    use mockall::predicate::eq;

    fn make_request(driver_id: Uuid, status: RideRequestStatus, age_minutes: i64) -> RideRequest {
        RideRequest {
            id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            driver_id,
            route_id: Uuid::new_v4(),
            pickup_location: "Vizag".to_string(),
            dropoff_location: "Hyderabad".to_string(),
            desired_time: "08:00".to_string(),
            booking_type: BookingType::Seat,
            status,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn test_list_incoming_newest_first() {
        let driver_id = Uuid::new_v4();
        let older = make_request(driver_id, RideRequestStatus::Pending, 30);
        let newer = make_request(driver_id, RideRequestStatus::Accepted, 1);
        let returned = vec![older.clone(), newer.clone()];

        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_driver()
            .with(eq(driver_id))
            .returning(move |_| Ok(returned.clone()));

        let usecase = RideRequestsUseCase::new(mock);
        let requests = usecase.list(driver_id, Party::Driver).await.unwrap();

        assert_eq!(requests, vec![newer, older]);
    }

    #[tokio::test]
    async fn test_list_outgoing_uses_rider_lookup() {
        let rider_id = Uuid::new_v4();
        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_rider()
            .with(eq(rider_id))
            .times(1)
            .returning(|_| Ok(vec![]));
        mock.expect_find_by_driver().times(0);

        let usecase = RideRequestsUseCase::new(mock);
        assert!(usecase.list(rider_id, Party::Rider).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_pending_request() {
        let driver_id = Uuid::new_v4();
        let request = make_request(driver_id, RideRequestStatus::Pending, 5);
        let request_id = request.id;

        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_id()
            .with(eq(request_id))
            .returning(move |_| Ok(Some(request.clone())));
        mock.expect_update_status()
            .with(
                eq(request_id),
                eq(RideRequestStatus::Pending),
                eq(RideRequestStatus::Accepted),
            )
            .times(1)
            .returning(|_, _, _| Ok(true));

        let usecase = RideRequestsUseCase::new(mock);
        let accepted = usecase.accept(driver_id, request_id).await.unwrap();

        assert_eq!(accepted.status, RideRequestStatus::Accepted);
    }

    #[tokio::test]
    async fn test_accept_twice_is_rejected() {
        let driver_id = Uuid::new_v4();
        let request = make_request(driver_id, RideRequestStatus::Accepted, 5);
        let request_id = request.id;

        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(request.clone())));
        mock.expect_update_status().times(0);

        let usecase = RideRequestsUseCase::new(mock);
        let result = usecase.accept(driver_id, request_id).await;

        assert!(matches!(result, Err(UsecaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_only_driver_can_answer() {
        let request = make_request(Uuid::new_v4(), RideRequestStatus::Pending, 5);
        let request_id = request.id;

        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(request.clone())));
        mock.expect_update_status().times(0);
        mock.expect_delete_pending().times(0);

        let usecase = RideRequestsUseCase::new(mock);
        let stranger = Uuid::new_v4();

        assert!(matches!(
            usecase.accept(stranger, request_id).await,
            Err(UsecaseError::Forbidden(_))
        ));
        assert!(matches!(
            usecase.decline(stranger, request_id).await,
            Err(UsecaseError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_decline_deletes() {
        let driver_id = Uuid::new_v4();
        let request = make_request(driver_id, RideRequestStatus::Pending, 5);
        let request_id = request.id;

        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(request.clone())));
        mock.expect_delete_pending()
            .with(eq(request_id))
            .times(1)
            .returning(|_| Ok(true));

        let usecase = RideRequestsUseCase::new(mock);
        assert!(usecase.decline(driver_id, request_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_decline_accepted_request_is_rejected() {
        let driver_id = Uuid::new_v4();
        let request = make_request(driver_id, RideRequestStatus::Accepted, 5);
        let request_id = request.id;

        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(request.clone())));
        mock.expect_delete_pending().times(0);

        let usecase = RideRequestsUseCase::new(mock);
        let result = usecase.decline(driver_id, request_id).await;

        assert!(matches!(result, Err(UsecaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_accept_loses_race_with_decline() {
        let driver_id = Uuid::new_v4();
        let request = make_request(driver_id, RideRequestStatus::Pending, 5);
        let request_id = request.id;

        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(request.clone())));
        mock.expect_update_status()
            .times(1)
            .returning(|_, _, _| Ok(false));

        let usecase = RideRequestsUseCase::new(mock);
        let result = usecase.accept(driver_id, request_id).await;

        assert!(matches!(result, Err(UsecaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_decline_after_concurrent_accept_is_rejected() {
        let driver_id = Uuid::new_v4();
        let request = make_request(driver_id, RideRequestStatus::Pending, 5);
        let request_id = request.id;

        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(request.clone())));
        mock.expect_delete_pending()
            .with(eq(request_id))
            .times(1)
            .returning(|_| Ok(false));

        let usecase = RideRequestsUseCase::new(mock);
        let result = usecase.decline(driver_id, request_id).await;

        assert!(matches!(result, Err(UsecaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_request_not_found() {
        let mut mock = MockRideRequestRepository::new();
        mock.expect_find_by_id().returning(|_| Ok(None));

        let usecase = RideRequestsUseCase::new(mock);
        let result = usecase.decline(Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(matches!(result, Err(UsecaseError::NotFound(_))));
    }
}
