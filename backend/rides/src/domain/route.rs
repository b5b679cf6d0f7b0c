use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MIN_SEATS: i32 = 1;
pub const MAX_SEATS: i32 = 8;
pub const MIN_PRICE: f64 = 0.0;
pub const MAX_PRICE: f64 = 50.0;

/// Arrival of a one-time route is departure plus this many hours. There is no
/// trip-duration estimate behind it.
pub const PLACEHOLDER_TRIP_HOURS: i64 = 8;

const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum RouteValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("available seats must be between 1 and 8, got {0}")]
    SeatsOutOfRange(i32),
    #[error("price must be between 0 and 50, got {0}")]
    PriceOutOfRange(f64),
    #[error("travel time must look like HH:MM, got {0:?}")]
    InvalidTravelTime(String),
    #[error("unknown route day {0:?}")]
    InvalidRouteDay(String),
    #[error("a recurring route needs at least one day")]
    NoRouteDays,
    #[error("invalid schedule: {date} is before today ({today})")]
    InvalidSchedule { date: NaiveDate, today: NaiveDate },
    #[error("utc offset of {0} minutes is out of range")]
    InvalidUtcOffset(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl RouteDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDay::Mon => "mon",
            RouteDay::Tue => "tue",
            RouteDay::Wed => "wed",
            RouteDay::Thu => "thu",
            RouteDay::Fri => "fri",
            RouteDay::Sat => "sat",
            RouteDay::Sun => "sun",
        }
    }
}

impl FromStr for RouteDay {
    type Err = RouteValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mon" => Ok(RouteDay::Mon),
            "tue" => Ok(RouteDay::Tue),
            "wed" => Ok(RouteDay::Wed),
            "thu" => Ok(RouteDay::Thu),
            "fri" => Ok(RouteDay::Fri),
            "sat" => Ok(RouteDay::Sat),
            "sun" => Ok(RouteDay::Sun),
            _ => Err(RouteValidationError::InvalidRouteDay(s.to_string())),
        }
    }
}

impl fmt::Display for RouteDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative schedule of a route. The variant decides which representation
/// exists, so a recurring route never carries timestamps and vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schedule_type", rename_all = "kebab-case")]
pub enum Schedule {
    Recurring {
        route_days: Vec<RouteDay>,
    },
    OneTime {
        date: NaiveDate,
        departure_at: DateTime<Utc>,
        arrival_at: DateTime<Utc>,
    },
}

impl Schedule {
    pub const RECURRING: &'static str = "recurring";
    pub const ONE_TIME: &'static str = "one-time";

    pub fn schedule_type(&self) -> &'static str {
        match self {
            Schedule::Recurring { .. } => Self::RECURRING,
            Schedule::OneTime { .. } => Self::ONE_TIME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Recurring,
    Upcoming,
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub start_point: String,
    pub end_point: String,
    pub travel_time: String,
    pub available_seats: i32,
    pub price: f64,
    pub schedule: Schedule,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Display status, computed on read and never stored.
    pub fn status(&self, now: DateTime<Utc>) -> RouteStatus {
        match &self.schedule {
            Schedule::Recurring { .. } => RouteStatus::Recurring,
            Schedule::OneTime {
                departure_at,
                arrival_at,
                ..
            } => {
                if now < *departure_at {
                    RouteStatus::Upcoming
                } else if now <= *arrival_at {
                    RouteStatus::Ongoing
                } else {
                    RouteStatus::Completed
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScheduleDraft {
    Recurring { route_days: Vec<RouteDay> },
    OneTime { date: NaiveDate },
}

/// What a driver submits when publishing. `utc_offset_minutes` is the driver's
/// local offset (IST is +330); dates and the travel time are read in that zone.
#[derive(Debug, Clone)]
pub struct RouteDraft {
    pub start_point: String,
    pub end_point: String,
    pub travel_time: String,
    pub available_seats: i32,
    pub price: f64,
    pub schedule: ScheduleDraft,
    pub utc_offset_minutes: i32,
}

impl RouteDraft {
    pub fn publish(self, driver_id: Uuid, now: DateTime<Utc>) -> Result<Route, RouteValidationError> {
        let start_point = self.start_point.trim().to_string();
        let end_point = self.end_point.trim().to_string();
        if start_point.is_empty() {
            return Err(RouteValidationError::MissingField("start point"));
        }
        if end_point.is_empty() {
            return Err(RouteValidationError::MissingField("end point"));
        }

        if !(MIN_SEATS..=MAX_SEATS).contains(&self.available_seats) {
            return Err(RouteValidationError::SeatsOutOfRange(self.available_seats));
        }

        if !self.price.is_finite() || !(MIN_PRICE..=MAX_PRICE).contains(&self.price) {
            return Err(RouteValidationError::PriceOutOfRange(self.price));
        }

        let departure_time = NaiveTime::parse_from_str(self.travel_time.trim(), "%H:%M")
            .map_err(|_| RouteValidationError::InvalidTravelTime(self.travel_time.clone()))?;

        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(RouteValidationError::InvalidUtcOffset(self.utc_offset_minutes));
        }
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or(RouteValidationError::InvalidUtcOffset(self.utc_offset_minutes))?;

        let schedule = match self.schedule {
            ScheduleDraft::Recurring { mut route_days } => {
                if route_days.is_empty() {
                    return Err(RouteValidationError::NoRouteDays);
                }
                route_days.sort();
                route_days.dedup();
                Schedule::Recurring { route_days }
            }
            ScheduleDraft::OneTime { date } => {
                // Only the calendar day is compared, not the departure time.
                let today = now.with_timezone(&offset).date_naive();
                if date < today {
                    return Err(RouteValidationError::InvalidSchedule { date, today });
                }

                let departure_at = date
                    .and_time(departure_time)
                    .and_local_timezone(offset)
                    .single()
                    .ok_or(RouteValidationError::InvalidUtcOffset(self.utc_offset_minutes))?
                    .with_timezone(&Utc);
                let arrival_at = departure_at + Duration::hours(PLACEHOLDER_TRIP_HOURS);

                Schedule::OneTime {
                    date,
                    departure_at,
                    arrival_at,
                }
            }
        };

        Ok(Route {
            id: Uuid::new_v4(),
            driver_id,
            start_point,
            end_point,
            travel_time: departure_time.format("%H:%M").to_string(),
            available_seats: self.available_seats,
            price: self.price,
            schedule,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    fn draft(schedule: ScheduleDraft) -> RouteDraft {
        RouteDraft {
            start_point: "Vizag".to_string(),
            end_point: "Hyderabad".to_string(),
            travel_time: "09:00".to_string(),
            available_seats: 3,
            price: 25.0,
            schedule,
            utc_offset_minutes: 0,
        }
    }

    fn one_time(departure_at: DateTime<Utc>, arrival_at: DateTime<Utc>) -> Route {
        Route {
            id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            start_point: "Vizag".to_string(),
            end_point: "Hyderabad".to_string(),
            travel_time: "09:00".to_string(),
            available_seats: 2,
            price: 25.0,
            schedule: Schedule::OneTime {
                date: departure_at.date_naive(),
                departure_at,
                arrival_at,
            },
            created_at: departure_at,
        }
    }

    #[test]
    fn test_status_follows_departure_and_arrival() {
        let t1 = Utc.with_ymd_and_hms(2026, 10, 20, 9, 0, 0).unwrap();
        let t2 = t1 + Duration::hours(8);
        let route = one_time(t1, t2);

        assert_eq!(route.status(t1 - Duration::seconds(1)), RouteStatus::Upcoming);
        assert_eq!(route.status(t1), RouteStatus::Ongoing);
        assert_eq!(route.status(t1 + Duration::hours(3)), RouteStatus::Ongoing);
        assert_eq!(route.status(t2), RouteStatus::Ongoing);
        assert_eq!(route.status(t2 + Duration::seconds(1)), RouteStatus::Completed);
    }

    #[test]
    fn test_recurring_status_ignores_clock() {
        let route = draft(ScheduleDraft::Recurring {
            route_days: vec![RouteDay::Mon],
        })
        .publish(Uuid::new_v4(), now())
        .unwrap();

        assert_eq!(route.status(now()), RouteStatus::Recurring);
        assert_eq!(route.status(now() + Duration::days(400)), RouteStatus::Recurring);
        assert_eq!(route.status(now() - Duration::days(400)), RouteStatus::Recurring);
    }

    #[test]
    fn test_seat_bounds_are_inclusive() {
        let recurring = || ScheduleDraft::Recurring {
            route_days: vec![RouteDay::Fri],
        };

        for seats in [0, 9, -1] {
            let mut d = draft(recurring());
            d.available_seats = seats;
            assert_eq!(
                d.publish(Uuid::new_v4(), now()),
                Err(RouteValidationError::SeatsOutOfRange(seats))
            );
        }

        for seats in [1, 8] {
            let mut d = draft(recurring());
            d.available_seats = seats;
            assert_eq!(d.publish(Uuid::new_v4(), now()).unwrap().available_seats, seats);
        }
    }

    #[test]
    fn test_price_range() {
        let mut d = draft(ScheduleDraft::Recurring {
            route_days: vec![RouteDay::Sat],
        });
        d.price = 50.5;
        assert!(matches!(
            d.clone().publish(Uuid::new_v4(), now()),
            Err(RouteValidationError::PriceOutOfRange(_))
        ));

        d.price = f64::NAN;
        assert!(d.clone().publish(Uuid::new_v4(), now()).is_err());

        d.price = 0.0;
        assert!(d.publish(Uuid::new_v4(), now()).is_ok());
    }

    #[test]
    fn test_past_date_rejected_today_accepted() {
        let yesterday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let result = draft(ScheduleDraft::OneTime { date: yesterday }).publish(Uuid::new_v4(), now());
        assert_eq!(
            result,
            Err(RouteValidationError::InvalidSchedule {
                date: yesterday,
                today
            })
        );

        // Departure earlier today is still accepted; only the calendar day is checked.
        let mut d = draft(ScheduleDraft::OneTime { date: today });
        d.travel_time = "06:00".to_string();
        assert!(d.publish(Uuid::new_v4(), now()).is_ok());
    }

    #[test]
    fn test_today_is_read_in_driver_offset() {
        // 20:00 UTC is already the next day in IST.
        let late = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap();
        let utc_today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let mut d = draft(ScheduleDraft::OneTime { date: utc_today });
        d.utc_offset_minutes = 330;
        assert!(matches!(
            d.publish(Uuid::new_v4(), late),
            Err(RouteValidationError::InvalidSchedule { .. })
        ));

        let d = draft(ScheduleDraft::OneTime { date: utc_today });
        assert!(d.publish(Uuid::new_v4(), late).is_ok());
    }

    #[test]
    fn test_one_time_arrival_is_placeholder_hours_after_departure() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap();
        let mut d = draft(ScheduleDraft::OneTime { date });
        d.utc_offset_minutes = 330;

        let route = d.publish(Uuid::new_v4(), now()).unwrap();
        match route.schedule {
            Schedule::OneTime {
                date: stored,
                departure_at,
                arrival_at,
            } => {
                assert_eq!(stored, date);
                assert_eq!(departure_at, Utc.with_ymd_and_hms(2026, 10, 21, 3, 30, 0).unwrap());
                assert_eq!(arrival_at - departure_at, Duration::hours(PLACEHOLDER_TRIP_HOURS));
            }
            other => panic!("expected one-time schedule, got {:?}", other),
        }
    }

    #[test]
    fn test_recurring_needs_days_and_dedups_them() {
        let result = draft(ScheduleDraft::Recurring { route_days: vec![] }).publish(Uuid::new_v4(), now());
        assert_eq!(result, Err(RouteValidationError::NoRouteDays));

        let route = draft(ScheduleDraft::Recurring {
            route_days: vec![RouteDay::Wed, RouteDay::Mon, RouteDay::Wed],
        })
        .publish(Uuid::new_v4(), now())
        .unwrap();
        assert_eq!(
            route.schedule,
            Schedule::Recurring {
                route_days: vec![RouteDay::Mon, RouteDay::Wed]
            }
        );
    }

    #[test]
    fn test_blank_points_and_bad_time_rejected() {
        let mut d = draft(ScheduleDraft::Recurring {
            route_days: vec![RouteDay::Sun],
        });
        d.start_point = "   ".to_string();
        assert_eq!(
            d.publish(Uuid::new_v4(), now()),
            Err(RouteValidationError::MissingField("start point"))
        );

        let mut d = draft(ScheduleDraft::Recurring {
            route_days: vec![RouteDay::Sun],
        });
        d.travel_time = "9 am".to_string();
        assert!(matches!(
            d.publish(Uuid::new_v4(), now()),
            Err(RouteValidationError::InvalidTravelTime(_))
        ));
    }

    #[test]
    fn test_route_day_parsing() {
        assert_eq!("Mon".parse::<RouteDay>().unwrap(), RouteDay::Mon);
        assert_eq!("sun".parse::<RouteDay>().unwrap(), RouteDay::Sun);
        assert!("funday".parse::<RouteDay>().is_err());
    }

    #[test]
    fn test_schedule_serialization_uses_schedule_type_tag() {
        let schedule = Schedule::Recurring {
            route_days: vec![RouteDay::Mon, RouteDay::Tue],
        };
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["schedule_type"], "recurring");
        assert_eq!(json["route_days"], serde_json::json!(["mon", "tue"]));
    }
}
