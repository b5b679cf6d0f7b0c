use crate::domain::route::Route;

/// Query term that matches every route.
pub const ANYWHERE: &str = "anywhere";

fn term_matches(query: &str, field: &str) -> bool {
    let query = query.to_lowercase();
    query == ANYWHERE || field.to_lowercase().contains(&query)
}

/// Case-insensitive substring filter over the catalog. Keeps catalog order;
/// there is no ranking.
pub fn search(from_query: &str, to_query: &str, routes: Vec<Route>) -> Vec<Route> {
    routes
        .into_iter()
        .filter(|route| {
            term_matches(from_query, &route.start_point) && term_matches(to_query, &route.end_point)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::{RouteDay, Schedule};
    use chrono::Utc;
    use uuid::Uuid;

    fn route(start: &str, end: &str) -> Route {
        Route {
            id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            start_point: start.to_string(),
            end_point: end.to_string(),
            travel_time: "09:00".to_string(),
            available_seats: 2,
            price: 20.0,
            schedule: Schedule::Recurring {
                route_days: vec![RouteDay::Mon],
            },
            created_at: Utc::now(),
        }
    }

    fn catalog() -> Vec<Route> {
        vec![
            route("Vizag", "Hyderabad"),
            route("Vizag Port", "Vijayawada"),
            route("Hyderabad", "Vizag"),
            route("Secunderabad", "Hyderabad Airport"),
        ]
    }

    fn ids(routes: &[Route]) -> Vec<Uuid> {
        routes.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_anywhere_returns_everything() {
        let all = catalog();
        let result = search(ANYWHERE, ANYWHERE, all.clone());
        assert_eq!(result, all);

        let result = search("Anywhere", "ANYWHERE", all.clone());
        assert_eq!(result, all);
    }

    #[test]
    fn test_case_insensitive_containment_in_catalog_order() {
        let all = catalog();
        let result = search("vizag", ANYWHERE, all.clone());
        assert_eq!(ids(&result), vec![all[0].id, all[1].id]);

        let result = search(ANYWHERE, "HYDERABAD", all.clone());
        assert_eq!(ids(&result), vec![all[0].id, all[3].id]);

        let result = search("bad", "hyd", all.clone());
        assert_eq!(ids(&result), vec![all[3].id]);
    }

    #[test]
    fn test_refiltering_is_stable() {
        for (from, to) in [("vizag", "hyd"), (ANYWHERE, "vij"), ("abad", ANYWHERE), ("x", "y")] {
            let once = search(from, to, catalog());
            let twice = search(from, to, once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert!(search("vizag", "hyderabad", vec![]).is_empty());
        assert!(search("chennai", ANYWHERE, catalog()).is_empty());
    }
}
