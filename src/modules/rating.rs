use std::collections::BTreeSet;

use diesel::{Connection, SqliteConnection};
use log::{debug, info};
use skillratings::trueskill::{trueskill_multi_team, TrueSkillConfig, TrueSkillRating};
use skillratings::MultiTeamOutcome;

use crate::errors::{CustomResult, Error};
use crate::modules::cache::DriverCache;
use crate::modules::models::category::Championship;
use crate::modules::models::driver::Driver;
use crate::modules::models::race_result::RaceResult;
use crate::modules::models::round::Round;

fn rating_config() -> TrueSkillConfig {
    TrueSkillConfig {
        draw_probability: 0.0,
        ..TrueSkillConfig::new()
    }
}

/// # compute new ratings
/// every finisher is a team of one ranked by position, lower is better
///
/// ## Arguments
/// * `field` - the current ratings with the finishing position of each driver
///
/// ## Returns
/// * `Vec<TrueSkillRating>` - the new ratings, in the order of `field`
pub fn rate_field(field: &[(TrueSkillRating, i32)]) -> Vec<TrueSkillRating> {
    if field.len() < 2 {
        return field.iter().map(|(rating, _)| *rating).collect();
    }

    let teams: Vec<[TrueSkillRating; 1]> = field.iter().map(|(rating, _)| [*rating]).collect();
    let rating_groups: Vec<(&[TrueSkillRating], MultiTeamOutcome)> = teams
        .iter()
        .zip(field)
        .map(|(team, (_, position))| (&team[..], MultiTeamOutcome::new(*position as usize)))
        .collect();

    trueskill_multi_team(&rating_groups[..], &rating_config())
        .into_iter()
        .map(|team| team[0])
        .collect()
}

/// # rate a race session
/// update the rating of every driver who finished the session. each car class is
/// rated on its own, classes with a single finisher are left alone. the new
/// rating is written to the driver and copied to the result.
///
/// ## Arguments
/// * `conn` - the database connection
/// * `cache` - the driver cache, rated drivers are invalidated
/// * `session_id` - the race session to rate
///
/// ## Returns
/// * `usize` - the number of drivers rated
pub fn rate_session(conn: &mut SqliteConnection, cache: &mut dyn DriverCache, session_id: i32) -> CustomResult<usize> {
    let results: Vec<RaceResult> = RaceResult::for_session(conn, session_id)?
        .into_iter()
        .filter(|result| result.participated && result.position.is_some())
        .collect();

    let classes: Vec<Option<i32>> = results
        .iter()
        .map(|result| result.car_class_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut rated = 0;
    for class in classes {
        let class_results: Vec<&RaceResult> = results.iter().filter(|r| r.car_class_id == class).collect();
        if class_results.len() < 2 {
            debug!(target:"rating:rate_session", "Skipping class {:?} of session {}, not enough finishers", class, session_id);
            continue;
        }

        let driver_ids: Vec<i32> = class_results.iter().map(|r| r.driver_id).collect();
        let drivers = Driver::get_from_ids(conn, &driver_ids)?;

        let mut field = Vec::with_capacity(class_results.len());
        for result in &class_results {
            let driver = drivers
                .iter()
                .find(|driver| driver.id == result.driver_id)
                .ok_or(Error::NotFoundError {
                    entity: "driver",
                    id: result.driver_id,
                })?;
            field.push((driver.rating(), result.position.unwrap_or(i32::MAX)));
        }

        let new_ratings = rate_field(&field);
        for (result, new_rating) in class_results.iter().zip(new_ratings) {
            Driver::set_rating_id(conn, result.driver_id, new_rating)?;
            RaceResult::set_rating(conn, result.id, new_rating)?;
            if let Some(driver) = drivers.iter().find(|driver| driver.id == result.driver_id) {
                cache.invalidate(driver);
            }
            rated += 1;
        }
    }

    Ok(rated)
}

/// # recalculate ratings
/// reset every driver of the championship to the default rating and replay the
/// race sessions of all completed rounds in the order they were run
///
/// ## Arguments
/// * `conn` - the database connection
/// * `cache` - the driver cache
/// * `championship_id` - the championship to replay
///
/// ## Returns
/// * `usize` - the number of sessions that changed any rating
pub fn recalculate_ratings(
    conn: &mut SqliteConnection,
    cache: &mut dyn DriverCache,
    championship_id: i32,
) -> CustomResult<usize> {
    conn.transaction::<_, Error, _>(|conn| {
        let championship = Championship::get_by_id(conn, championship_id)?;
        let category_ids: Vec<i32> = championship.categories(conn)?.iter().map(|c| c.id).collect();

        let mut driver_ids = BTreeSet::new();
        for category_id in &category_ids {
            driver_ids.extend(RaceResult::for_category(conn, *category_id)?.iter().map(|r| r.driver_id));
        }

        let drivers = Driver::get_from_ids(conn, &driver_ids.into_iter().collect::<Vec<i32>>())?;
        for driver in &drivers {
            Driver::set_rating_id(conn, driver.id, TrueSkillRating::new())?;
            cache.invalidate(driver);
        }

        let mut replayed = 0;
        for round in Round::completed_for_categories(conn, &category_ids)? {
            for session in round.race_sessions(conn)? {
                if rate_session(conn, cache, session.id)? > 0 {
                    replayed += 1;
                }
            }
        }

        info!(target:"rating:recalculate_ratings", "Replayed {} sessions of championship {} for {} drivers", replayed, championship.name, drivers.len());
        Ok(replayed)
    })
}
