use diesel::prelude::*;
use diesel::SqliteConnection;
use log::error;
use serde::{Deserialize, Serialize};
use skillratings::trueskill::TrueSkillRating;

use crate::schema::race_results;

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = race_results)]
pub struct NewRaceResult {
    pub driver_id: i32,
    pub round_id: i32,
    pub category_id: i32,
    pub session_id: i32,
    pub car_class_id: Option<i32>,
    pub position: Option<i32>,
    pub fastest_lap: bool,
    pub participated: bool,
    pub status: String,
    pub gap_to_first: Option<i32>,
    pub total_racetime: Option<i32>,
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = race_results)]
pub struct RaceResult {
    pub id: i32,
    pub driver_id: i32,
    pub round_id: i32,
    pub category_id: i32,
    pub session_id: i32,
    pub car_class_id: Option<i32>,
    pub position: Option<i32>,
    pub fastest_lap: bool,
    pub participated: bool,
    pub status: String,
    pub gap_to_first: Option<i32>,
    pub total_racetime: Option<i32>,
    pub mu: Option<f64>,
    pub sigma: Option<f64>,
}

impl RaceResult {
    pub fn new(conn: &mut SqliteConnection, result: &NewRaceResult) -> QueryResult<RaceResult> {
        match diesel::insert_into(race_results::table)
            .values(result)
            .get_result::<RaceResult>(conn)
        {
            Ok(result) => Ok(result),
            Err(error) => {
                error!(target:"models/race_result:new", "Error saving result of driver {} in session {}: {}", result.driver_id, result.session_id, error);
                Err(error)
            }
        }
    }

    /// # get the results of a session
    /// finishers by position, then everyone who did not finish
    pub fn for_session(conn: &mut SqliteConnection, session_id: i32) -> QueryResult<Vec<RaceResult>> {
        let mut results = race_results::table
            .filter(race_results::session_id.eq(session_id))
            .order(race_results::id.asc())
            .load::<RaceResult>(conn)?;

        results.sort_by_key(|result| result.position.unwrap_or(i32::MAX));
        Ok(results)
    }

    pub fn for_category(conn: &mut SqliteConnection, category_id: i32) -> QueryResult<Vec<RaceResult>> {
        race_results::table
            .filter(race_results::category_id.eq(category_id))
            .order(race_results::id.asc())
            .load::<RaceResult>(conn)
    }

    pub fn get_for_driver(conn: &mut SqliteConnection, session_id: i32, driver_id: i32) -> QueryResult<Option<RaceResult>> {
        race_results::table
            .filter(race_results::session_id.eq(session_id))
            .filter(race_results::driver_id.eq(driver_id))
            .first::<RaceResult>(conn)
            .optional()
    }

    /// # clear the positions of a session
    /// positions are unique per session and class, so they are cleared before
    /// a reordered session is written back
    pub fn clear_positions(conn: &mut SqliteConnection, session_id: i32) -> QueryResult<usize> {
        diesel::update(race_results::table.filter(race_results::session_id.eq(session_id)))
            .set(race_results::position.eq(None::<i32>))
            .execute(conn)
    }

    /// write back the timing and order of a result
    pub fn save_timing(&self, conn: &mut SqliteConnection) -> QueryResult<()> {
        match diesel::update(race_results::table.filter(race_results::id.eq(self.id)))
            .set((
                race_results::position.eq(self.position),
                race_results::gap_to_first.eq(self.gap_to_first),
                race_results::total_racetime.eq(self.total_racetime),
            ))
            .execute(conn)
        {
            Ok(_) => Ok(()),
            Err(error) => {
                error!(target:"models/race_result:save_timing", "Error updating result {}: {}", self.id, error);
                Err(error)
            }
        }
    }

    /// store the rating the driver had after this race
    pub fn set_rating(conn: &mut SqliteConnection, result_id: i32, rating: TrueSkillRating) -> QueryResult<()> {
        diesel::update(race_results::table.filter(race_results::id.eq(result_id)))
            .set((
                race_results::mu.eq(Some(rating.rating)),
                race_results::sigma.eq(Some(rating.uncertainty)),
            ))
            .execute(conn)?;
        Ok(())
    }
}
