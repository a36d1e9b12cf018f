use diesel::prelude::*;
use diesel::SqliteConnection;
use log::error;
use serde::{Deserialize, Serialize};

use crate::schema::qualifying_results;

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = qualifying_results)]
pub struct NewQualifyingResult {
    pub driver_id: i32,
    pub round_id: i32,
    pub category_id: i32,
    pub session_id: i32,
    pub car_class_id: Option<i32>,
    pub position: Option<i32>,
    pub laptime: Option<i32>,
    pub gap_to_first: Option<i32>,
    pub participated: bool,
    pub status: String,
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = qualifying_results)]
pub struct QualifyingResult {
    pub id: i32,
    pub driver_id: i32,
    pub round_id: i32,
    pub category_id: i32,
    pub session_id: i32,
    pub car_class_id: Option<i32>,
    pub position: Option<i32>,
    pub laptime: Option<i32>,
    pub gap_to_first: Option<i32>,
    pub participated: bool,
    pub status: String,
}

impl QualifyingResult {
    pub fn new(conn: &mut SqliteConnection, result: &NewQualifyingResult) -> QueryResult<QualifyingResult> {
        match diesel::insert_into(qualifying_results::table)
            .values(result)
            .get_result::<QualifyingResult>(conn)
        {
            Ok(result) => Ok(result),
            Err(error) => {
                error!(target:"models/qualifying_result:new", "Error saving qualifying of driver {} in session {}: {}", result.driver_id, result.session_id, error);
                Err(error)
            }
        }
    }

    pub fn for_session(conn: &mut SqliteConnection, session_id: i32) -> QueryResult<Vec<QualifyingResult>> {
        let mut results = qualifying_results::table
            .filter(qualifying_results::session_id.eq(session_id))
            .order(qualifying_results::id.asc())
            .load::<QualifyingResult>(conn)?;

        results.sort_by_key(|result| result.position.unwrap_or(i32::MAX));
        Ok(results)
    }

    pub fn for_category(conn: &mut SqliteConnection, category_id: i32) -> QueryResult<Vec<QualifyingResult>> {
        qualifying_results::table
            .filter(qualifying_results::category_id.eq(category_id))
            .order(qualifying_results::id.asc())
            .load::<QualifyingResult>(conn)
    }

    pub fn get_for_driver(
        conn: &mut SqliteConnection,
        session_id: i32,
        driver_id: i32,
    ) -> QueryResult<Option<QualifyingResult>> {
        qualifying_results::table
            .filter(qualifying_results::session_id.eq(session_id))
            .filter(qualifying_results::driver_id.eq(driver_id))
            .first::<QualifyingResult>(conn)
            .optional()
    }
}
