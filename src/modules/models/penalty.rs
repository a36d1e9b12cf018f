use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::error;
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};
use crate::schema::{deferred_penalties, penalties};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyStatus {
    Drafted,
    Deferred,
    Applied,
}

impl PenaltyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PenaltyStatus::Drafted => "drafted",
            PenaltyStatus::Deferred => "deferred",
            PenaltyStatus::Applied => "applied",
        }
    }
}

impl fmt::Display for PenaltyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PenaltyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drafted" => Ok(PenaltyStatus::Drafted),
            "deferred" => Ok(PenaltyStatus::Deferred),
            "applied" => Ok(PenaltyStatus::Applied),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = penalties)]
pub struct NewPenalty {
    pub number: i32,
    pub driver_id: i32,
    pub team_id: Option<i32>,
    pub category_id: i32,
    pub round_id: i32,
    pub session_id: i32,
    pub time_penalty: i32,
    pub licence_points: i32,
    pub warnings: i32,
    pub reprimand: bool,
    pub points: f64,
    pub status: String,
    pub fact: Option<String>,
    pub decision: Option<String>,
    pub reason: Option<String>,
    pub date: NaiveDate,
}

/// A stewards' decision against a driver.
///
/// `time_penalty` is in seconds. `applied_session_id` is the session the time
/// was added to, which differs from `session_id` when the penalty fell back to
/// a later race.
#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = penalties)]
pub struct Penalty {
    pub id: i32,
    pub number: i32,
    pub driver_id: i32,
    pub team_id: Option<i32>,
    pub category_id: i32,
    pub round_id: i32,
    pub session_id: i32,
    pub time_penalty: i32,
    pub licence_points: i32,
    pub warnings: i32,
    pub reprimand: bool,
    pub points: f64,
    pub status: String,
    pub applied_session_id: Option<i32>,
    pub fact: Option<String>,
    pub decision: Option<String>,
    pub reason: Option<String>,
    pub date: NaiveDate,
}

impl Penalty {
    pub fn new(conn: &mut SqliteConnection, new_penalty: &NewPenalty) -> QueryResult<Penalty> {
        match diesel::insert_into(penalties::table)
            .values(new_penalty)
            .get_result::<Penalty>(conn)
        {
            Ok(penalty) => Ok(penalty),
            Err(error) => {
                error!(target:"models/penalty:new", "Error creating penalty for driver {}: {}", new_penalty.driver_id, error);
                Err(error)
            }
        }
    }

    pub fn get_by_id(conn: &mut SqliteConnection, penalty_id: i32) -> QueryResult<Penalty> {
        penalties::table
            .filter(penalties::id.eq(penalty_id))
            .first::<Penalty>(conn)
    }

    pub fn get_by_ids(conn: &mut SqliteConnection, penalty_ids: &[i32]) -> QueryResult<Vec<Penalty>> {
        penalties::table
            .filter(penalties::id.eq_any(penalty_ids))
            .order(penalties::id.asc())
            .load::<Penalty>(conn)
    }

    pub fn for_category(conn: &mut SqliteConnection, category_id: i32) -> QueryResult<Vec<Penalty>> {
        penalties::table
            .filter(penalties::category_id.eq(category_id))
            .order(penalties::id.asc())
            .load::<Penalty>(conn)
    }

    /// # next penalty number
    /// penalties are numbered per round, starting at 1
    pub fn next_number(conn: &mut SqliteConnection, round_id: i32) -> QueryResult<i32> {
        let last = penalties::table
            .filter(penalties::round_id.eq(round_id))
            .select(max(penalties::number))
            .first::<Option<i32>>(conn)?;

        Ok(last.unwrap_or(0) + 1)
    }

    /// # seconds of penalty in a session
    /// the total time added to a driver's result in the given session
    pub fn seconds_for(conn: &mut SqliteConnection, session_id: i32, driver_id: i32) -> QueryResult<i32> {
        let applied = penalties::table
            .filter(penalties::applied_session_id.eq(session_id))
            .filter(penalties::driver_id.eq(driver_id))
            .filter(penalties::status.eq(PenaltyStatus::Applied.as_str()))
            .select(penalties::time_penalty)
            .load::<i32>(conn)?;

        Ok(applied.iter().sum())
    }

    pub fn status(&self) -> PenaltyStatus {
        self.status.parse().unwrap_or(PenaltyStatus::Drafted)
    }

    pub fn time_penalty_ms(&self) -> CustomResult<i32> {
        self.time_penalty
            .checked_mul(1000)
            .ok_or(Error::TimeOverflowError { driver_id: self.driver_id })
    }

    pub fn set_status(
        &mut self,
        conn: &mut SqliteConnection,
        status: PenaltyStatus,
        applied_session_id: Option<i32>,
    ) -> QueryResult<()> {
        match diesel::update(penalties::table.filter(penalties::id.eq(self.id)))
            .set((
                penalties::status.eq(status.as_str()),
                penalties::applied_session_id.eq(applied_session_id),
            ))
            .execute(conn)
        {
            Ok(_) => {
                self.status = status.as_str().to_string();
                self.applied_session_id = applied_session_id;
                Ok(())
            }
            Err(error) => {
                error!(target:"models/penalty:set_status", "Error updating penalty {}: {}", self.id, error);
                Err(error)
            }
        }
    }

    pub fn delete(&self, conn: &mut SqliteConnection) -> QueryResult<()> {
        diesel::delete(penalties::table.filter(penalties::id.eq(self.id))).execute(conn)?;
        Ok(())
    }
}

/// Link between a penalty and the driver it still has to be applied to.
#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = deferred_penalties)]
pub struct DeferredPenalty {
    pub id: i32,
    pub penalty_id: i32,
    pub driver_id: i32,
    pub is_applied: bool,
}

impl DeferredPenalty {
    pub fn new(conn: &mut SqliteConnection, penalty_id_in: i32, driver_id_in: i32) -> QueryResult<DeferredPenalty> {
        diesel::insert_into(deferred_penalties::table)
            .values((
                deferred_penalties::penalty_id.eq(penalty_id_in),
                deferred_penalties::driver_id.eq(driver_id_in),
                deferred_penalties::is_applied.eq(false),
            ))
            .get_result::<DeferredPenalty>(conn)
    }

    pub fn get_for_penalty(conn: &mut SqliteConnection, penalty_id_in: i32) -> QueryResult<Option<DeferredPenalty>> {
        deferred_penalties::table
            .filter(deferred_penalties::penalty_id.eq(penalty_id_in))
            .first::<DeferredPenalty>(conn)
            .optional()
    }

    /// # get the pending penalties of a driver
    /// oldest first
    pub fn pending_for_driver(conn: &mut SqliteConnection, driver_id_in: i32) -> QueryResult<Vec<DeferredPenalty>> {
        deferred_penalties::table
            .filter(deferred_penalties::driver_id.eq(driver_id_in))
            .filter(deferred_penalties::is_applied.eq(false))
            .order(deferred_penalties::id.asc())
            .load::<DeferredPenalty>(conn)
    }

    /// every penalty still waiting for a race, oldest first
    pub fn pending(conn: &mut SqliteConnection) -> QueryResult<Vec<DeferredPenalty>> {
        deferred_penalties::table
            .filter(deferred_penalties::is_applied.eq(false))
            .order(deferred_penalties::id.asc())
            .load::<DeferredPenalty>(conn)
    }

    pub fn mark_applied(&mut self, conn: &mut SqliteConnection) -> QueryResult<()> {
        diesel::update(deferred_penalties::table.filter(deferred_penalties::id.eq(self.id)))
            .set(deferred_penalties::is_applied.eq(true))
            .execute(conn)?;
        self.is_applied = true;
        Ok(())
    }

    pub fn delete_for_penalty(conn: &mut SqliteConnection, penalty_id_in: i32) -> QueryResult<usize> {
        diesel::delete(deferred_penalties::table.filter(deferred_penalties::penalty_id.eq(penalty_id_in)))
            .execute(conn)
    }
}
