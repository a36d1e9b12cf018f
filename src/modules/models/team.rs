use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::schema::{driver_contracts, team_championships, teams};

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = teams)]
pub struct Team {
    pub id: i32,
    pub name: String,
}

impl Team {
    pub fn new(conn: &mut SqliteConnection, name_in: &str) -> QueryResult<Team> {
        diesel::insert_into(teams::table)
            .values(teams::name.eq(name_in))
            .get_result::<Team>(conn)
    }

    /// # get the current team of a driver
    /// the team of the driver's open contract, the most recent one if several are open
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `driver_id` - the database id of the driver
    ///
    /// ## Returns
    /// * `Option<Team>` - None if the driver has no open contract
    pub fn current_for_driver(conn: &mut SqliteConnection, driver_id: i32) -> QueryResult<Option<Team>> {
        let contract = driver_contracts::table
            .filter(driver_contracts::driver_id.eq(driver_id))
            .filter(driver_contracts::end_date.is_null())
            .order((driver_contracts::start_date.desc(), driver_contracts::id.desc()))
            .first::<DriverContract>(conn)
            .optional()?;

        match contract {
            Some(contract) => teams::table
                .filter(teams::id.eq(contract.team_id))
                .first::<Team>(conn)
                .optional(),
            None => Ok(None),
        }
    }
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = driver_contracts)]
pub struct NewDriverContract {
    pub driver_id: i32,
    pub team_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = driver_contracts)]
pub struct DriverContract {
    pub id: i32,
    pub driver_id: i32,
    pub team_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl DriverContract {
    pub fn new(conn: &mut SqliteConnection, contract: &NewDriverContract) -> QueryResult<DriverContract> {
        diesel::insert_into(driver_contracts::table)
            .values(contract)
            .get_result::<DriverContract>(conn)
    }
}

/// A team's points tally in a championship.
#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = team_championships)]
pub struct TeamChampionship {
    pub id: i32,
    pub team_id: i32,
    pub championship_id: i32,
    pub points: f64,
    pub penalty_points: i32,
}

impl TeamChampionship {
    pub fn new(conn: &mut SqliteConnection, team_id_in: i32, championship_id_in: i32) -> QueryResult<TeamChampionship> {
        diesel::insert_into(team_championships::table)
            .values((
                team_championships::team_id.eq(team_id_in),
                team_championships::championship_id.eq(championship_id_in),
                team_championships::points.eq(0.0),
                team_championships::penalty_points.eq(0),
            ))
            .get_result::<TeamChampionship>(conn)
    }

    pub fn get(conn: &mut SqliteConnection, team_id_in: i32, championship_id_in: i32) -> QueryResult<Option<TeamChampionship>> {
        team_championships::table
            .filter(team_championships::team_id.eq(team_id_in))
            .filter(team_championships::championship_id.eq(championship_id_in))
            .first::<TeamChampionship>(conn)
            .optional()
    }

    pub fn for_championship(conn: &mut SqliteConnection, championship_id_in: i32) -> QueryResult<Vec<TeamChampionship>> {
        team_championships::table
            .filter(team_championships::championship_id.eq(championship_id_in))
            .order(team_championships::points.desc())
            .load::<TeamChampionship>(conn)
    }

    pub fn set_points(conn: &mut SqliteConnection, id_in: i32, points_in: f64) -> QueryResult<()> {
        diesel::update(team_championships::table.filter(team_championships::id.eq(id_in)))
            .set(team_championships::points.eq(points_in))
            .execute(conn)?;
        Ok(())
    }

    /// # credit points to the team of a driver
    /// add (or with a negative delta, remove) points to the championship tally of
    /// the driver's current team. drivers without a team only score for themselves
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `driver_id` - the driver who scored the points
    /// * `championship_id` - the championship the points count for
    /// * `delta` - the points to add
    ///
    /// ## Returns
    /// * `bool` - true if a team tally was changed
    pub fn credit_driver_team(
        conn: &mut SqliteConnection,
        driver_id: i32,
        championship_id: i32,
        delta: f64,
    ) -> QueryResult<bool> {
        if delta == 0.0 {
            return Ok(false);
        }

        let team = match Team::current_for_driver(conn, driver_id)? {
            Some(team) => team,
            None => {
                warn!(target:"models/team:credit_driver_team", "Driver {} has no team, {} points not credited", driver_id, delta);
                return Ok(false);
            }
        };

        match diesel::update(
            team_championships::table
                .filter(team_championships::team_id.eq(team.id))
                .filter(team_championships::championship_id.eq(championship_id)),
        )
        .set(team_championships::points.eq(team_championships::points + delta))
        .execute(conn)
        {
            Ok(0) => {
                warn!(target:"models/team:credit_driver_team", "Team {} is not entered in championship {}", team.name, championship_id);
                Ok(false)
            }
            Ok(_) => Ok(true),
            Err(error) => {
                error!(target:"models/team:credit_driver_team", "Error crediting team {}: {}", team.name, error);
                Err(error)
            }
        }
    }
}
