use std::fmt;
use std::str::FromStr;

use diesel::prelude::*;
use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::errors::{CustomResult, Error, InvalidPointSystemSnafu};
use crate::modules::scoring::PointScale;
use crate::schema::{point_systems, sessions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    Qualifying,
    Race1,
    Race,
    Race2,
}

impl SessionKind {
    pub fn is_race(&self) -> bool {
        !matches!(self, SessionKind::Qualifying)
    }

    /// the order sessions are run in within a round
    pub fn order(&self) -> u8 {
        match self {
            SessionKind::Qualifying => 0,
            SessionKind::Race1 => 1,
            SessionKind::Race => 2,
            SessionKind::Race2 => 3,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionKind::Qualifying => "Qualifica",
            SessionKind::Race1 => "Gara 1",
            SessionKind::Race => "Gara",
            SessionKind::Race2 => "Gara 2",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SessionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(' ', "");
        match normalized.as_str() {
            "qualifica" | "qualifying" | "quali" => Ok(SessionKind::Qualifying),
            "gara1" | "race1" => Ok(SessionKind::Race1),
            "gara" | "race" => Ok(SessionKind::Race),
            "gara2" | "race2" => Ok(SessionKind::Race2),
            _ => Err(Error::InvalidSessionNameError { name: s.to_string() }),
        }
    }
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub round_id: i32,
    pub name: String,
    pub point_system_id: i32,
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = sessions)]
pub struct Session {
    pub id: i32,
    pub round_id: i32,
    pub name: String,
    pub point_system_id: i32,
}

impl Session {
    pub fn new(conn: &mut SqliteConnection, new_session: &NewSession) -> QueryResult<Session> {
        diesel::insert_into(sessions::table)
            .values(new_session)
            .get_result::<Session>(conn)
    }

    pub fn get_by_id(conn: &mut SqliteConnection, session_id: i32) -> QueryResult<Session> {
        sessions::table
            .filter(sessions::id.eq(session_id))
            .first::<Session>(conn)
    }

    pub fn for_round(conn: &mut SqliteConnection, round_id: i32) -> QueryResult<Vec<Session>> {
        sessions::table
            .filter(sessions::round_id.eq(round_id))
            .order(sessions::id.asc())
            .load::<Session>(conn)
    }

    pub fn kind(&self) -> CustomResult<SessionKind> {
        self.name.parse::<SessionKind>()
    }

    pub fn point_scale(&self, conn: &mut SqliteConnection) -> CustomResult<PointScale> {
        PointSystem::get_by_id(conn, self.point_system_id)?.scale()
    }
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = point_systems)]
pub struct PointSystem {
    pub id: i32,
    pub points: String,
}

impl PointSystem {
    /// # create a point system
    /// the points are stored as a json array
    pub fn new(conn: &mut SqliteConnection, points: &[f64]) -> CustomResult<PointSystem> {
        let encoded = serde_json::to_string(points).context(InvalidPointSystemSnafu { point_system_id: 0 })?;
        Ok(diesel::insert_into(point_systems::table)
            .values(point_systems::points.eq(encoded))
            .get_result::<PointSystem>(conn)?)
    }

    pub fn get_by_id(conn: &mut SqliteConnection, point_system_id: i32) -> QueryResult<PointSystem> {
        point_systems::table
            .filter(point_systems::id.eq(point_system_id))
            .first::<PointSystem>(conn)
    }

    pub fn scale(&self) -> CustomResult<PointScale> {
        PointScale::from_json(&self.points).context(InvalidPointSystemSnafu {
            point_system_id: self.id,
        })
    }
}
