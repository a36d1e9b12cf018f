use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};

use crate::modules::models::session::{Session, SessionKind};
use crate::schema::rounds;

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = rounds)]
pub struct NewRound {
    pub category_id: i32,
    pub number: i32,
    pub date: NaiveDate,
    pub is_completed: bool,
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = rounds)]
pub struct Round {
    pub id: i32,
    pub category_id: i32,
    pub number: i32,
    pub date: NaiveDate,
    pub is_completed: bool,
}

impl Round {
    pub fn new(conn: &mut SqliteConnection, new_round: &NewRound) -> QueryResult<Round> {
        diesel::insert_into(rounds::table)
            .values(new_round)
            .get_result::<Round>(conn)
    }

    pub fn get_by_id(conn: &mut SqliteConnection, round_id: i32) -> QueryResult<Round> {
        rounds::table.filter(rounds::id.eq(round_id)).first::<Round>(conn)
    }

    /// # get the rounds of a category
    /// ordered by date, then by number
    pub fn for_category(conn: &mut SqliteConnection, category_id: i32) -> QueryResult<Vec<Round>> {
        rounds::table
            .filter(rounds::category_id.eq(category_id))
            .order((rounds::date.asc(), rounds::number.asc()))
            .load::<Round>(conn)
    }

    /// # get the completed rounds of several categories
    /// ordered by date, used to replay history in the order it happened
    pub fn completed_for_categories(conn: &mut SqliteConnection, category_ids: &[i32]) -> QueryResult<Vec<Round>> {
        rounds::table
            .filter(rounds::category_id.eq_any(category_ids))
            .filter(rounds::is_completed.eq(true))
            .order((rounds::date.asc(), rounds::number.asc(), rounds::id.asc()))
            .load::<Round>(conn)
    }

    /// # get the sessions of the round
    /// ordered qualifying, race 1, race, race 2
    pub fn sessions(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<Session>> {
        let mut sessions = Session::for_round(conn, self.id)?;
        sessions.sort_by_key(|session| {
            session
                .kind()
                .map(|kind| kind.order())
                .unwrap_or(u8::MAX)
        });
        Ok(sessions)
    }

    /// # get the race sessions of the round
    /// in the order they are raced
    pub fn race_sessions(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<Session>> {
        Ok(self
            .sessions(conn)?
            .into_iter()
            .filter(|session| matches!(session.kind(), Ok(kind) if kind.is_race()))
            .collect())
    }

    /// # get the session of the given kind
    pub fn session_of_kind(&self, conn: &mut SqliteConnection, kind: SessionKind) -> QueryResult<Option<Session>> {
        Ok(self
            .sessions(conn)?
            .into_iter()
            .find(|session| matches!(session.kind(), Ok(k) if k == kind)))
    }

    pub fn mark_completed(&mut self, conn: &mut SqliteConnection) -> QueryResult<()> {
        diesel::update(rounds::table.filter(rounds::id.eq(self.id)))
            .set(rounds::is_completed.eq(true))
            .execute(conn)?;
        self.is_completed = true;
        Ok(())
    }
}
