use std::collections::HashMap;

use diesel::{Connection, OptionalExtension, SqliteConnection};
use log::info;
use serde::Serialize;

use crate::errors::{CustomResult, Error};
use crate::modules::cache::DriverCache;
use crate::modules::models::category::{Category, Championship};
use crate::modules::models::driver::Driver;
use crate::modules::models::driver_category::{DriverCategory, NewDriverCategory};
use crate::modules::models::penalty::{Penalty, PenaltyStatus};
use crate::modules::models::qualifying_result::{NewQualifyingResult, QualifyingResult};
use crate::modules::models::race_result::{NewRaceResult, RaceResult};
use crate::modules::models::round::Round;
use crate::modules::models::session::{Session, SessionKind};
use crate::modules::models::team::TeamChampionship;
use crate::modules::penalties::apply_pending_deferred;
use crate::modules::rating::rate_session;
use crate::modules::result_builder::ResultDraft;
use crate::modules::scoring::SessionScoring;

/// The built results of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResults {
    pub session_id: i32,
    pub results: Vec<ResultDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SavedRound {
    pub qualifying: Vec<QualifyingResult>,
    pub races: Vec<RaceResult>,
    /// points earned per driver over the whole round
    pub points: Vec<(i32, f64)>,
    /// deferred penalties that were applied while saving
    pub applied_penalties: Vec<i32>,
}

/// A standings entry used for ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankEntry {
    pub id: i32,
    pub points: f64,
    pub position: Option<i32>,
}

/// # rank by points
/// most points first. ties keep their previous standings order, drivers who
/// never had a position go after those who did
///
/// ## Returns
/// * `Vec<(i32, i32)>` - the entry id with its new position
pub fn rank_by_points(entries: &[RankEntry]) -> Vec<(i32, i32)> {
    let mut ranked: Vec<&RankEntry> = entries.iter().collect();
    ranked.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then(a.position.unwrap_or(i32::MAX).cmp(&b.position.unwrap_or(i32::MAX)))
            .then(a.id.cmp(&b.id))
    });

    ranked
        .iter()
        .enumerate()
        .map(|(index, entry)| (entry.id, index as i32 + 1))
        .collect()
}

/// # rerank a category
/// sort the drivers of a category by points and write back their positions
pub fn rerank_category(conn: &mut SqliteConnection, category_id: i32) -> CustomResult<()> {
    let memberships = DriverCategory::for_category(conn, category_id)?;
    let entries: Vec<RankEntry> = memberships
        .iter()
        .map(|m| RankEntry {
            id: m.id,
            points: m.points,
            position: m.position,
        })
        .collect();

    for (membership_id, position) in rank_by_points(&entries) {
        if let Some(membership) = memberships.iter().find(|m| m.id == membership_id) {
            if membership.position != Some(position) {
                let mut membership = membership.clone();
                membership.position = Some(position);
                membership.save(conn)?;
            }
        }
    }

    Ok(())
}

/// # add points to a driver
/// add points to the driver's standings entry and to the tally of the driver's team
pub fn credit_driver(
    conn: &mut SqliteConnection,
    category: &Category,
    driver_id: i32,
    delta: f64,
) -> CustomResult<()> {
    let mut membership = DriverCategory::get(conn, driver_id, category.id)?.ok_or(
        Error::InconsistentStandingsError {
            driver_id,
            category_id: category.id,
        },
    )?;

    membership.points += delta;
    membership.save(conn)?;
    TeamChampionship::credit_driver_team(conn, driver_id, category.championship_id, delta)?;
    Ok(())
}

fn session_for_round(conn: &mut SqliteConnection, session_id: i32, round: &Round) -> CustomResult<(Session, SessionKind)> {
    let session = Session::get_by_id(conn, session_id)?;
    if session.round_id != round.id {
        return Err(Error::SessionMismatchError {
            session_id,
            round_id: round.id,
        });
    }

    let kind = session.kind()?;
    Ok((session, kind))
}

/// # save the results of a round
/// the only way results are entered for the first time. every result is stored
/// and scored, the points are added to the drivers and their teams, race
/// sessions are rated, the category is reranked and the round is completed.
/// reserve drivers without a standings entry get one with race number 0. finally
/// deferred penalties of drivers who finished a race are applied.
/// everything runs in one transaction.
///
/// ## Arguments
/// * `conn` - the database connection
/// * `cache` - the driver cache, rated drivers are invalidated
/// * `category_id` - the category the round belongs to
/// * `round_id` - the round being saved
/// * `qualifying` - the qualifying results, if the round had a qualifying
/// * `races` - the results of each race session
///
/// ## Returns
/// * `SavedRound` - the stored results and the points earned
pub fn save_results(
    conn: &mut SqliteConnection,
    cache: &mut dyn DriverCache,
    category_id: i32,
    round_id: i32,
    qualifying: Option<SessionResults>,
    races: Vec<SessionResults>,
) -> CustomResult<SavedRound> {
    conn.transaction::<_, Error, _>(|conn| {
        let mut round = Round::get_by_id(conn, round_id)?;
        if round.category_id != category_id {
            return Err(Error::NotFoundError {
                entity: "round in category",
                id: round_id,
            });
        }
        if round.is_completed {
            return Err(Error::RoundAlreadyCompletedError { round_id });
        }
        let category = Category::get_by_id(conn, category_id)?;

        let mut saved = SavedRound::default();
        let mut earned: Vec<(i32, f64, Option<i32>)> = Vec::new();
        let mut add_points = |driver_id: i32, points: f64, car_class_id: Option<i32>| {
            match earned.iter_mut().find(|(id, _, _)| *id == driver_id) {
                Some(entry) => entry.1 += points,
                None => earned.push((driver_id, points, car_class_id)),
            }
        };

        if let Some(qualifying) = &qualifying {
            let (session, kind) = session_for_round(conn, qualifying.session_id, &round)?;
            if kind.is_race() {
                return Err(Error::InvalidSessionNameError { name: session.name });
            }

            let scoring = SessionScoring::qualifying(session.point_scale(conn)?);
            for draft in &qualifying.results {
                let result = QualifyingResult::new(
                    conn,
                    &NewQualifyingResult {
                        driver_id: draft.driver_id,
                        round_id: round.id,
                        category_id: category.id,
                        session_id: session.id,
                        car_class_id: draft.car_class_id,
                        position: draft.position,
                        laptime: draft.time.millis.filter(|_| draft.participated()),
                        gap_to_first: draft.gap_to_first,
                        participated: draft.participated(),
                        status: draft.status().as_str().to_string(),
                    },
                )?;
                add_points(draft.driver_id, scoring.points_earned(result.position, false), draft.car_class_id);
                saved.qualifying.push(result);
            }
        }

        let mut race_sessions = Vec::with_capacity(races.len());
        for race in &races {
            let (session, kind) = session_for_round(conn, race.session_id, &round)?;
            if !kind.is_race() {
                return Err(Error::InvalidSessionNameError { name: session.name });
            }

            let scoring = SessionScoring::race(session.point_scale(conn)?, &category);
            for draft in &race.results {
                let result = RaceResult::new(
                    conn,
                    &NewRaceResult {
                        driver_id: draft.driver_id,
                        round_id: round.id,
                        category_id: category.id,
                        session_id: session.id,
                        car_class_id: draft.car_class_id,
                        position: draft.position,
                        fastest_lap: draft.fastest_lap && draft.participated(),
                        participated: draft.participated(),
                        status: draft.status().as_str().to_string(),
                        gap_to_first: draft.gap_to_first,
                        total_racetime: draft.time.millis.filter(|_| draft.participated()),
                    },
                )?;
                add_points(
                    draft.driver_id,
                    scoring.points_earned(result.position, result.fastest_lap),
                    draft.car_class_id,
                );
                saved.races.push(result);
            }

            rate_session(conn, cache, session.id)?;
            race_sessions.push((session, kind));
        }

        for (driver_id, points, car_class_id) in &earned {
            match DriverCategory::get(conn, *driver_id, category.id)? {
                Some(mut membership) => {
                    membership.points += points;
                    membership.save(conn)?;
                }
                None => {
                    if Driver::get_by_id(conn, *driver_id).optional()?.is_none() {
                        return Err(Error::InconsistentStandingsError {
                            driver_id: *driver_id,
                            category_id: category.id,
                        });
                    }

                    info!(target:"standings:save_results", "Driver {} covers in category {} as a reserve", driver_id, category.name);
                    let mut reserve = NewDriverCategory::new(*driver_id, category.id, 0, round.date);
                    reserve.car_class_id = *car_class_id;
                    reserve.points = *points;
                    DriverCategory::new(conn, &reserve)?;
                }
            }

            TeamChampionship::credit_driver_team(conn, *driver_id, category.championship_id, *points)?;
        }

        rerank_category(conn, category.id)?;
        round.mark_completed(conn)?;

        race_sessions.sort_by_key(|(_, kind)| kind.order());
        let sessions: Vec<Session> = race_sessions.into_iter().map(|(session, _)| session).collect();
        saved.applied_penalties = apply_pending_deferred(conn, &category, &round, &sessions)?;
        saved.points = earned.iter().map(|(driver_id, points, _)| (*driver_id, *points)).collect();

        info!(target:"standings:save_results", "Saved round {} of {}: {} qualifying and {} race results, {} deferred penalties applied",
            round.number, category.name, saved.qualifying.len(), saved.races.len(), saved.applied_penalties.len());
        Ok(saved)
    })
}

/// # recalculate points
/// rebuild every standings total of a championship from the stored results and
/// the applied penalty points, then rebuild the team totals from the drivers
///
/// ## Arguments
/// * `conn` - the database connection
/// * `championship_id` - the championship to recalculate
pub fn recalculate_points(conn: &mut SqliteConnection, championship_id: i32) -> CustomResult<()> {
    conn.transaction::<_, Error, _>(|conn| {
        let championship = Championship::get_by_id(conn, championship_id)?;
        let mut driver_totals: HashMap<i32, f64> = HashMap::new();

        for category in championship.categories(conn)? {
            let mut scoring: HashMap<i32, SessionScoring> = HashMap::new();
            let mut totals: HashMap<i32, f64> = HashMap::new();

            for result in QualifyingResult::for_category(conn, category.id)? {
                if !scoring.contains_key(&result.session_id) {
                    let session = Session::get_by_id(conn, result.session_id)?;
                    scoring.insert(session.id, SessionScoring::qualifying(session.point_scale(conn)?));
                }
                let points = scoring[&result.session_id].points_earned(result.position, false);
                *totals.entry(result.driver_id).or_insert(0.0) += points;
            }

            for result in RaceResult::for_category(conn, category.id)? {
                if !scoring.contains_key(&result.session_id) {
                    let session = Session::get_by_id(conn, result.session_id)?;
                    scoring.insert(session.id, SessionScoring::race(session.point_scale(conn)?, &category));
                }
                let points = scoring[&result.session_id].points_earned(result.position, result.fastest_lap);
                *totals.entry(result.driver_id).or_insert(0.0) += points;
            }

            for penalty in Penalty::for_category(conn, category.id)? {
                if penalty.status() != PenaltyStatus::Drafted {
                    *totals.entry(penalty.driver_id).or_insert(0.0) -= penalty.points;
                }
            }

            for mut membership in DriverCategory::for_category(conn, category.id)? {
                membership.points = totals.remove(&membership.driver_id).unwrap_or(0.0);
                *driver_totals.entry(membership.driver_id).or_insert(0.0) += membership.points;
                membership.save(conn)?;
            }

            if let Some((driver_id, _)) = totals.into_iter().next() {
                return Err(Error::InconsistentStandingsError {
                    driver_id,
                    category_id: category.id,
                });
            }

            rerank_category(conn, category.id)?;
        }

        for team in TeamChampionship::for_championship(conn, championship.id)? {
            TeamChampionship::set_points(conn, team.id, 0.0)?;
        }
        let mut drivers: Vec<(i32, f64)> = driver_totals.into_iter().collect();
        drivers.sort_by_key(|(driver_id, _)| *driver_id);
        for (driver_id, points) in drivers {
            TeamChampionship::credit_driver_team(conn, driver_id, championship.id, points)?;
        }

        info!(target:"standings:recalculate_points", "Recalculated points of championship {}", championship.name);
        Ok(())
    })
}

/// # get the standings of a category
/// ordered by position, drivers without a position last
pub fn standings(conn: &mut SqliteConnection, category_id: i32) -> CustomResult<Vec<(DriverCategory, Driver)>> {
    let mut memberships = DriverCategory::for_category(conn, category_id)?;
    memberships.sort_by_key(|m| (m.position.unwrap_or(i32::MAX), m.id));

    let driver_ids: Vec<i32> = memberships.iter().map(|m| m.driver_id).collect();
    let drivers = Driver::get_from_ids(conn, &driver_ids)?;

    memberships
        .into_iter()
        .map(|membership| {
            let driver = drivers
                .iter()
                .find(|driver| driver.id == membership.driver_id)
                .cloned()
                .ok_or(Error::NotFoundError {
                    entity: "driver",
                    id: membership.driver_id,
                })?;
            Ok((membership, driver))
        })
        .collect()
}
