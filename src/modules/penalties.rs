use chrono::NaiveDate;
use diesel::{Connection, SqliteConnection};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};
use crate::modules::models::category::Category;
use crate::modules::models::driver_category::DriverCategory;
use crate::modules::models::penalty::{DeferredPenalty, NewPenalty, Penalty, PenaltyStatus};
use crate::modules::models::qualifying_result::QualifyingResult;
use crate::modules::models::race_result::RaceResult;
use crate::modules::models::round::Round;
use crate::modules::models::session::{Session, SessionKind};
use crate::modules::models::team::{Team, TeamChampionship};
use crate::modules::scoring::SessionScoring;
use crate::modules::standings::{credit_driver, rerank_category};

/// A stewards' decision before it is numbered and stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PenaltyDraft {
    pub driver_id: i32,
    pub category_id: i32,
    pub round_id: i32,
    pub session_id: i32,
    /// seconds added to the driver's race time
    pub time_penalty: i32,
    pub licence_points: i32,
    pub warnings: i32,
    pub reprimand: bool,
    pub points: f64,
    pub fact: Option<String>,
    pub decision: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PenaltyOutcome {
    /// no time penalty, only the driver's record changed
    Applied,
    /// the time penalty was added to the given session
    AppliedToSession(i32),
    /// the driver has no finished race to add the time to yet
    Deferred,
    /// the driver did not finish and there is no later round to carry the time to
    GivenUp,
}

/// A driver whose points changed when a session was reordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointChange {
    pub driver_id: i32,
    pub before: f64,
    pub after: f64,
}

/// # create a penalty
/// number the draft within its round and record the driver's current team
///
/// ## Arguments
/// * `conn` - the database connection
/// * `draft` - the decision
/// * `date` - the day of the decision
///
/// ## Returns
/// * `Penalty` - the stored penalty, still drafted
pub fn create_penalty(conn: &mut SqliteConnection, draft: &PenaltyDraft, date: NaiveDate) -> CustomResult<Penalty> {
    if draft.time_penalty.checked_mul(1000).is_none() {
        return Err(Error::TimeOverflowError {
            driver_id: draft.driver_id,
        });
    }

    conn.transaction::<_, Error, _>(|conn| {
        let session = Session::get_by_id(conn, draft.session_id)?;
        if session.round_id != draft.round_id {
            return Err(Error::SessionMismatchError {
                session_id: draft.session_id,
                round_id: draft.round_id,
            });
        }

        let team = Team::current_for_driver(conn, draft.driver_id)?;
        let new_penalty = NewPenalty {
            number: Penalty::next_number(conn, draft.round_id)?,
            driver_id: draft.driver_id,
            team_id: team.map(|team| team.id),
            category_id: draft.category_id,
            round_id: draft.round_id,
            session_id: draft.session_id,
            time_penalty: draft.time_penalty,
            licence_points: draft.licence_points,
            warnings: draft.warnings,
            reprimand: draft.reprimand,
            points: draft.points,
            status: PenaltyStatus::Drafted.as_str().to_string(),
            fact: draft.fact.clone(),
            decision: draft.decision.clone(),
            reason: draft.reason.clone(),
            date,
        };

        Ok(Penalty::new(conn, &new_penalty)?)
    })
}

/// # reorder a session
/// rank the finishers of each car class by total time. ties keep the order
/// they came in, results without a time lose their position and gap.
pub fn reorder_results(results: &mut [RaceResult]) {
    let mut classes: Vec<Option<i32>> = Vec::new();
    for result in results.iter() {
        if !classes.contains(&result.car_class_id) {
            classes.push(result.car_class_id);
        }
    }

    for class in classes {
        let mut finishers: Vec<(usize, i32)> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.car_class_id == class && r.participated)
            .filter_map(|(index, r)| r.total_racetime.map(|time| (index, time)))
            .collect();
        finishers.sort_by_key(|(_, time)| *time);

        let leader_time = finishers.first().map(|(_, time)| *time);
        for (position, (index, time)) in finishers.iter().enumerate() {
            results[*index].position = Some(position as i32 + 1);
            results[*index].gap_to_first = leader_time.map(|leader| time - leader);
        }
    }

    for result in results.iter_mut() {
        if !result.participated || result.total_racetime.is_none() {
            result.position = None;
            result.gap_to_first = None;
        }
    }
}

/// # add time to a race result
/// add (or with a negative delta, remove) time to a driver's race, reorder the
/// session and move the difference in points to the drivers and their teams
///
/// ## Arguments
/// * `conn` - the database connection
/// * `category` - the category of the session
/// * `session` - the race session
/// * `driver_id` - the driver whose time changes
/// * `delta_ms` - the milliseconds to add
///
/// ## Returns
/// * `Vec<PointChange>` - the drivers whose points changed
pub fn retime_race_session(
    conn: &mut SqliteConnection,
    category: &Category,
    session: &Session,
    driver_id: i32,
    delta_ms: i32,
) -> CustomResult<Vec<PointChange>> {
    let scoring = SessionScoring::race(session.point_scale(conn)?, category);
    let mut results = RaceResult::for_session(conn, session.id)?;
    let before: Vec<f64> = results
        .iter()
        .map(|r| scoring.points_earned(r.position, r.fastest_lap))
        .collect();

    let target = results
        .iter_mut()
        .find(|r| r.driver_id == driver_id)
        .ok_or(Error::NotFoundError {
            entity: "race result of driver",
            id: driver_id,
        })?;
    if let Some(time) = target.total_racetime {
        let retimed = time
            .checked_add(delta_ms)
            .ok_or(Error::TimeOverflowError { driver_id })?;
        target.total_racetime = Some(retimed);
    }

    reorder_results(&mut results);

    RaceResult::clear_positions(conn, session.id)?;
    let mut changes = Vec::new();
    for (result, points_before) in results.iter().zip(before) {
        result.save_timing(conn)?;

        let points_after = scoring.points_earned(result.position, result.fastest_lap);
        if points_after != points_before {
            changes.push(PointChange {
                driver_id: result.driver_id,
                before: points_before,
                after: points_after,
            });
        }
    }

    for change in &changes {
        credit_driver(conn, category, change.driver_id, change.after - change.before)?;
    }
    if !changes.is_empty() {
        rerank_category(conn, category.id)?;
    }

    Ok(changes)
}

fn finished_race(conn: &mut SqliteConnection, session: &Session, driver_id: i32) -> CustomResult<bool> {
    Ok(RaceResult::get_for_driver(conn, session.id, driver_id)?
        .map_or(false, |result| result.participated && result.total_racetime.is_some()))
}

fn membership_of(conn: &mut SqliteConnection, penalty: &Penalty) -> CustomResult<DriverCategory> {
    DriverCategory::get(conn, penalty.driver_id, penalty.category_id)?.ok_or(Error::InconsistentStandingsError {
        driver_id: penalty.driver_id,
        category_id: penalty.category_id,
    })
}

/// # apply a penalty
/// licence points, warnings, reprimands and points are applied to the driver
/// straight away. the time penalty goes to the penalised session when the driver
/// finished it. a driver who did not finish race 1 gets it on race 2 of the same
/// round, otherwise it is deferred to the driver's next finished race. it is only
/// given up when the round is the last of the category and was already run.
///
/// ## Arguments
/// * `conn` - the database connection
/// * `penalty_id` - the drafted penalty to apply
///
/// ## Returns
/// * `PenaltyOutcome` - where the time penalty ended up
pub fn apply_penalty(conn: &mut SqliteConnection, penalty_id: i32) -> CustomResult<PenaltyOutcome> {
    conn.transaction::<_, Error, _>(|conn| {
        let mut penalty = Penalty::get_by_id(conn, penalty_id)?;
        if penalty.status() != PenaltyStatus::Drafted {
            return Err(Error::PenaltyStateError {
                penalty_id,
                status: penalty.status.clone(),
            });
        }

        let category = Category::get_by_id(conn, penalty.category_id)?;
        let round = Round::get_by_id(conn, penalty.round_id)?;
        let session = Session::get_by_id(conn, penalty.session_id)?;

        let mut membership = membership_of(conn, &penalty)?;
        membership.licence_points -= penalty.licence_points;
        membership.warnings += penalty.warnings;
        membership.reprimands += i32::from(penalty.reprimand);
        membership.points -= penalty.points;
        membership.save(conn)?;

        if penalty.points != 0.0 {
            TeamChampionship::credit_driver_team(conn, penalty.driver_id, category.championship_id, -penalty.points)?;
            rerank_category(conn, category.id)?;
        }

        if penalty.time_penalty == 0 {
            penalty.set_status(conn, PenaltyStatus::Applied, None)?;
            info!(target:"penalties:apply_penalty", "Applied penalty {} to driver {}", penalty.number, penalty.driver_id);
            return Ok(PenaltyOutcome::Applied);
        }

        let kind = session.kind()?;
        if kind == SessionKind::Qualifying {
            if QualifyingResult::get_for_driver(conn, session.id, penalty.driver_id)?.is_none() {
                return Err(Error::MissingQualifyingResultError {
                    driver_id: penalty.driver_id,
                    session_id: session.id,
                });
            }
            penalty.set_status(conn, PenaltyStatus::Applied, Some(session.id))?;
            return Ok(PenaltyOutcome::AppliedToSession(session.id));
        }

        let mut target = None;
        if finished_race(conn, &session, penalty.driver_id)? {
            target = Some(session.clone());
        } else if kind == SessionKind::Race1 {
            if let Some(race_2) = round.session_of_kind(conn, SessionKind::Race2)? {
                if finished_race(conn, &race_2, penalty.driver_id)? {
                    target = Some(race_2);
                }
            }
        }

        if let Some(target) = target {
            retime_race_session(conn, &category, &target, penalty.driver_id, penalty.time_penalty_ms()?)?;
            penalty.set_status(conn, PenaltyStatus::Applied, Some(target.id))?;
            info!(target:"penalties:apply_penalty", "Applied penalty {} to driver {} in {}", penalty.number, penalty.driver_id, target.name);
            return Ok(PenaltyOutcome::AppliedToSession(target.id));
        }

        if round.is_completed && category.is_last_round(conn, &round)? {
            warn!(target:"penalties:apply_penalty", "Driver {} did not finish the last round, {}s of penalty {} are not applied", penalty.driver_id, penalty.time_penalty, penalty.number);
            penalty.set_status(conn, PenaltyStatus::Applied, None)?;
            return Ok(PenaltyOutcome::GivenUp);
        }

        DeferredPenalty::new(conn, penalty.id, penalty.driver_id)?;
        penalty.set_status(conn, PenaltyStatus::Deferred, None)?;
        info!(target:"penalties:apply_penalty", "Deferred penalty {} of driver {}", penalty.number, penalty.driver_id);
        Ok(PenaltyOutcome::Deferred)
    })
}

/// # apply deferred penalties
/// called once the races of a round are stored. each pending penalty of the
/// category from this round or an earlier one is added to the first race of the
/// round its driver finished. after the last round of the category the penalties
/// still pending are given up.
///
/// ## Arguments
/// * `conn` - the database connection
/// * `category` - the category of the round
/// * `round` - the round that was just saved
/// * `race_sessions` - the race sessions of the round, in the order they were run
///
/// ## Returns
/// * `Vec<i32>` - the ids of the penalties applied
pub fn apply_pending_deferred(
    conn: &mut SqliteConnection,
    category: &Category,
    round: &Round,
    race_sessions: &[Session],
) -> CustomResult<Vec<i32>> {
    let mut applied = Vec::new();

    for session in race_sessions {
        let finishers: Vec<i32> = RaceResult::for_session(conn, session.id)?
            .iter()
            .filter(|result| result.participated && result.total_racetime.is_some())
            .map(|result| result.driver_id)
            .collect();

        for driver_id in finishers {
            for mut deferred in DeferredPenalty::pending_for_driver(conn, driver_id)? {
                let mut penalty = Penalty::get_by_id(conn, deferred.penalty_id)?;
                if penalty.category_id != category.id {
                    continue;
                }
                let penalty_round = Round::get_by_id(conn, penalty.round_id)?;
                if (penalty_round.date, penalty_round.number) > (round.date, round.number) {
                    continue;
                }

                retime_race_session(conn, category, session, driver_id, penalty.time_penalty_ms()?)?;
                penalty.set_status(conn, PenaltyStatus::Applied, Some(session.id))?;
                deferred.mark_applied(conn)?;
                info!(target:"penalties:apply_pending_deferred", "Applied deferred penalty {} to driver {} in {}", penalty.number, driver_id, session.name);
                applied.push(penalty.id);
            }
        }
    }

    if category.is_last_round(conn, round)? {
        for mut deferred in DeferredPenalty::pending(conn)? {
            let mut penalty = Penalty::get_by_id(conn, deferred.penalty_id)?;
            if penalty.category_id != category.id {
                continue;
            }
            let penalty_round = Round::get_by_id(conn, penalty.round_id)?;
            if (penalty_round.date, penalty_round.number) > (round.date, round.number) {
                continue;
            }

            warn!(target:"penalties:apply_pending_deferred", "Driver {} did not finish a race before the end of {}, {}s of penalty {} are not applied",
                penalty.driver_id, category.name, penalty.time_penalty, penalty.number);
            penalty.set_status(conn, PenaltyStatus::Applied, None)?;
            deferred.mark_applied(conn)?;
        }
    }

    Ok(applied)
}

/// # reverse a penalty
/// give back everything the penalty took, remove its time from the session it
/// was added to and delete it
///
/// ## Arguments
/// * `conn` - the database connection
/// * `penalty_id` - the penalty to reverse
pub fn reverse_penalty(conn: &mut SqliteConnection, penalty_id: i32) -> CustomResult<()> {
    conn.transaction::<_, Error, _>(|conn| {
        let penalty = Penalty::get_by_id(conn, penalty_id)?;

        if penalty.status() != PenaltyStatus::Drafted {
            let category = Category::get_by_id(conn, penalty.category_id)?;

            let mut membership = membership_of(conn, &penalty)?;
            membership.licence_points += penalty.licence_points;
            membership.warnings -= penalty.warnings;
            membership.reprimands -= i32::from(penalty.reprimand);
            membership.points += penalty.points;
            membership.save(conn)?;

            if penalty.points != 0.0 {
                TeamChampionship::credit_driver_team(conn, penalty.driver_id, category.championship_id, penalty.points)?;
                rerank_category(conn, category.id)?;
            }

            if let (PenaltyStatus::Applied, Some(session_id)) = (penalty.status(), penalty.applied_session_id) {
                let session = Session::get_by_id(conn, session_id)?;
                if penalty.time_penalty != 0 && session.kind()?.is_race() {
                    retime_race_session(conn, &category, &session, penalty.driver_id, -penalty.time_penalty_ms()?)?;
                }
            }
        }

        DeferredPenalty::delete_for_penalty(conn, penalty.id)?;
        penalty.delete(conn)?;
        info!(target:"penalties:reverse_penalty", "Reversed penalty {} of driver {}", penalty.number, penalty.driver_id);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: i32, class: i32, time: Option<i32>) -> RaceResult {
        RaceResult {
            id,
            driver_id: id,
            round_id: 1,
            category_id: 1,
            session_id: 1,
            car_class_id: Some(class),
            position: None,
            fastest_lap: false,
            participated: time.is_some(),
            status: if time.is_some() { "finished" } else { "dnf" }.to_string(),
            gap_to_first: None,
            total_racetime: time,
            mu: None,
            sigma: None,
        }
    }

    #[test]
    fn reorder_ranks_each_class() {
        let mut results = vec![
            result(1, 1, Some(1_000)),
            result(2, 2, Some(900)),
            result(3, 1, Some(800)),
            result(4, 1, None),
            result(5, 2, Some(950)),
        ];
        reorder_results(&mut results);

        let summary: Vec<(i32, Option<i32>, Option<i32>)> =
            results.iter().map(|r| (r.id, r.position, r.gap_to_first)).collect();
        assert_eq!(
            summary,
            vec![
                (1, Some(2), Some(200)),
                (2, Some(1), Some(0)),
                (3, Some(1), Some(0)),
                (4, None, None),
                (5, Some(2), Some(50)),
            ]
        );
    }

    #[test]
    fn reorder_keeps_tied_drivers_in_place() {
        let mut results = vec![result(1, 1, Some(500)), result(2, 1, Some(500))];
        reorder_results(&mut results);
        assert_eq!(results[0].position, Some(1));
        assert_eq!(results[1].position, Some(2));
    }
}
