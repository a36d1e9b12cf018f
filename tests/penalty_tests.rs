mod common;

use common::{date, league};
use racing_league_results::errors::Error;
use racing_league_results::modules::models::penalty::{DeferredPenalty, Penalty, PenaltyStatus};
use racing_league_results::modules::penalties::{
    apply_penalty, create_penalty, reverse_penalty, PenaltyDraft, PenaltyOutcome,
};
use racing_league_results::modules::standings::recalculate_points;

fn time_penalty(seconds: i32) -> PenaltyDraft {
    PenaltyDraft {
        time_penalty: seconds,
        ..PenaltyDraft::default()
    }
}

#[test]
fn penalties_are_numbered_per_round() {
    let mut league = league();
    let race_1 = league.rounds[0].race_1.clone();
    let race_1_round_2 = league.rounds[1].race_1.clone();
    let (alpha, bravo) = (league.alpha.id, league.bravo.id);

    let first = league.penalize(alpha, 0, &race_1, PenaltyDraft::default());
    let second = league.penalize(bravo, 0, &race_1, PenaltyDraft::default());
    let other_round = league.penalize(bravo, 1, &race_1_round_2, PenaltyDraft::default());

    assert_eq!((first.number, second.number, other_round.number), (1, 2, 1));
    assert_eq!(first.team_id, Some(league.red.id));
    assert_eq!(first.status(), PenaltyStatus::Drafted);
}

#[test]
fn licence_points_warnings_and_points_without_time() {
    let mut league = league();
    league.save_races(0, "Alpha 40:00.000\nBravo 40:01.000\nCharlie 40:02.000", None);
    let race_1 = league.rounds[0].race_1.clone();
    let bravo = league.bravo.id;

    let penalty = league.penalize(
        bravo,
        0,
        &race_1,
        PenaltyDraft {
            licence_points: 2,
            warnings: 1,
            reprimand: true,
            points: 5.0,
            ..PenaltyDraft::default()
        },
    );
    let outcome = apply_penalty(&mut league.conn, penalty.id).unwrap();
    assert_eq!(outcome, PenaltyOutcome::Applied);

    let membership = league.membership(bravo);
    assert_eq!(membership.licence_points, 8);
    assert_eq!(membership.warnings, 1);
    assert_eq!(membership.reprimands, 1);
    assert_eq!(membership.points, 13.0);
    let red = league.red.id;
    assert_eq!(league.team_points(red), 38.0);

    // Charlie (15) now leads Bravo (13)
    let charlie = league.charlie.id;
    assert_eq!(league.membership(charlie).position, Some(2));
    assert_eq!(league.membership(bravo).position, Some(3));

    let again = apply_penalty(&mut league.conn, penalty.id);
    assert!(matches!(again, Err(Error::PenaltyStateError { .. })));
}

#[test]
fn a_penalty_behind_a_non_finisher_keeps_the_order() {
    let mut league = league();
    league.save_races(0, "Alpha 1:23.456\nBravo 1:22.956\nCharlie dnf", None);
    let race_1 = league.rounds[0].race_1.clone();
    let (alpha, bravo, charlie) = (league.alpha.id, league.bravo.id, league.charlie.id);

    let penalty = league.penalize(
        alpha,
        0,
        &race_1,
        PenaltyDraft {
            licence_points: 1,
            ..time_penalty(5)
        },
    );
    let outcome = apply_penalty(&mut league.conn, penalty.id).unwrap();
    assert_eq!(outcome, PenaltyOutcome::AppliedToSession(race_1.id));

    let alpha_result = league.race_result(&race_1, alpha);
    assert_eq!(alpha_result.position, Some(2));
    assert_eq!(alpha_result.total_racetime, Some(88_456));
    assert_eq!(alpha_result.gap_to_first, Some(5_500));
    assert_eq!(league.race_result(&race_1, bravo).position, Some(1));
    assert_eq!(league.race_result(&race_1, charlie).position, None);

    assert_eq!(league.membership(alpha).points, 18.0);
    assert_eq!(league.membership(alpha).licence_points, 9);
    assert_eq!(league.membership(bravo).points, 25.0);
    assert_eq!(Penalty::seconds_for(&mut league.conn, race_1.id, alpha).unwrap(), 5);
}

#[test]
fn a_time_penalty_reorders_the_race_and_moves_the_points() {
    let mut league = league();
    league.save_races(0, "Bravo 40:00.000\nAlpha 40:01.000\nCharlie 40:03.000", None);
    let race_1 = league.rounds[0].race_1.clone();
    let (alpha, bravo, charlie) = (league.alpha.id, league.bravo.id, league.charlie.id);

    let penalty = league.penalize(bravo, 0, &race_1, time_penalty(5));
    apply_penalty(&mut league.conn, penalty.id).unwrap();

    let order: Vec<(Option<i32>, Option<i32>)> = [alpha, charlie, bravo]
        .iter()
        .map(|id| {
            let result = league.race_result(&race_1, *id);
            (result.position, result.gap_to_first)
        })
        .collect();
    assert_eq!(order, vec![(Some(1), Some(0)), (Some(2), Some(2_000)), (Some(3), Some(4_000))]);

    assert_eq!(league.membership(alpha).points, 25.0);
    assert_eq!(league.membership(charlie).points, 18.0);
    assert_eq!(league.membership(bravo).points, 15.0);
    assert_eq!(league.membership(alpha).position, Some(1));
    assert_eq!(league.membership(bravo).position, Some(3));
    let (red, blue) = (league.red.id, league.blue.id);
    assert_eq!(league.team_points(red), 40.0);
    assert_eq!(league.team_points(blue), 18.0);

    let incremental: Vec<f64> = [alpha, bravo, charlie].iter().map(|id| league.membership(*id).points).collect();
    recalculate_points(&mut league.conn, league.championship.id).unwrap();
    let recomputed: Vec<f64> = [alpha, bravo, charlie].iter().map(|id| league.membership(*id).points).collect();
    assert_eq!(incremental, recomputed);
    assert_eq!(league.team_points(red), 40.0);
}

#[test]
fn reversing_a_penalty_restores_the_race() {
    let mut league = league();
    league.save_races(0, "Bravo 40:00.000\nAlpha 40:01.000\nCharlie 40:03.000", None);
    let race_1 = league.rounds[0].race_1.clone();
    let (alpha, bravo) = (league.alpha.id, league.bravo.id);

    let penalty = league.penalize(
        bravo,
        0,
        &race_1,
        PenaltyDraft {
            licence_points: 3,
            points: 2.0,
            ..time_penalty(5)
        },
    );
    apply_penalty(&mut league.conn, penalty.id).unwrap();
    reverse_penalty(&mut league.conn, penalty.id).unwrap();

    let bravo_result = league.race_result(&race_1, bravo);
    assert_eq!(bravo_result.position, Some(1));
    assert_eq!(bravo_result.total_racetime, Some(2_400_000));
    assert_eq!(league.race_result(&race_1, alpha).gap_to_first, Some(1_000));

    let membership = league.membership(bravo);
    assert_eq!((membership.points, membership.licence_points, membership.position), (25.0, 10, Some(1)));
    let red = league.red.id;
    assert_eq!(league.team_points(red), 43.0);
    assert!(Penalty::get_by_id(&mut league.conn, penalty.id).is_err());
}

#[test]
fn qualifying_penalties_need_a_qualifying_result() {
    let mut league = league();
    league.save_races(0, "Alpha 40:00.000\nBravo 40:01.000\nCharlie 40:02.000", None);
    let qualifying = league.rounds[0].qualifying.clone();
    let alpha = league.alpha.id;

    let penalty = league.penalize(
        alpha,
        0,
        &qualifying,
        PenaltyDraft {
            licence_points: 2,
            ..time_penalty(3)
        },
    );
    let error = apply_penalty(&mut league.conn, penalty.id);

    assert!(matches!(error, Err(Error::MissingQualifyingResultError { .. })));
    assert_eq!(league.membership(alpha).licence_points, 10);
    assert_eq!(
        Penalty::get_by_id(&mut league.conn, penalty.id).unwrap().status(),
        PenaltyStatus::Drafted
    );
}

#[test]
fn a_race_1_penalty_falls_back_to_race_2() {
    let mut league = league();
    league.save_races(
        0,
        "Alpha 40:00.000\nBravo 40:01.000\nCharlie dnf",
        Some("Alpha 39:00.000\nCharlie 39:10.000\nBravo 39:20.000"),
    );
    let (race_1, race_2) = (league.rounds[0].race_1.clone(), league.rounds[0].race_2.clone());
    let (bravo, charlie) = (league.bravo.id, league.charlie.id);

    let penalty = league.penalize(charlie, 0, &race_1, time_penalty(15));
    let outcome = apply_penalty(&mut league.conn, penalty.id).unwrap();

    assert_eq!(outcome, PenaltyOutcome::AppliedToSession(race_2.id));
    assert_eq!(league.race_result(&race_2, bravo).position, Some(2));
    assert_eq!(league.race_result(&race_2, charlie).position, Some(3));
    assert_eq!(league.membership(bravo).points, 36.0);
    assert_eq!(league.membership(charlie).points, 15.0);
    assert_eq!(
        Penalty::get_by_id(&mut league.conn, penalty.id).unwrap().applied_session_id,
        Some(race_2.id)
    );
}

#[test]
fn a_deferred_penalty_is_applied_once_at_the_next_finish() {
    let mut league = league();
    league.save_races(
        0,
        "Alpha 40:00.000\nBravo 40:01.000\nCharlie dnf",
        Some("Alpha 39:00.000\nBravo 39:01.000\nCharlie dns"),
    );
    let race_1 = league.rounds[0].race_1.clone();
    let (alpha, bravo, charlie) = (league.alpha.id, league.bravo.id, league.charlie.id);

    let penalty = league.penalize(
        charlie,
        0,
        &race_1,
        PenaltyDraft {
            licence_points: 1,
            ..time_penalty(10)
        },
    );
    let outcome = apply_penalty(&mut league.conn, penalty.id).unwrap();
    assert_eq!(outcome, PenaltyOutcome::Deferred);
    assert_eq!(league.membership(charlie).licence_points, 9);
    assert_eq!(league.membership(charlie).points, 0.0);
    assert_eq!(DeferredPenalty::pending_for_driver(&mut league.conn, charlie).unwrap().len(), 1);

    let saved = league.save_races(
        1,
        "Charlie 40:00.000\nAlpha 40:05.000\nBravo 40:20.000",
        Some("Alpha 39:00.000\nBravo 39:05.000\nCharlie 39:06.000"),
    );
    assert_eq!(saved.applied_penalties, vec![penalty.id]);

    let round_2_race_1 = league.rounds[1].race_1.clone();
    let charlie_result = league.race_result(&round_2_race_1, charlie);
    assert_eq!(charlie_result.total_racetime, Some(2_410_000));
    assert_eq!(charlie_result.position, Some(2));
    assert_eq!(league.race_result(&round_2_race_1, alpha).position, Some(1));
    assert_eq!(league.race_result(&round_2_race_1, bravo).position, Some(3));

    assert_eq!(league.membership(charlie).points, 33.0);
    assert_eq!(league.membership(alpha).points, 100.0);
    assert!(DeferredPenalty::pending_for_driver(&mut league.conn, charlie).unwrap().is_empty());

    let penalty = Penalty::get_by_id(&mut league.conn, penalty.id).unwrap();
    assert_eq!(penalty.status(), PenaltyStatus::Applied);
    assert_eq!(penalty.applied_session_id, Some(round_2_race_1.id));
    assert_eq!(Penalty::seconds_for(&mut league.conn, round_2_race_1.id, charlie).unwrap(), 10);
}

#[test]
fn time_is_given_up_after_the_last_round() {
    let mut league = league();
    league.save_races(0, "Alpha 40:00.000\nBravo 40:01.000\nCharlie 40:02.000", None);
    league.save_races(1, "Alpha 40:00.000\nBravo 40:01.000\nCharlie dnf", Some("Alpha 39:00.000\nBravo 39:01.000\nCharlie dns"));
    let race_1 = league.rounds[1].race_1.clone();
    let charlie = league.charlie.id;
    let points_before = league.membership(charlie).points;

    let penalty = league.penalize(charlie, 1, &race_1, time_penalty(5));
    let outcome = apply_penalty(&mut league.conn, penalty.id).unwrap();

    assert_eq!(outcome, PenaltyOutcome::GivenUp);
    let penalty = Penalty::get_by_id(&mut league.conn, penalty.id).unwrap();
    assert_eq!((penalty.status(), penalty.applied_session_id), (PenaltyStatus::Applied, None));
    assert!(DeferredPenalty::pending_for_driver(&mut league.conn, charlie).unwrap().is_empty());
    assert_eq!(league.membership(charlie).points, points_before);
}

#[test]
fn a_penalty_in_the_last_round_waits_until_it_is_raced() {
    let mut league = league();
    league.save_races(0, "Alpha 40:00.000\nBravo 40:01.000\nCharlie 40:02.000", None);
    let race_1 = league.rounds[1].race_1.clone();
    let (alpha, bravo, charlie) = (league.alpha.id, league.bravo.id, league.charlie.id);

    let penalty = league.penalize(charlie, 1, &race_1, time_penalty(5));
    let outcome = apply_penalty(&mut league.conn, penalty.id).unwrap();
    assert_eq!(outcome, PenaltyOutcome::Deferred);
    assert_eq!(DeferredPenalty::pending_for_driver(&mut league.conn, charlie).unwrap().len(), 1);

    let saved = league.save_races(1, "Charlie 40:00.000\nAlpha 40:01.000\nBravo 40:10.000", None);
    assert_eq!(saved.applied_penalties, vec![penalty.id]);

    let charlie_result = league.race_result(&race_1, charlie);
    assert_eq!(charlie_result.total_racetime, Some(2_405_000));
    assert_eq!(charlie_result.position, Some(2));
    assert_eq!(league.race_result(&race_1, alpha).position, Some(1));
    assert_eq!(league.race_result(&race_1, bravo).position, Some(3));

    let penalty = Penalty::get_by_id(&mut league.conn, penalty.id).unwrap();
    assert_eq!((penalty.status(), penalty.applied_session_id), (PenaltyStatus::Applied, Some(race_1.id)));
}

#[test]
fn a_deferred_penalty_is_given_up_after_the_last_round() {
    let mut league = league();
    league.save_races(
        0,
        "Alpha 40:00.000\nBravo 40:01.000\nCharlie dnf",
        Some("Alpha 39:00.000\nBravo 39:01.000\nCharlie dns"),
    );
    let race_1 = league.rounds[0].race_1.clone();
    let charlie = league.charlie.id;

    let penalty = league.penalize(charlie, 0, &race_1, time_penalty(10));
    assert_eq!(apply_penalty(&mut league.conn, penalty.id).unwrap(), PenaltyOutcome::Deferred);

    let saved = league.save_races(
        1,
        "Alpha 40:00.000\nBravo 40:01.000\nCharlie dnf",
        Some("Alpha 39:00.000\nBravo 39:01.000\nCharlie dns"),
    );
    assert!(saved.applied_penalties.is_empty());

    let penalty = Penalty::get_by_id(&mut league.conn, penalty.id).unwrap();
    assert_eq!((penalty.status(), penalty.applied_session_id), (PenaltyStatus::Applied, None));
    assert!(DeferredPenalty::pending_for_driver(&mut league.conn, charlie).unwrap().is_empty());
    assert_eq!(league.membership(charlie).points, 0.0);
}

#[test]
fn time_penalties_that_overflow_a_race_time_are_rejected() {
    let mut league = league();
    league.save_races(0, "Alpha 40:00.000\nBravo 40:01.000\nCharlie 40:02.000", None);
    let race_1 = league.rounds[0].race_1.clone();
    let alpha = league.alpha.id;

    let draft = PenaltyDraft {
        driver_id: alpha,
        category_id: league.category.id,
        round_id: league.rounds[0].round.id,
        session_id: race_1.id,
        ..time_penalty(i32::MAX)
    };
    let error = create_penalty(&mut league.conn, &draft, date(4, 1));
    assert!(matches!(error, Err(Error::TimeOverflowError { .. })));

    let penalty = league.penalize(
        alpha,
        0,
        &race_1,
        PenaltyDraft {
            licence_points: 1,
            ..time_penalty(2_147_000)
        },
    );
    let error = apply_penalty(&mut league.conn, penalty.id);
    assert!(matches!(error, Err(Error::TimeOverflowError { .. })));

    assert_eq!(league.race_result(&race_1, alpha).total_racetime, Some(2_400_000));
    assert_eq!(league.membership(alpha).licence_points, 10);
    assert_eq!(
        Penalty::get_by_id(&mut league.conn, penalty.id).unwrap().status(),
        PenaltyStatus::Drafted
    );
}
