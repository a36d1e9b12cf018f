#![allow(dead_code)]
use std::time::Duration;

use chrono::NaiveDate;
use diesel::SqliteConnection;

use racing_league_results::modules::cache::MemoryCache;
use racing_league_results::modules::models::category::{
    CarClass, Category, Championship, NewCarClass, NewCategory, NewChampionship,
};
use racing_league_results::modules::models::driver::{Driver, NewDriver};
use racing_league_results::modules::models::driver_category::{DriverCategory, NewDriverCategory};
use racing_league_results::modules::models::general::{establish_connection, run_migrations};
use racing_league_results::modules::models::penalty::Penalty;
use racing_league_results::modules::models::race_result::RaceResult;
use racing_league_results::modules::models::round::{NewRound, Round};
use racing_league_results::modules::models::session::{NewSession, PointSystem, Session};
use racing_league_results::modules::models::team::{DriverContract, NewDriverContract, Team, TeamChampionship};
use racing_league_results::modules::penalties::{create_penalty, PenaltyDraft};
use racing_league_results::modules::result_builder::ResultBuilder;
use racing_league_results::modules::standings::{save_results, SavedRound, SessionResults};

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).expect("valid date")
}

pub struct RoundSessions {
    pub round: Round,
    pub qualifying: Session,
    pub race_1: Session,
    pub race_2: Session,
}

/// A championship with one category racing two rounds. Alpha and Bravo drive
/// for Red, Charlie and Delta for Blue.
pub struct League {
    pub conn: SqliteConnection,
    pub cache: MemoryCache,
    pub championship: Championship,
    pub category: Category,
    /// empty unless the category has car classes
    pub classes: Vec<CarClass>,
    pub rounds: Vec<RoundSessions>,
    pub alpha: Driver,
    pub bravo: Driver,
    pub charlie: Driver,
    pub delta: Driver,
    pub red: Team,
    pub blue: Team,
}

/// Alpha, Bravo and Charlie race in a single class without fastest lap points.
/// Delta is not entered in the category.
pub fn league() -> League {
    build_league(false)
}

/// Alpha and Charlie race in Pro, Bravo and Delta in Am. The fastest lap is
/// worth 2 points to a class winner and 1 point to anyone behind.
pub fn multi_class_league() -> League {
    build_league(true)
}

fn build_league(multi_class: bool) -> League {
    let mut conn = establish_connection(":memory:").expect("in memory database");
    run_migrations(&mut conn).expect("schema");
    let conn_ref = &mut conn;

    let championship = Championship::new(
        conn_ref,
        &NewChampionship {
            name: "Season 1".to_string(),
            start_date: date(3, 1),
            end_date: None,
        },
    )
    .unwrap();
    let category = Category::new(
        conn_ref,
        &NewCategory {
            championship_id: championship.id,
            name: "GT3".to_string(),
            split_point: if multi_class { Some(1) } else { None },
            fastest_lap_points: if multi_class { Some(2.0) } else { None },
            fastest_lap_points_after_split: if multi_class { Some(1.0) } else { None },
        },
    )
    .unwrap();

    let mut classes = Vec::new();
    if multi_class {
        for (display_order, name) in [(1, "Pro"), (2, "Am")] {
            let class = CarClass::new(
                conn_ref,
                &NewCarClass {
                    category_id: category.id,
                    name: name.to_string(),
                    display_order,
                },
            )
            .unwrap();
            classes.push(class);
        }
    }
    let (pro, am) = (classes.first().map(|c| c.id), classes.get(1).map(|c| c.id));

    let race_points = PointSystem::new(conn_ref, &[25.0, 18.0, 15.0]).unwrap();
    let qualifying_points = PointSystem::new(conn_ref, &[1.0]).unwrap();

    let mut rounds = Vec::new();
    for (number, day) in [(1, 1), (2, 15)] {
        let round = Round::new(
            conn_ref,
            &NewRound {
                category_id: category.id,
                number,
                date: date(3, day),
                is_completed: false,
            },
        )
        .unwrap();

        let mut session = |name: &str, point_system_id: i32| {
            Session::new(
                conn_ref,
                &NewSession {
                    round_id: round.id,
                    name: name.to_string(),
                    point_system_id,
                },
            )
            .unwrap()
        };
        let qualifying = session("Qualifica", qualifying_points.id);
        let race_1 = session("Gara 1", race_points.id);
        let race_2 = session("Gara 2", race_points.id);

        rounds.push(RoundSessions {
            round,
            qualifying,
            race_1,
            race_2,
        });
    }

    let red = Team::new(conn_ref, "Red").unwrap();
    let blue = Team::new(conn_ref, "Blue").unwrap();
    TeamChampionship::new(conn_ref, red.id, championship.id).unwrap();
    TeamChampionship::new(conn_ref, blue.id, championship.id).unwrap();

    let mut driver = |psn_id: &str, team: &Team, race_number: Option<i32>, car_class_id: Option<i32>| {
        let driver = Driver::new(conn_ref, &NewDriver::with_psn_id(psn_id)).unwrap();
        DriverContract::new(
            conn_ref,
            &NewDriverContract {
                driver_id: driver.id,
                team_id: team.id,
                start_date: date(1, 1),
                end_date: None,
            },
        )
        .unwrap();
        if let Some(race_number) = race_number {
            let mut membership = NewDriverCategory::new(driver.id, category.id, race_number, date(1, 1));
            membership.car_class_id = car_class_id;
            DriverCategory::new(conn_ref, &membership).unwrap();
        }
        driver
    };
    let alpha = driver("Alpha", &red, Some(7), pro);
    let bravo = driver("Bravo", &red, Some(11), am);
    let charlie = driver("Charlie", &blue, Some(23), pro);
    let delta = driver("Delta", &blue, if multi_class { Some(31) } else { None }, am);

    League {
        conn,
        cache: MemoryCache::new(Duration::from_secs(30), 50),
        championship,
        category,
        classes,
        rounds,
        alpha,
        bravo,
        charlie,
        delta,
        red,
        blue,
    }
}

impl League {
    /// build the results of a session from a result text, every name must match
    pub fn results(&mut self, session: &Session, text: &str) -> SessionResults {
        let roster = self.category.roster(&mut self.conn).unwrap();
        let class_order = self
            .category
            .car_classes(&mut self.conn)
            .unwrap()
            .iter()
            .map(|class| class.id)
            .collect();

        let built = ResultBuilder::new(&roster, class_order).from_text(text);
        assert!(built.unmatched.is_empty(), "unmatched names: {:?}", built.unmatched);

        SessionResults {
            session_id: session.id,
            results: built.results,
        }
    }

    /// build the results of a race session and flag the fastest lap
    pub fn results_with_fastest_lap(&mut self, session: &Session, text: &str, driver_id: i32) -> SessionResults {
        let mut results = self.results(session, text);
        let flagged = results.results.iter().any(|r| r.driver_id == driver_id && r.participated());
        assert!(flagged, "driver {} did not finish", driver_id);
        for result in results.results.iter_mut() {
            result.fastest_lap = result.driver_id == driver_id;
        }
        results
    }

    /// save already built race results of a round
    pub fn save_built(&mut self, round: usize, races: Vec<SessionResults>) -> SavedRound {
        let round_id = self.rounds[round].round.id;
        save_results(&mut self.conn, &mut self.cache, self.category.id, round_id, None, races).unwrap()
    }

    /// save the races of a round, without qualifying
    pub fn save_races(&mut self, round: usize, race_1: &str, race_2: Option<&str>) -> SavedRound {
        let sessions = &self.rounds[round];
        let (round_id, race_1_session, race_2_session) =
            (sessions.round.id, sessions.race_1.clone(), sessions.race_2.clone());

        let mut races = vec![self.results(&race_1_session, race_1)];
        if let Some(race_2) = race_2 {
            races.push(self.results(&race_2_session, race_2));
        }

        save_results(&mut self.conn, &mut self.cache, self.category.id, round_id, None, races).unwrap()
    }

    pub fn penalize(&mut self, driver_id: i32, round: usize, session: &Session, draft: PenaltyDraft) -> Penalty {
        let draft = PenaltyDraft {
            driver_id,
            category_id: self.category.id,
            round_id: self.rounds[round].round.id,
            session_id: session.id,
            ..draft
        };
        create_penalty(&mut self.conn, &draft, date(4, 1)).unwrap()
    }

    pub fn membership(&mut self, driver_id: i32) -> DriverCategory {
        DriverCategory::get(&mut self.conn, driver_id, self.category.id)
            .unwrap()
            .expect("driver in category")
    }

    pub fn team_points(&mut self, team_id: i32) -> f64 {
        TeamChampionship::get(&mut self.conn, team_id, self.championship.id)
            .unwrap()
            .expect("team in championship")
            .points
    }

    pub fn race_result(&mut self, session: &Session, driver_id: i32) -> RaceResult {
        RaceResult::get_for_driver(&mut self.conn, session.id, driver_id)
            .unwrap()
            .expect("race result")
    }
}
