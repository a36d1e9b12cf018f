use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::error;
use serde::{Deserialize, Serialize};

use crate::modules::helpers::matcher::RosterEntry;
use crate::modules::models::driver::Driver;
use crate::modules::models::driver_category::DriverCategory;
use crate::modules::models::round::Round;
use crate::schema::{car_classes, categories, championships};

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = championships)]
pub struct NewChampionship {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = championships)]
pub struct Championship {
    pub id: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl Championship {
    pub fn new(conn: &mut SqliteConnection, new_championship: &NewChampionship) -> QueryResult<Championship> {
        diesel::insert_into(championships::table)
            .values(new_championship)
            .get_result::<Championship>(conn)
    }

    pub fn get_by_id(conn: &mut SqliteConnection, championship_id: i32) -> QueryResult<Championship> {
        championships::table
            .filter(championships::id.eq(championship_id))
            .first::<Championship>(conn)
    }

    pub fn categories(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<Category>> {
        categories::table
            .filter(categories::championship_id.eq(self.id))
            .order(categories::id.asc())
            .load::<Category>(conn)
    }
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub championship_id: i32,
    pub name: String,
    pub split_point: Option<i32>,
    pub fastest_lap_points: Option<f64>,
    pub fastest_lap_points_after_split: Option<f64>,
}

/// A racing class within a championship.
///
/// `split_point` and the two fastest lap values configure the fastest lap bonus,
/// see `scoring::FastestLapBonus`.
#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub championship_id: i32,
    pub name: String,
    pub split_point: Option<i32>,
    pub fastest_lap_points: Option<f64>,
    pub fastest_lap_points_after_split: Option<f64>,
}

impl Category {
    pub fn new(conn: &mut SqliteConnection, new_category: &NewCategory) -> QueryResult<Category> {
        match diesel::insert_into(categories::table)
            .values(new_category)
            .get_result::<Category>(conn)
        {
            Ok(category) => Ok(category),
            Err(error) => {
                error!(target:"models/category:new", "Error creating category {}: {}", new_category.name, error);
                Err(error)
            }
        }
    }

    pub fn get_by_id(conn: &mut SqliteConnection, category_id: i32) -> QueryResult<Category> {
        categories::table
            .filter(categories::id.eq(category_id))
            .first::<Category>(conn)
    }

    /// # get the rounds of the category
    /// ordered the way they appear on the calendar
    pub fn rounds(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<Round>> {
        Round::for_category(conn, self.id)
    }

    /// # get the car classes of the category
    /// ordered by their display order
    pub fn car_classes(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<CarClass>> {
        car_classes::table
            .filter(car_classes::category_id.eq(self.id))
            .order((car_classes::display_order.asc(), car_classes::id.asc()))
            .load::<CarClass>(conn)
    }

    /// # get the expected drivers
    /// build the roster of drivers currently competing in the category, used to
    /// match the names found in a result text
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    ///
    /// ## Returns
    /// * `Vec<RosterEntry>` - one entry per active driver, ordered by standings position
    pub fn roster(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<RosterEntry>> {
        let memberships = DriverCategory::active_for_category(conn, self.id)?;
        let driver_ids: Vec<i32> = memberships.iter().map(|m| m.driver_id).collect();
        let drivers = Driver::get_from_ids(conn, &driver_ids)?;

        Ok(memberships
            .iter()
            .filter_map(|membership| {
                drivers
                    .iter()
                    .find(|driver| driver.id == membership.driver_id)
                    .map(|driver| RosterEntry {
                        driver_id: driver.id,
                        psn_id: driver.psn_id.clone(),
                        car_class_id: membership.car_class_id,
                    })
            })
            .collect())
    }

    /// # is this the last round
    /// true when no round of the category is scheduled after the given one
    pub fn is_last_round(&self, conn: &mut SqliteConnection, round: &Round) -> QueryResult<bool> {
        let rounds = self.rounds(conn)?;
        Ok(rounds.last().map_or(true, |last| last.id == round.id))
    }
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = car_classes)]
pub struct NewCarClass {
    pub category_id: i32,
    pub name: String,
    pub display_order: i32,
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = car_classes)]
pub struct CarClass {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub display_order: i32,
}

impl CarClass {
    pub fn new(conn: &mut SqliteConnection, new_car_class: &NewCarClass) -> QueryResult<CarClass> {
        diesel::insert_into(car_classes::table)
            .values(new_car_class)
            .get_result::<CarClass>(conn)
    }
}
