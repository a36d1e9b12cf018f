use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::error;
use serde::{Deserialize, Serialize};

use crate::schema::driver_categories;

pub const STARTING_LICENCE_POINTS: i32 = 10;

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = driver_categories)]
pub struct NewDriverCategory {
    pub driver_id: i32,
    pub category_id: i32,
    pub car_class_id: Option<i32>,
    pub race_number: i32,
    pub licence_points: i32,
    pub warnings: i32,
    pub reprimands: i32,
    pub points: f64,
    pub position: Option<i32>,
    pub joined_on: NaiveDate,
}

impl NewDriverCategory {
    /// a fresh membership: full licence, no points, no position yet
    pub fn new(driver_id: i32, category_id: i32, race_number: i32, joined_on: NaiveDate) -> NewDriverCategory {
        NewDriverCategory {
            driver_id,
            category_id,
            car_class_id: None,
            race_number,
            licence_points: STARTING_LICENCE_POINTS,
            warnings: 0,
            reprimands: 0,
            points: 0.0,
            position: None,
            joined_on,
        }
    }
}

/// Membership of a driver in a category, with the standings data of that driver.
/// Rows are never deleted, leaving a category sets `left_on`.
#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = driver_categories)]
pub struct DriverCategory {
    pub id: i32,
    pub driver_id: i32,
    pub category_id: i32,
    pub car_class_id: Option<i32>,
    pub race_number: i32,
    pub licence_points: i32,
    pub warnings: i32,
    pub reprimands: i32,
    pub points: f64,
    pub position: Option<i32>,
    pub joined_on: NaiveDate,
    pub left_on: Option<NaiveDate>,
}

impl DriverCategory {
    pub fn new(conn: &mut SqliteConnection, membership: &NewDriverCategory) -> QueryResult<DriverCategory> {
        match diesel::insert_into(driver_categories::table)
            .values(membership)
            .get_result::<DriverCategory>(conn)
        {
            Ok(membership) => Ok(membership),
            Err(error) => {
                error!(target:"models/driver_category:new", "Error adding driver {} to category {}: {}", membership.driver_id, membership.category_id, error);
                Err(error)
            }
        }
    }

    pub fn get(conn: &mut SqliteConnection, driver_id: i32, category_id: i32) -> QueryResult<Option<DriverCategory>> {
        driver_categories::table
            .filter(driver_categories::driver_id.eq(driver_id))
            .filter(driver_categories::category_id.eq(category_id))
            .first::<DriverCategory>(conn)
            .optional()
    }

    /// # get every membership of a category
    /// including drivers who have left, they keep their place in the standings
    pub fn for_category(conn: &mut SqliteConnection, category_id: i32) -> QueryResult<Vec<DriverCategory>> {
        driver_categories::table
            .filter(driver_categories::category_id.eq(category_id))
            .order(driver_categories::id.asc())
            .load::<DriverCategory>(conn)
    }

    /// # get the drivers currently competing in a category
    /// ordered by standings position, unranked drivers last
    pub fn active_for_category(conn: &mut SqliteConnection, category_id: i32) -> QueryResult<Vec<DriverCategory>> {
        let mut memberships = driver_categories::table
            .filter(driver_categories::category_id.eq(category_id))
            .filter(driver_categories::left_on.is_null())
            .order(driver_categories::id.asc())
            .load::<DriverCategory>(conn)?;

        memberships.sort_by_key(|m| m.position.unwrap_or(i32::MAX));
        Ok(memberships)
    }

    /// # save the standings data
    /// write back licence points, warnings, reprimands, points and position
    pub fn save(&self, conn: &mut SqliteConnection) -> QueryResult<()> {
        match diesel::update(driver_categories::table.filter(driver_categories::id.eq(self.id)))
            .set((
                driver_categories::licence_points.eq(self.licence_points),
                driver_categories::warnings.eq(self.warnings),
                driver_categories::reprimands.eq(self.reprimands),
                driver_categories::points.eq(self.points),
                driver_categories::position.eq(self.position),
            ))
            .execute(conn)
        {
            Ok(_) => Ok(()),
            Err(error) => {
                error!(target:"models/driver_category:save", "Error saving driver {} in category {}: {}", self.driver_id, self.category_id, error);
                Err(error)
            }
        }
    }

    pub fn leave(&mut self, conn: &mut SqliteConnection, left_on: NaiveDate) -> QueryResult<()> {
        diesel::update(driver_categories::table.filter(driver_categories::id.eq(self.id)))
            .set(driver_categories::left_on.eq(Some(left_on)))
            .execute(conn)?;
        self.left_on = Some(left_on);
        Ok(())
    }
}
