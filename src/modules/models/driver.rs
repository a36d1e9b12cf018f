use diesel::prelude::*;
use diesel::SqliteConnection;
use log::error;
use serde::{Deserialize, Serialize};
use skillratings::trueskill::TrueSkillRating;

use crate::modules::cache::{DriverCache, DriverKey};
use crate::schema::drivers;

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = drivers)]
pub struct NewDriver {
    pub psn_id: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub telegram_id: Option<String>,
    pub rre_id: Option<i32>,
    pub mu: f64,
    pub sigma: f64,
}

impl NewDriver {
    /// a driver with only a psn id and the default rating
    pub fn with_psn_id(psn_id: &str) -> NewDriver {
        let rating = TrueSkillRating::new();
        NewDriver {
            psn_id: psn_id.to_string(),
            name: None,
            surname: None,
            telegram_id: None,
            rre_id: None,
            mu: rating.rating,
            sigma: rating.uncertainty,
        }
    }
}

#[derive(Queryable, Identifiable, Serialize, PartialEq, Debug, Clone, Deserialize)]
#[diesel(table_name = drivers)]
pub struct Driver {
    pub id: i32,
    pub psn_id: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub telegram_id: Option<String>,
    pub rre_id: Option<i32>,
    pub mu: f64,
    pub sigma: f64,
}

impl Driver {
    /// # create driver
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `new_driver` - the driver to insert
    ///
    /// ## Returns
    /// * `Driver` - the created driver
    pub fn new(conn: &mut SqliteConnection, new_driver: &NewDriver) -> QueryResult<Driver> {
        match diesel::insert_into(drivers::table)
            .values(new_driver)
            .get_result::<Driver>(conn)
        {
            Ok(driver) => Ok(driver),
            Err(error) => {
                error!(target:"models/driver:new", "Error creating driver {}: {}", new_driver.psn_id, error);
                Err(error)
            }
        }
    }

    pub fn get_by_id(conn: &mut SqliteConnection, id_in: i32) -> QueryResult<Driver> {
        use crate::schema::drivers::dsl::*;

        drivers.filter(id.eq(id_in)).first::<Driver>(conn)
    }

    pub fn get_by_psn_id(conn: &mut SqliteConnection, psn_id_in: &str) -> QueryResult<Option<Driver>> {
        use crate::schema::drivers::dsl::*;

        drivers
            .filter(psn_id.eq(psn_id_in))
            .first::<Driver>(conn)
            .optional()
    }

    pub fn get_by_telegram_id(conn: &mut SqliteConnection, telegram_id_in: &str) -> QueryResult<Option<Driver>> {
        use crate::schema::drivers::dsl::*;

        drivers
            .filter(telegram_id.eq(telegram_id_in))
            .first::<Driver>(conn)
            .optional()
    }

    pub fn get_by_rre_id(conn: &mut SqliteConnection, rre_id_in: i32) -> QueryResult<Option<Driver>> {
        use crate::schema::drivers::dsl::*;

        drivers
            .filter(rre_id.eq(rre_id_in))
            .first::<Driver>(conn)
            .optional()
    }

    /// # get drivers from ids
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `ids` - the database ids of the drivers
    ///
    /// ## Returns
    /// * `Vec<Driver>` - the drivers, ordered by id
    pub fn get_from_ids(conn: &mut SqliteConnection, ids: &[i32]) -> QueryResult<Vec<Driver>> {
        use crate::schema::drivers::dsl::*;

        drivers
            .filter(id.eq_any(ids))
            .order(id.asc())
            .load::<Driver>(conn)
    }

    /// # cached lookup
    /// look a driver up through the cache, falling back to the database on a miss.
    /// found drivers are stored in the cache under the requested key
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `cache` - the driver cache
    /// * `key` - what to look the driver up by
    ///
    /// ## Returns
    /// * `Option<Driver>` - the driver, None if no driver matches the key
    pub fn fetch(
        conn: &mut SqliteConnection,
        cache: &mut dyn DriverCache,
        key: &DriverKey,
    ) -> QueryResult<Option<Driver>> {
        if let Some(driver) = cache.get(key) {
            return Ok(Some(driver));
        }

        let driver = match key {
            DriverKey::Id(driver_id) => Driver::get_by_id(conn, *driver_id).optional()?,
            DriverKey::PsnId(psn_id) => Driver::get_by_psn_id(conn, psn_id)?,
            DriverKey::TelegramId(telegram_id) => Driver::get_by_telegram_id(conn, telegram_id)?,
        };

        if let Some(driver) = &driver {
            cache.insert(key, driver);
        }

        Ok(driver)
    }

    /// # set the rating of a driver
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `driver_id` - the database id of the driver
    /// * `rating` - the new rating
    pub fn set_rating_id(conn: &mut SqliteConnection, driver_id: i32, rating: TrueSkillRating) -> QueryResult<()> {
        match diesel::update(drivers::table.filter(drivers::id.eq(driver_id)))
            .set((drivers::mu.eq(rating.rating), drivers::sigma.eq(rating.uncertainty)))
            .execute(conn)
        {
            Ok(_) => Ok(()),
            Err(error) => {
                error!(target:"models/driver:set_rating_id", "Error updating rating of driver {}: {}", driver_id, error);
                Err(error)
            }
        }
    }

    pub fn rating(&self) -> TrueSkillRating {
        TrueSkillRating {
            rating: self.mu,
            uncertainty: self.sigma,
        }
    }

    pub fn full_name(&self) -> String {
        match (&self.name, &self.surname) {
            (Some(name), Some(surname)) => format!("{} {}", name, surname),
            _ => self.psn_id.clone(),
        }
    }
}
