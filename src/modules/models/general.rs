use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::error;
use snafu::ResultExt;

use crate::errors::{ConnectionSnafu, CustomResult};

const CREATE_LEAGUE: &str = include_str!("../../../migrations/2024-01-15-000000_create_league/up.sql");

/// # open a database connection
/// open the sqlite database at the given url and enable foreign keys
///
/// ## Arguments
/// * `database_url` - path of the database file, or `:memory:`
pub fn establish_connection(database_url: &str) -> CustomResult<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url).context(ConnectionSnafu {
        url: database_url.to_string(),
    })?;

    conn.batch_execute("PRAGMA foreign_keys = ON;")?;

    Ok(conn)
}

/// # create the schema
/// run the schema migration. every statement is `IF NOT EXISTS`, running it twice is harmless
pub fn run_migrations(conn: &mut SqliteConnection) -> QueryResult<()> {
    match conn.batch_execute(CREATE_LEAGUE) {
        Ok(()) => Ok(()),
        Err(error) => {
            error!(target:"models/general:run_migrations", "Error creating schema: {}", error);
            Err(error)
        }
    }
}
