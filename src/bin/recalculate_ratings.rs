use std::env;
use std::process;

use racing_league_results::config::Config;
use racing_league_results::errors::CustomResult;
use racing_league_results::modules::helpers::logging::setup_logging;
use racing_league_results::modules::models::general::establish_connection;
use racing_league_results::modules::rating::recalculate_ratings;

fn run(championship_id: i32) -> CustomResult<usize> {
    let config = Config::from_env()?;
    setup_logging(&config)?;

    let connection = &mut establish_connection(&config.database_url)?;
    let mut cache = config.driver_cache();
    recalculate_ratings(connection, cache.as_mut(), championship_id)
}

pub fn main() {
    let championship_id = match env::args().nth(1).map(|arg| arg.parse::<i32>()) {
        Some(Ok(id)) => id,
        _ => {
            eprintln!("usage: recalculate_ratings <championship id>");
            process::exit(2);
        }
    };

    match run(championship_id) {
        Ok(sessions) => println!("replayed {} race sessions of championship {}", sessions, championship_id),
        Err(error) => {
            eprintln!("error recalculating ratings: {}", error);
            process::exit(1);
        }
    }
}
