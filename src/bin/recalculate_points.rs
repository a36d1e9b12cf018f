use std::env;
use std::process;

use racing_league_results::config::Config;
use racing_league_results::errors::CustomResult;
use racing_league_results::modules::helpers::logging::setup_logging;
use racing_league_results::modules::models::general::establish_connection;
use racing_league_results::modules::standings::recalculate_points;

fn run(championship_id: i32) -> CustomResult<()> {
    let config = Config::from_env()?;
    setup_logging(&config)?;

    let connection = &mut establish_connection(&config.database_url)?;
    recalculate_points(connection, championship_id)
}

pub fn main() {
    let championship_id = match env::args().nth(1).map(|arg| arg.parse::<i32>()) {
        Some(Ok(id)) => id,
        _ => {
            eprintln!("usage: recalculate_points <championship id>");
            process::exit(2);
        }
    };

    if let Err(error) = run(championship_id) {
        eprintln!("error recalculating points: {}", error);
        process::exit(1);
    }
    println!("recalculated points of championship {}", championship_id);
}
