use snafu::Snafu;

pub type CustomResult<T> = Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Database error: {}", source))]
    DatabaseError { source: diesel::result::Error },

    #[snafu(display("Could not connect to {}: {}", url, source))]
    ConnectionError {
        url: String,
        source: diesel::ConnectionError,
    },

    #[snafu(display("{} {} not found", entity, id))]
    NotFoundError { entity: &'static str, id: i32 },

    #[snafu(display(
        "No qualifying result for driver {} in session {}",
        driver_id,
        session_id
    ))]
    MissingQualifyingResultError { driver_id: i32, session_id: i32 },

    #[snafu(display(
        "Driver {} has results in category {} but is not part of its standings",
        driver_id,
        category_id
    ))]
    InconsistentStandingsError { driver_id: i32, category_id: i32 },

    #[snafu(display("Round {} is already completed", round_id))]
    RoundAlreadyCompletedError { round_id: i32 },

    #[snafu(display("Session {} does not belong to round {}", session_id, round_id))]
    SessionMismatchError { session_id: i32, round_id: i32 },

    #[snafu(display("Point system {} is not a list of numbers: {}", point_system_id, source))]
    InvalidPointSystemError {
        point_system_id: i32,
        source: serde_json::Error,
    },

    #[snafu(display("Unknown session name: {}", name))]
    InvalidSessionNameError { name: String },

    #[snafu(display("Penalty {} cannot be applied while {}", penalty_id, status))]
    PenaltyStateError { penalty_id: i32, status: String },

    #[snafu(display("Race time of driver {} is out of range", driver_id))]
    TimeOverflowError { driver_id: i32 },

    #[snafu(display("Missing configuration value: {}", key))]
    MissingConfigError { key: String },

    #[snafu(display("Invalid configuration value for {}: {}", key, value))]
    InvalidConfigError { key: String, value: String },

    #[snafu(display("Could not set up logging: {}", source))]
    LoggingError { source: fern::InitError },
}

impl From<diesel::result::Error> for Error {
    fn from(source: diesel::result::Error) -> Self {
        Error::DatabaseError { source }
    }
}
