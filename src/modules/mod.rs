pub mod cache;
pub mod penalties;
pub mod rating;
pub mod redis;
pub mod result_builder;
pub mod scoring;
pub mod standings;

pub mod models {
    pub mod category;
    pub mod driver;
    pub mod driver_category;
    pub mod penalty;
    pub mod qualifying_result;
    pub mod race_result;
    pub mod round;
    pub mod session;
    pub mod team;

    pub mod general;
}

pub mod helpers {
    pub mod logging;
    pub mod matcher;
    pub mod time;
}
