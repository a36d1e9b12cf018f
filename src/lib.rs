pub mod config;
pub mod errors;
pub mod schema;
pub mod modules;

pub(crate) mod macros {
    pub mod redis;
}
