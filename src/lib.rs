mod database {
    pub mod actions;
    pub mod error;
    pub mod memory;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod api {
    pub mod handlers;
    pub mod reply;
    mod routes;

    pub use routes::routes;
}
pub mod config;
mod constants;

pub use authentication::*;
pub use constants::*;
pub use database::*;
