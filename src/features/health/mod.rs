pub mod handlers;
pub mod routes;

pub use handlers::HealthState;
pub use routes::routes;
