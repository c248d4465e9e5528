pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod media_client;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod utils;
