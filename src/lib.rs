pub mod career_guide_web_server;
pub mod core;
pub mod db;
pub mod models;
pub mod routes;
