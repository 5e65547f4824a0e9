pub mod assistant;
pub mod config;
pub mod jwt_auth;
mod responses;
pub mod supabase;
mod telemetry;
pub mod utils;

pub use self::config::AppConfig;
pub use assistant::AssistantClient;
pub use responses::*;
pub use supabase::{SupabaseAuth, SupabaseStorage};
pub use telemetry::*;
