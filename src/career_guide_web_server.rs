use crate::core::{AppConfig, AssistantClient, SupabaseAuth, SupabaseStorage};
use crate::core::jwt_auth::TokenVerifier;
use crate::db::{AdminRequestStore, AiChatStore, GroupStore, PgStore, ProfileStore, WeekStore};
use crate::routes::career_guide_routes;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{dev::Server, web::Data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use uuid::Uuid;

/// Request-independent knobs the handlers read.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub max_file_size_bytes: usize,
    pub max_files: usize,
    pub max_total_bytes: usize,
    pub default_group_id: Option<Uuid>,
    pub secure_cookies: bool,
}

/// Everything the routes pull out of `web::Data`.
#[derive(Clone)]
pub struct AppDependencies {
    pub weeks: Arc<dyn WeekStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub admin_requests: Arc<dyn AdminRequestStore>,
    pub groups: Arc<dyn GroupStore>,
    pub ai_chats: Arc<dyn AiChatStore>,
    pub storage: SupabaseStorage,
    pub auth: SupabaseAuth,
    pub assistant: AssistantClient,
    pub tokens: TokenVerifier,
    pub settings: RuntimeSettings,
}

impl AppDependencies {
    pub fn from_config(configuration: &AppConfig, store: PgStore) -> Result<Self, anyhow::Error> {
        let store = Arc::new(store);

        Ok(Self {
            weeks: store.clone(),
            profiles: store.clone(),
            admin_requests: store.clone(),
            groups: store.clone(),
            ai_chats: store,
            storage: SupabaseStorage::new(&configuration.supabase)?,
            auth: SupabaseAuth::new(&configuration.supabase)?,
            assistant: AssistantClient::new(&configuration.assistant)?,
            tokens: TokenVerifier::new(&configuration.supabase.jwt_secret),
            settings: RuntimeSettings {
                max_file_size_bytes: configuration.uploads.max_file_size_bytes,
                max_files: configuration.uploads.max_files,
                max_total_bytes: configuration.uploads.max_total_bytes,
                default_group_id: configuration.groups.default_group_id,
                secure_cookies: configuration.cookies.secure,
            },
        })
    }
}

pub struct CareerGuideWebServer {
    port: u16,
    server: Server,
}

impl CareerGuideWebServer {
    pub async fn build(configuration: AppConfig) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            configuration.career_guide_server_config.host,
            configuration.career_guide_server_config.port
        );

        let pg_pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect_lazy_with(configuration.postgres.connect());

        if configuration.postgres.run_migrations {
            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!("database migrations applied");
        }

        let dependencies = AppDependencies::from_config(&configuration, PgStore::new(pg_pool))?;

        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(listener, dependencies).await?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub async fn run(listener: TcpListener, dependencies: AppDependencies) -> Result<Server, anyhow::Error> {
    let weeks: Data<dyn WeekStore> = Data::from(dependencies.weeks);
    let profiles: Data<dyn ProfileStore> = Data::from(dependencies.profiles);
    let admin_requests: Data<dyn AdminRequestStore> = Data::from(dependencies.admin_requests);
    let groups: Data<dyn GroupStore> = Data::from(dependencies.groups);
    let ai_chats: Data<dyn AiChatStore> = Data::from(dependencies.ai_chats);
    let storage = Data::new(dependencies.storage);
    let auth = Data::new(dependencies.auth);
    let assistant = Data::new(dependencies.assistant);
    let tokens = Data::new(dependencies.tokens);
    let settings = Data::new(dependencies.settings);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allowed_headers(vec![
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
            ])
            .supports_credentials();
        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .configure(career_guide_routes)
            .app_data(weeks.clone())
            .app_data(profiles.clone())
            .app_data(admin_requests.clone())
            .app_data(groups.clone())
            .app_data(ai_chats.clone())
            .app_data(storage.clone())
            .app_data(auth.clone())
            .app_data(assistant.clone())
            .app_data(tokens.clone())
            .app_data(settings.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
