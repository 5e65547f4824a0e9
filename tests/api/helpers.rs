use async_trait::async_trait;
use career_guide::career_guide_web_server::{run, AppDependencies, RuntimeSettings};
use career_guide::core::config::{AssistantConfig, SupabaseConfig};
use career_guide::core::jwt_auth::{generate_jwt_token, JwtClaims, TokenVerifier};
use career_guide::core::{
    get_subscriber, init_subscriber, AppError, AssistantClient, SupabaseAuth, SupabaseStorage,
};
use career_guide::db::{AdminRequestStore, AiChatStore, GroupStore, ProfileStore, WeekStore};
use career_guide::models::admin_requests::{AdminRequest, AdminRequestStatus};
use career_guide::models::ai_chats::{AiChat, NewAiChat};
use career_guide::models::groups::{Group, GroupMessage};
use career_guide::models::pagination::PaginationQuery;
use career_guide::models::profiles::{NewProfile, Profile, Role};
use career_guide::models::weeks::{NewWeek, NewWeekFile, Week, WeekChanges, WeekFile, WeekWithFiles};
use chrono::Utc;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use once_cell::sync::Lazy;
use reqwest::multipart::{Form, Part};
use secrecy::Secret;
use std::collections::{HashMap, HashSet};
use std::net::TcpListener;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

const JWT_SECRET: &str = "test-jwt-secret-with-at-least-thirty-two-characters";

#[derive(Default)]
pub struct InMemoryState {
    pub profiles: HashMap<Uuid, Profile>,
    pub weeks: Vec<Week>,
    pub week_files: Vec<WeekFile>,
    pub admin_requests: Vec<AdminRequest>,
    pub groups: Vec<Group>,
    pub members: HashSet<(Uuid, Uuid)>,
    pub messages: Vec<GroupMessage>,
    pub ai_chats: Vec<AiChat>,
    /// `insert_week_file` fails for these file names.
    pub failing_file_names: HashSet<String>,
}

/// Stand-in for the Postgres store with the same observable behaviour.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryStore {
    pub fn state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl WeekStore for InMemoryStore {
    async fn week_number_exists(&self, week_number: i32) -> Result<bool, AppError> {
        Ok(self.state().weeks.iter().any(|w| w.week_number == week_number))
    }

    async fn insert_week(&self, week: &NewWeek) -> Result<Week, AppError> {
        let mut state = self.state();
        if state.weeks.iter().any(|w| w.week_number == week.week_number) {
            return Err(AppError::validation_error(format!("Week {} already exists", week.week_number)));
        }
        let stored = Week {
            id: Uuid::new_v4(),
            week_number: week.week_number,
            title: week.title.clone(),
            description: week.description.clone(),
            created_by: Some(week.created_by),
            created_at: Utc::now(),
        };
        state.weeks.push(stored.clone());
        Ok(stored)
    }

    async fn insert_week_file(&self, file: &NewWeekFile) -> Result<WeekFile, AppError> {
        if self.state().failing_file_names.contains(&file.file_name) {
            return Err(AppError::db_error("insert into week_files failed"));
        }
        let stored = WeekFile {
            id: Uuid::new_v4(),
            week_id: file.week_id,
            file_name: file.file_name.clone(),
            file_type: file.file_type,
            file_url: file.file_url.clone(),
            storage_path: file.storage_path.clone(),
            file_size: file.file_size,
            uploaded_by: Some(file.uploaded_by),
            created_at: Utc::now(),
        };
        self.state().week_files.push(stored.clone());
        Ok(stored)
    }

    async fn list_weeks(&self) -> Result<Vec<WeekWithFiles>, AppError> {
        let state = self.state();
        let mut weeks = state.weeks.clone();
        weeks.sort_by_key(|w| w.week_number);
        Ok(weeks
            .into_iter()
            .map(|week| {
                let files = state.week_files.iter().filter(|f| f.week_id == week.id).cloned().collect();
                WeekWithFiles { week, files }
            })
            .collect())
    }

    async fn get_week(&self, week_id: Uuid) -> Result<Option<WeekWithFiles>, AppError> {
        let state = self.state();
        Ok(state.weeks.iter().find(|w| w.id == week_id).map(|week| WeekWithFiles {
            week: week.clone(),
            files: state.week_files.iter().filter(|f| f.week_id == week_id).cloned().collect(),
        }))
    }

    async fn update_week(&self, week_id: Uuid, changes: &WeekChanges) -> Result<Option<Week>, AppError> {
        let mut state = self.state();
        Ok(state.weeks.iter_mut().find(|w| w.id == week_id).map(|week| {
            if let Some(title) = &changes.title {
                week.title = title.clone();
            }
            if let Some(description) = &changes.description {
                week.description = description.clone();
            }
            week.clone()
        }))
    }

    async fn delete_week(&self, week_id: Uuid) -> Result<Option<WeekWithFiles>, AppError> {
        let mut state = self.state();
        let Some(index) = state.weeks.iter().position(|w| w.id == week_id) else {
            return Ok(None);
        };
        let week = state.weeks.remove(index);
        let (files, kept): (Vec<WeekFile>, Vec<WeekFile>) =
            state.week_files.drain(..).partition(|f| f.week_id == week_id);
        state.week_files = kept;
        Ok(Some(WeekWithFiles { week, files }))
    }

    async fn delete_week_file(&self, week_id: Uuid, file_id: Uuid) -> Result<Option<WeekFile>, AppError> {
        let mut state = self.state();
        let position = state
            .week_files
            .iter()
            .position(|f| f.id == file_id && f.week_id == week_id);
        Ok(position.map(|index| state.week_files.remove(index)))
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.state().profiles.get(&user_id).cloned())
    }

    async fn ensure_profile(&self, profile: &NewProfile) -> Result<Profile, AppError> {
        let mut state = self.state();
        let stored = state.profiles.entry(profile.id).or_insert_with(|| Profile {
            id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            role: Role::Student,
            created_at: Utc::now(),
        });
        Ok(stored.clone())
    }
}

#[async_trait]
impl AdminRequestStore for InMemoryStore {
    async fn pending_request_for(&self, user_id: Uuid) -> Result<Option<AdminRequest>, AppError> {
        Ok(self
            .state()
            .admin_requests
            .iter()
            .find(|r| r.user_id == user_id && r.status == AdminRequestStatus::Pending)
            .cloned())
    }

    async fn create_request(&self, user_id: Uuid, reason: &str) -> Result<AdminRequest, AppError> {
        let mut state = self.state();
        let request = AdminRequest {
            id: Uuid::new_v4(),
            user_id,
            reason: reason.to_string(),
            status: AdminRequestStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };
        state.admin_requests.push(request.clone());
        if let Some(profile) = state.profiles.get_mut(&user_id) {
            profile.role = Role::PendingAdmin;
        }
        Ok(request)
    }

    async fn list_requests(&self, status: Option<AdminRequestStatus>) -> Result<Vec<AdminRequest>, AppError> {
        let mut requests: Vec<AdminRequest> = self
            .state()
            .admin_requests
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.reverse();
        Ok(requests)
    }

    async fn review_request(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
        decision: AdminRequestStatus,
    ) -> Result<AdminRequest, AppError> {
        let mut state = self.state();
        let request = state
            .admin_requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| AppError::not_found("Admin request not found"))?;

        request.status = request.status.review(decision)?;
        request.reviewed_by = Some(reviewer_id);
        request.reviewed_at = Some(Utc::now());
        let reviewed = request.clone();

        if let Some(profile) = state.profiles.get_mut(&reviewed.user_id) {
            profile.role = reviewed.status.resulting_role();
        }
        Ok(reviewed)
    }
}

#[async_trait]
impl GroupStore for InMemoryStore {
    async fn group_exists(&self, group_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state().groups.iter().any(|g| g.id == group_id))
    }

    async fn default_group(&self) -> Result<Option<Group>, AppError> {
        Ok(self.state().groups.iter().find(|g| g.is_default).cloned())
    }

    async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>, AppError> {
        let state = self.state();
        Ok(state
            .groups
            .iter()
            .filter(|g| state.members.contains(&(g.id, user_id)))
            .cloned()
            .collect())
    }

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state().members.contains(&(group_id, user_id)))
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state().members.insert((group_id, user_id)))
    }

    async fn list_messages(
        &self,
        group_id: Uuid,
        page: &PaginationQuery,
    ) -> Result<(Vec<GroupMessage>, i64), AppError> {
        let state = self.state();
        let all: Vec<&GroupMessage> = state.messages.iter().filter(|m| m.group_id == group_id).collect();
        let total = all.len() as i64;
        let messages = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok((messages, total))
    }

    async fn insert_message(&self, group_id: Uuid, user_id: Uuid, content: &str) -> Result<GroupMessage, AppError> {
        let message = GroupMessage {
            id: Uuid::new_v4(),
            group_id,
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.state().messages.push(message.clone());
        Ok(message)
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<GroupMessage>, AppError> {
        Ok(self.state().messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        let before = state.messages.len();
        state.messages.retain(|m| m.id != message_id);
        Ok(state.messages.len() < before)
    }
}

#[async_trait]
impl AiChatStore for InMemoryStore {
    async fn chats_for_user(&self, user_id: Uuid, page: &PaginationQuery) -> Result<(Vec<AiChat>, i64), AppError> {
        let state = self.state();
        let mine: Vec<&AiChat> = state.ai_chats.iter().rev().filter(|c| c.user_id == user_id).collect();
        let total = mine.len() as i64;
        let chats = mine
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok((chats, total))
    }

    async fn insert_chat(&self, chat: &NewAiChat) -> Result<AiChat, AppError> {
        let stored = AiChat {
            id: Uuid::new_v4(),
            user_id: chat.user_id,
            prompt: chat.prompt.clone(),
            response: chat.response.clone(),
            model: chat.model.clone(),
            created_at: Utc::now(),
        };
        self.state().ai_chats.push(stored.clone());
        Ok(stored)
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryStore>,
    /// Plays Supabase Auth, Supabase Storage and the assistant endpoint.
    pub supabase: MockServer,
    pub default_group_id: Uuid,
    pub api_client: reqwest::Client,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Same as `spawn_app`, with the runtime settings adjusted before the server starts.
pub async fn spawn_app_with(configure: impl FnOnce(&mut RuntimeSettings)) -> TestApp {
    Lazy::force(&TRACING);

    let supabase = MockServer::start().await;
    let store = Arc::new(InMemoryStore::default());

    let default_group_id = Uuid::new_v4();
    store.state().groups.push(Group {
        id: default_group_id,
        name: "Program Community".to_string(),
        description: None,
        is_default: true,
        created_at: Utc::now(),
    });

    let supabase_config = SupabaseConfig {
        url: supabase.uri(),
        anon_key: Secret::new("anon-key".to_string()),
        service_role_key: Secret::new("service-role-key".to_string()),
        jwt_secret: Secret::new(JWT_SECRET.to_string()),
        storage_bucket: "week-files".to_string(),
        timeout_seconds: 5,
    };
    let assistant_config = AssistantConfig {
        base_url: format!("{}/assistant", supabase.uri()),
        api_key: Secret::new("sk-test".to_string()),
        model: "test-model".to_string(),
        system_prompt: "You are a career guidance assistant.".to_string(),
        history_turns: 3,
        timeout_seconds: 5,
    };

    let mut settings = RuntimeSettings {
        max_file_size_bytes: 1024 * 1024,
        max_files: 5,
        max_total_bytes: 4 * 1024 * 1024,
        default_group_id: Some(default_group_id),
        secure_cookies: false,
    };
    configure(&mut settings);

    let dependencies = AppDependencies {
        weeks: store.clone(),
        profiles: store.clone(),
        admin_requests: store.clone(),
        groups: store.clone(),
        ai_chats: store.clone(),
        storage: SupabaseStorage::new(&supabase_config).expect("Failed to build storage client"),
        auth: SupabaseAuth::new(&supabase_config).expect("Failed to build auth client"),
        assistant: AssistantClient::new(&assistant_config).expect("Failed to build assistant client"),
        tokens: TokenVerifier::new(&supabase_config.jwt_secret),
        settings,
    };

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let server = run(listener, dependencies).await.expect("Failed to build server");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        supabase,
        default_group_id,
        api_client: reqwest::Client::new(),
    }
}

pub fn token_for(user_id: Uuid, email: &str) -> String {
    let claims = JwtClaims {
        sub: user_id,
        email: Some(email.to_string()),
        role: Some("authenticated".to_string()),
        aud: "authenticated".to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    generate_jwt_token(&Secret::new(JWT_SECRET.to_string()), &claims).expect("Failed to sign token")
}

pub fn photo_and_pdf() -> Vec<(&'static str, &'static str)> {
    vec![("photo.jpg", "image/jpeg"), ("guide.pdf", "application/pdf")]
}

pub fn week_form(week_number: &str, title: &str, description: &str, files: &[(&str, &str)]) -> Form {
    week_form_with(week_number, title, description, files, |name| {
        format!("contents of {}", name).into_bytes()
    })
}

pub fn week_form_with(
    week_number: &str,
    title: &str,
    description: &str,
    files: &[(&str, &str)],
    contents: impl Fn(&str) -> Vec<u8>,
) -> Form {
    let mut form = Form::new()
        .text("week_number", week_number.to_string())
        .text("title", title.to_string())
        .text("description", description.to_string());
    for (name, mime) in files {
        let part = Part::bytes(contents(name))
            .file_name(name.to_string())
            .mime_str(mime)
            .expect("Invalid mime type");
        form = form.part("files", part);
    }
    form
}

impl TestApp {
    pub fn create_user(&self, role: Role) -> TestUser {
        let id = Uuid::new_v4();
        let email: String = SafeEmail().fake();
        let full_name: String = Name().fake();
        self.store.state().profiles.insert(
            id,
            Profile {
                id,
                email: email.clone(),
                full_name: Some(full_name),
                role,
                created_at: Utc::now(),
            },
        );
        let token = token_for(id, &email);
        TestUser { id, email, token }
    }

    pub fn create_group(&self, members: &[Uuid]) -> Uuid {
        let group_id = Uuid::new_v4();
        let mut state = self.store.state();
        state.groups.push(Group {
            id: group_id,
            name: format!("Group {}", &group_id.to_string()[..8]),
            description: Some("Study group".to_string()),
            is_default: false,
            created_at: Utc::now(),
        });
        for member in members {
            state.members.insert((group_id, *member));
        }
        group_id
    }

    pub async fn mock_storage_uploads(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/storage/v1/object/week-files/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Key": "ok"})))
            .mount(&self.supabase)
            .await;
    }

    pub async fn mock_storage_removals(&self) {
        Mock::given(method("DELETE"))
            .and(path_regex(r"^/storage/v1/object/week-files$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&self.supabase)
            .await;
    }

    pub async fn post_week(&self, token: &str, form: Form) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/api/weeks", &self.address))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_weeks(&self, token: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/api/weeks", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn review_request(&self, token: &str, request_id: &str, status: &str) -> reqwest::Response {
        self.api_client
            .patch(&format!("{}/api/admin/requests/{}", &self.address, request_id))
            .bearer_auth(token)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn submit_request(&self, token: &str, reason: &str) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/api/admin/requests", &self.address))
            .bearer_auth(token)
            .json(&serde_json::json!({ "reason": reason }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub fn role_of(&self, user_id: Uuid) -> Role {
        self.store.state().profiles[&user_id].role
    }
}

pub async fn error_message(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.expect("Body was not JSON");
    body["error"].as_str().expect("Missing error field").to_string()
}
