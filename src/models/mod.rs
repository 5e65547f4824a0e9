pub mod admin_requests;
pub mod ai_chats;
pub mod groups;
pub mod pagination;
pub mod profiles;
pub mod viewer;
pub mod weeks;
