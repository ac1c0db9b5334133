pub mod ad_slot;
pub mod auth;
pub mod category;
pub mod database;
pub mod moderation;
pub mod publisher;
pub mod resource;
pub mod submission;

// 重新导出常用类型
pub use ad_slot::AdSlotService;
pub use auth::AuthService;
pub use category::CategoryService;
pub use database::Database;
pub use moderation::ModerationService;
pub use publisher::PublisherService;
pub use resource::ResourceService;
pub use submission::SubmissionService;
