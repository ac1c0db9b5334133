use crate::{
    config::Config,
    services::{
        ad_slot::AdSlotService, auth::AuthService, category::CategoryService,
        moderation::ModerationService, resource::ResourceService, submission::SubmissionService,
    },
};

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 认证服务
    pub auth_service: AuthService,

    /// 分类服务
    pub category_service: CategoryService,

    /// 提交服务
    pub submission_service: SubmissionService,

    /// 审核服务
    pub moderation_service: ModerationService,

    /// 资源服务
    pub resource_service: ResourceService,

    /// 广告位服务
    pub ad_slot_service: AdSlotService,
}
