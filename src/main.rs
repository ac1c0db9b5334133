use std::sync::Arc;
use axum::{
    routing::{Router, get},
    Extension,
    http::{Method, HeaderValue},
};
use tower_http::{
    cors::{CorsLayer, Any},
    compression::CompressionLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing::{info, error};
use tokio::time::{interval, Duration};

mod routes;
mod models;
mod services;
mod config;
mod error;
mod utils;
mod state;

use crate::{
    config::Config,
    state::AppState,
    services::{
        Database,
        AdSlotService,
        AuthService,
        CategoryService,
        ModerationService,
        PublisherService,
        ResourceService,
        SubmissionService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "rainbow_catalog=debug,tower_http=debug".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rainbow-Catalog service...");

    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化数据库连接
    let db = Arc::new(Database::new(&config).await?);
    db.verify_connection().await?;
    info!("Database connection established successfully");

    // 初始化所有服务
    let auth_service = AuthService::new(&config);
    let publisher_service = PublisherService::new(&config, db.clone())?;
    let category_service = CategoryService::new(db.clone());
    let submission_service = SubmissionService::new(db.clone());
    let moderation_service = ModerationService::new(db.clone(), publisher_service);
    let resource_service = ResourceService::new(db.clone());
    let ad_slot_service = AdSlotService::new(db.clone());

    // 根分类种子数据, 已存在时跳过
    category_service.seed_defaults().await?;

    // 创建应用状态
    let app_state = Arc::new(AppState {
        config: config.clone(),
        auth_service: auth_service.clone(),
        category_service,
        submission_service,
        moderation_service,
        resource_service,
        ad_slot_service,
    });

    // 启动后台任务
    start_background_tasks(app_state.clone()).await;

    // 配置 CORS: 生产环境只允许白名单来源
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(Any)
            .allow_origin(
                config.cors_allowed_origins
                    .split(',')
                    .map(|origin| origin.parse::<HeaderValue>().unwrap())
                    .collect::<Vec<_>>(),
            )
    } else {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(Any)
            .allow_origin(Any)
    };

    // 构建应用路由 - 使用/api/catalog/前缀避免网关路由冲突
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/catalog/auth", routes::auth::router())
        .nest("/api/catalog/categories", routes::categories::router())
        .nest("/api/catalog/resources", routes::resources::router())
        .nest("/api/catalog/submissions", routes::submissions::router())
        .nest("/api/catalog/moderation", routes::moderation::router())
        .layer(Extension(Arc::new(auth_service)))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "Rainbow-Catalog is running!"
}

async fn start_background_tasks(app_state: Arc<AppState>) {
    info!("Starting background tasks...");

    // 过期付费位清理任务
    let sweep_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(
            sweep_state.config.paid_slot_sweep_interval
        ));

        loop {
            interval.tick().await;
            if let Err(e) = sweep_state.ad_slot_service.expire_paid_slots().await {
                error!("Failed to expire paid slots: {}", e);
            }
        }
    });

    info!("Background tasks started successfully");
}
