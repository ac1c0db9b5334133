use crate::config::Config;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Debug;
use surrealdb::engine::remote::http::{Client, Http};
use surrealdb::opt::auth::Root;
use surrealdb::{Response, Surreal};
use tracing::{debug, error, info};

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    client: Surreal<Client>,
    pub config: Config,
}

impl Database {
    /// 创建新的数据库实例
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection to {}", config.database_url);

        let endpoint = config
            .database_url
            .trim_start_matches("http://")
            .trim_start_matches("https://");

        let client = Surreal::new::<Http>(endpoint).await?;

        client
            .signin(Root {
                username: &config.database_username,
                password: &config.database_password,
            })
            .await?;

        client
            .use_ns(&config.database_namespace)
            .use_db(&config.database_name)
            .await?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match self.client.query("INFO FOR DB").await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    /// 执行原始SQL查询
    pub async fn query(&self, sql: &str) -> Result<Response> {
        self.client.query(sql).await.map_err(AppError::from)
    }

    /// 执行带参数的查询
    pub async fn query_with_params<P>(&self, sql: &str, params: P) -> Result<Response>
    where
        P: Serialize,
    {
        self.client
            .query(sql)
            .bind(params)
            .await
            .map_err(AppError::from)
    }

    /// 创建记录; `data` 中的 `id` 字段成为记录ID
    pub async fn create<T>(&self, table: &str, data: T) -> Result<T>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        let mut response = self
            .client
            .query("CREATE type::table($tb) CONTENT $data RETURN AFTER")
            .bind(json!({ "tb": table, "data": data }))
            .await?;

        let results: Vec<T> = response.take(0)?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Failed to create record".to_string()))
    }

    /// 通过ID获取单个记录
    pub async fn get_by_id<T>(&self, table: &str, id: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        // 接受纯ID和带表前缀的ID两种形式
        let prefix = format!("{}:", table);
        let pure_id = id.strip_prefix(&prefix).unwrap_or(id);

        debug!("Fetching {}:{}", table, pure_id);

        let mut response = self
            .client
            .query("SELECT * FROM type::thing($tb, $id)")
            .bind(json!({ "tb": table, "id": pure_id }))
            .await?;

        let results: Vec<T> = response.take(0)?;
        Ok(results.into_iter().next())
    }

    /// 通过ID使用JSON数据部分更新记录并返回更新后的值
    pub async fn update_by_id_with_json<T>(
        &self,
        table: &str,
        id: &str,
        updates: serde_json::Value,
    ) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        let prefix = format!("{}:", table);
        let pure_id = id.strip_prefix(&prefix).unwrap_or(id);

        let mut response = self
            .client
            .query("UPDATE type::thing($tb, $id) MERGE $updates RETURN AFTER")
            .bind(json!({ "tb": table, "id": pure_id, "updates": updates }))
            .await?;

        let results: Vec<T> = response.take(0)?;
        Ok(results.into_iter().next())
    }
}
