use crate::{
    error::{AppError, Result},
    models::resource::{Resource, ResourceQuery, UpdateResourceRequest},
    services::Database,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

#[derive(Clone)]
pub struct ResourceService {
    db: Arc<Database>,
}

impl ResourceService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn get(&self, resource_id: &str) -> Result<Option<Resource>> {
        self.db.get_by_id("resource", resource_id).await
    }

    /// 公开列表, 付费资源在前
    pub async fn list(&self, query: &ResourceQuery) -> Result<Vec<Resource>> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(self.db.config.default_resources_per_page)
            .min(100);
        let offset = (page - 1) * limit;

        let mut sql = String::from("SELECT * FROM resource");
        let mut conditions: Vec<String> = Vec::new();
        let mut params = serde_json::Map::new();

        if let Some(category_id) = &query.category_id {
            conditions.push("category_id = $category_id".to_string());
            params.insert("category_id".to_string(), json!(category_id));
        }
        if let Some(subcategory_id) = &query.subcategory_id {
            conditions.push("subcategory_id = $subcategory_id".to_string());
            params.insert("subcategory_id".to_string(), json!(subcategory_id));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        // 活跃付费的资源排在前面, 其余按新旧
        sql.push_str(
            " ORDER BY is_paid DESC, created_at DESC LIMIT $limit START $offset",
        );
        params.insert("limit".to_string(), json!(limit));
        params.insert("offset".to_string(), json!(offset));

        debug!("Listing resources: {}", sql);

        let mut response = self.db.query_with_params(&sql, json!(params)).await?;
        let resources: Vec<Resource> = response.take(0)?;
        Ok(resources)
    }

    /// 当前活跃付费的资源
    pub async fn list_paid(&self) -> Result<Vec<Resource>> {
        let mut response = self
            .db
            .query(
                r#"
                SELECT * FROM resource
                WHERE is_paid = true
                AND (paid_until = NONE OR paid_until > time::now())
                ORDER BY created_at DESC
                "#,
            )
            .await?;

        let resources: Vec<Resource> = response.take(0)?;
        Ok(resources)
    }

    /// 管理员字段级编辑
    pub async fn update(
        &self,
        resource_id: &str,
        request: UpdateResourceRequest,
    ) -> Result<Resource> {
        request.validate().map_err(AppError::ValidatorError)?;

        let existing: Option<Resource> = self.db.get_by_id("resource", resource_id).await?;
        if existing.is_none() {
            return Err(AppError::NotFound("Ресурс не найден".to_string()));
        }

        let mut updates = serde_json::Map::new();
        if let Some(title) = request.title {
            updates.insert("title".to_string(), json!(title));
        }
        if let Some(description) = request.description {
            updates.insert("description".to_string(), json!(description));
        }
        if let Some(link) = request.telegram_link {
            updates.insert("telegram_link".to_string(), json!(link));
        }
        if let Some(username) = request.telegram_username {
            updates.insert("telegram_username".to_string(), json!(username));
        }
        if let Some(cover) = request.cover_image {
            updates.insert("cover_image".to_string(), json!(cover));
        }
        if let Some(subcategory_id) = request.subcategory_id {
            updates.insert("subcategory_id".to_string(), json!(subcategory_id));
        }
        if let Some(is_private) = request.is_private {
            updates.insert("is_private".to_string(), json!(is_private));
        }
        if let Some(is_paid) = request.is_paid {
            updates.insert("is_paid".to_string(), json!(is_paid));
        }
        if let Some(paid_until) = request.paid_until {
            updates.insert("paid_until".to_string(), json!(paid_until));
        }
        updates.insert("updated_at".to_string(), json!(Utc::now()));

        let updated: Resource = self
            .db
            .update_by_id_with_json("resource", resource_id, json!(updates))
            .await?
            .ok_or_else(|| AppError::Internal("Failed to update resource".to_string()))?;

        info!("Resource {} updated by admin", resource_id);
        Ok(updated)
    }
}
