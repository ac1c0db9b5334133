use crate::{
    error::Result,
    models::category::{Category, CategoryType},
    services::Database,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<Database>,
}

impl CategoryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 目录为空时写入种子分类
    pub async fn seed_defaults(&self) -> Result<()> {
        let existing = self.list().await?;
        if !existing.is_empty() {
            debug!("Categories already seeded ({})", existing.len());
            return Ok(());
        }

        for (slug, name, category_type) in default_categories() {
            let category = Category {
                id: Uuid::new_v4().to_string(),
                slug: slug.to_string(),
                name: name.to_string(),
                category_type,
                resource_count: 0,
            };
            self.db.create::<Category>("category", category).await?;
        }

        info!("Seeded default categories");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let mut response = self
            .db
            .query("SELECT * FROM category ORDER BY name ASC")
            .await?;

        let categories: Vec<Category> = response.take(0)?;
        Ok(categories)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM category WHERE slug = $slug",
                json!({ "slug": slug }),
            )
            .await?;

        let categories: Vec<Category> = response.take(0)?;
        Ok(categories.into_iter().next())
    }
}

/// 种子数据: 五种资源类型各一个根分类
fn default_categories() -> [(&'static str, &'static str, CategoryType); 5] {
    [
        ("channels", "Каналы", CategoryType::Channel),
        ("groups", "Группы", CategoryType::Group),
        ("bots", "Боты", CategoryType::Bot),
        ("stickers", "Стикеры", CategoryType::Sticker),
        ("emoji", "Эмодзи", CategoryType::Emoji),
    ]
}
