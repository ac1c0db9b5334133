use crate::{
    config::Config,
    error::{AppError, Result},
    models::{category::CategoryType, resource::Resource},
    services::Database,
};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// 频道发布服务: 把批准的资源推送到对应类型的 Telegram 频道。
/// 调用方负责吞掉错误: 发布失败绝不影响审核结果。
#[derive(Clone)]
pub struct PublisherService {
    config: Config,
    db: Arc<Database>,
    http_client: Client,
}

impl PublisherService {
    pub fn new(config: &Config, db: Arc<Database>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            db,
            http_client,
        })
    }

    pub async fn publish_resource(&self, resource: &Resource) -> Result<()> {
        let category: crate::models::category::Category = self
            .db
            .get_by_id("category", &resource.category_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Category {} not found", resource.category_id))
            })?;

        let Some(channel_id) = self.channel_for(category.category_type) else {
            debug!(
                "No publish channel configured for type {}, skipping",
                category.category_type
            );
            return Ok(());
        };

        let caption = format_post(resource, &category.name);

        // 有封面图时用 sendPhoto, 否则 sendMessage
        let (method, body) = if resource.cover_image.starts_with("http") {
            (
                "sendPhoto",
                json!({
                    "chat_id": channel_id,
                    "photo": resource.cover_image,
                    "caption": caption,
                    "parse_mode": "HTML",
                }),
            )
        } else {
            (
                "sendMessage",
                json!({
                    "chat_id": channel_id,
                    "text": caption,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": false,
                }),
            )
        };

        let url = format!(
            "https://api.telegram.org/bot{}/{}",
            self.config.bot_token, method
        );

        let response = self.http_client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Telegram API returned {}: {}",
                status, text
            )));
        }

        info!(
            "Published resource {} to channel {}",
            resource.id, channel_id
        );
        Ok(())
    }

    fn channel_for(&self, category_type: CategoryType) -> Option<&str> {
        match category_type {
            CategoryType::Channel => self.config.publish_channel_channels.as_deref(),
            CategoryType::Group => self.config.publish_channel_groups.as_deref(),
            CategoryType::Bot => self.config.publish_channel_bots.as_deref(),
            CategoryType::Sticker => self.config.publish_channel_stickers.as_deref(),
            CategoryType::Emoji => self.config.publish_channel_emoji.as_deref(),
        }
    }
}

fn format_post(resource: &Resource, category_name: &str) -> String {
    let mut text = format!(
        "<b>{}</b>\n\n{}\n\n{}",
        html_escape(&resource.title),
        html_escape(&resource.description),
        resource.telegram_link,
    );
    text.push_str(&format!("\n\n#{}", category_name.replace(' ', "_")));
    text
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_post_escapes_html() {
        let resource = Resource {
            id: "r1".to_string(),
            title: "Rust <3".to_string(),
            description: "news & updates".to_string(),
            telegram_link: "https://t.me/rustlang".to_string(),
            telegram_username: Some("rustlang".to_string()),
            category_id: "c1".to_string(),
            subcategory_id: "s1".to_string(),
            cover_image: String::new(),
            is_private: false,
            author_id: "1".to_string(),
            author_username: "author".to_string(),
            is_paid: false,
            paid_until: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let post = format_post(&resource, "Каналы");
        assert!(post.contains("Rust &lt;3"));
        assert!(post.contains("news &amp; updates"));
        assert!(post.contains("https://t.me/rustlang"));
        assert!(post.contains("#Каналы"));
    }
}
