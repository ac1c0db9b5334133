use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 已发布的目录条目，由审核通过的提交创建
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(with = "crate::utils::serde_helpers::thing_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub telegram_link: String,
    pub telegram_username: Option<String>,
    pub category_id: String,
    pub subcategory_id: String,
    pub cover_image: String,
    pub is_private: bool,
    pub author_id: String,
    pub author_username: String,
    pub is_paid: bool,
    pub paid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// "活跃付费": is_paid 且 (paid_until 为空即无限期, 或在未来)
    pub fn is_actively_paid(&self, now: DateTime<Utc>) -> bool {
        self.is_paid && self.paid_until.map_or(true, |until| until > now)
    }
}

/// 管理员字段级编辑
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateResourceRequest {
    #[validate(length(min = 1, max = 150, message = "Название должно быть от 1 до 150 символов"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Описание не может превышать 2000 символов"))]
    pub description: Option<String>,

    #[validate(url(message = "Некорректная ссылка"))]
    pub telegram_link: Option<String>,

    pub telegram_username: Option<String>,
    pub cover_image: Option<String>,
    pub subcategory_id: Option<String>,
    pub is_private: Option<bool>,
    pub is_paid: Option<bool>,
    pub paid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceQuery {
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn resource(is_paid: bool, paid_until: Option<DateTime<Utc>>) -> Resource {
        Resource {
            id: "r1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            telegram_link: "https://t.me/test".to_string(),
            telegram_username: Some("test".to_string()),
            category_id: "c1".to_string(),
            subcategory_id: "s1".to_string(),
            cover_image: "https://example.com/cover.png".to_string(),
            is_private: false,
            author_id: "1".to_string(),
            author_username: "author".to_string(),
            is_paid,
            paid_until,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_actively_paid_with_future_expiry() {
        let now = Utc::now();
        let res = resource(true, Some(now + Duration::days(3)));
        assert!(res.is_actively_paid(now));
    }

    #[test]
    fn test_not_actively_paid_after_expiry() {
        let now = Utc::now();
        let res = resource(true, Some(now - Duration::seconds(1)));
        assert!(!res.is_actively_paid(now));
    }

    #[test]
    fn test_indefinite_paid_is_active() {
        let now = Utc::now();
        let res = resource(true, None);
        assert!(res.is_actively_paid(now));
    }

    #[test]
    fn test_unpaid_is_never_active() {
        let now = Utc::now();
        let res = resource(false, Some(now + Duration::days(3)));
        assert!(!res.is_actively_paid(now));
    }
}
