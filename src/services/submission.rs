use crate::{
    error::{AppError, Result},
    models::{
        category::Category,
        submission::{CreateSubmissionRequest, Submission, SubmissionStatus},
    },
    services::{auth::AuthUser, Database},
    utils::validation,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct SubmissionService {
    db: Arc<Database>,
}

impl SubmissionService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 接收新的提交
    pub async fn create(
        &self,
        caller: Option<&AuthUser>,
        request: CreateSubmissionRequest,
    ) -> Result<Submission> {
        debug!("Creating submission: {}", request.title);

        request.validate().map_err(AppError::ValidatorError)?;

        if request.title.trim().is_empty() {
            return Err(AppError::Validation(
                "Название не может быть пустым".to_string(),
            ));
        }

        let category_id = request
            .category_id
            .as_ref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::Validation("Не указана категория".to_string()))?;
        let subcategory_id = request
            .subcategory_id
            .as_ref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::Validation("Не указана подкатегория".to_string()))?;

        let category: Category = self
            .db
            .get_by_id("category", category_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Категория не найдена".to_string()))?;

        let username = request
            .telegram_username
            .as_ref()
            .filter(|u| !u.trim().is_empty());
        let link = request
            .telegram_link
            .as_ref()
            .filter(|l| !l.trim().is_empty());

        // 频道/群组/机器人: 用户名或链接; 贴纸/表情包: 只接受链接
        if category.category_type.accepts_username() {
            if username.is_none() && link.is_none() {
                return Err(AppError::Validation(
                    "Укажите имя пользователя или ссылку".to_string(),
                ));
            }
        } else if link.is_none() {
            return Err(AppError::Validation(
                "Укажите ссылку на набор".to_string(),
            ));
        }

        if let Some(username) = username {
            validation::validate_telegram_username(username)?;
        }
        if let Some(link) = link {
            validation::validate_telegram_link(link)?;
        }

        let cover_image = request
            .cover_image
            .as_ref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Добавьте обложку".to_string()))?;

        // 作者身份只来自凭证, 载荷中的声明不可信
        let (author_id, author_username) = author_identity(caller);

        // 用户名缺失时尝试从公开链接反推 (邀请链接没有用户名)
        let telegram_username = username
            .map(|u| validation::normalize_username(u))
            .or_else(|| link.and_then(|l| validation::username_from_link(l)));

        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            description: request.description.unwrap_or_default(),
            telegram_link: link.map(|l| l.trim().to_string()),
            telegram_username,
            cover_image: cover_image.clone(),
            category_id: category_id.clone(),
            subcategory_id: subcategory_id.clone(),
            is_private: request.is_private.unwrap_or(false),
            author_id,
            author_username,
            status: SubmissionStatus::Pending,
            created_at: Utc::now(),
            moderated_by_id: None,
            moderated_by: None,
            moderated_at: None,
            rejection_reason: None,
        };

        let created: Submission = self.db.create("submission", submission).await?;

        info!(
            "Submission {} created by {} in category {}",
            created.id, created.author_id, created.category_id
        );
        Ok(created)
    }

    pub async fn get(&self, submission_id: &str) -> Result<Option<Submission>> {
        self.db.get_by_id("submission", submission_id).await
    }

    /// 用户自己的提交, 最新的在前
    pub async fn list_by_author(&self, author_id: &str) -> Result<Vec<Submission>> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                SELECT * FROM submission
                WHERE author_id = $author_id
                ORDER BY created_at DESC
                "#,
                json!({ "author_id": author_id }),
            )
            .await?;

        let submissions: Vec<Submission> = response.take(0)?;
        Ok(submissions)
    }
}

/// 凭证在场时取其身份, 否则记录为匿名
fn author_identity(caller: Option<&AuthUser>) -> (String, String) {
    match caller {
        Some(user) => (user.id.clone(), user.username.clone()),
        None => ("anonymous".to_string(), "anonymous".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_identity_comes_from_credential_only() {
        let user = AuthUser {
            id: "42".to_string(),
            username: "durov".to_string(),
            role: "user".to_string(),
        };
        assert_eq!(
            author_identity(Some(&user)),
            ("42".to_string(), "durov".to_string())
        );
        assert_eq!(
            author_identity(None),
            ("anonymous".to_string(), "anonymous".to_string())
        );
    }
}
