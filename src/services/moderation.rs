use crate::{
    error::{AppError, Result},
    models::{resource::Resource, submission::Submission},
    services::{publisher::PublisherService, Database},
    utils::validation,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 空拒绝原因的占位符
const DEFAULT_REJECTION_REASON: &str = "Причина не указана";

// 事务内THROW的哨兵值, 映射回业务错误
const ERR_SUBMISSION_NOT_FOUND: &str = "SUBMISSION_NOT_FOUND";
const ERR_SUBMISSION_NOT_PENDING: &str = "SUBMISSION_NOT_PENDING";

/// 审核引擎: pending → approved | rejected, 单向转换
#[derive(Clone)]
pub struct ModerationService {
    db: Arc<Database>,
    publisher: PublisherService,
}

impl ModerationService {
    pub fn new(db: Arc<Database>, publisher: PublisherService) -> Self {
        Self { db, publisher }
    }

    /// 待审核的提交, 最新的在前
    pub async fn list_pending(&self) -> Result<Vec<Submission>> {
        let mut response = self
            .db
            .query(
                r#"
                SELECT * FROM submission
                WHERE status = 'pending'
                ORDER BY created_at DESC
                "#,
            )
            .await?;

        let submissions: Vec<Submission> = response.take(0)?;
        Ok(submissions)
    }

    /// 批准提交并创建资源
    ///
    /// 外部频道发布是尽力而为的: 失败只记录日志, 不回滚批准。
    pub async fn approve(
        &self,
        submission_id: &str,
        moderator_id: &str,
        moderator_username: &str,
    ) -> Result<Resource> {
        let submission: Submission = self
            .db
            .get_by_id("submission", submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Заявка не найдена".to_string()))?;

        submission.status.ensure_pending()?;

        let now = Utc::now();
        let resource = Resource {
            id: Uuid::new_v4().to_string(),
            title: submission.title.clone(),
            description: submission.description.clone(),
            telegram_link: resolve_link(&submission)?,
            telegram_username: submission
                .telegram_username
                .as_deref()
                .map(validation::normalize_username),
            category_id: submission.category_id.clone(),
            subcategory_id: submission.subcategory_id.clone(),
            cover_image: submission.cover_image.clone(),
            is_private: submission.is_private,
            author_id: submission.author_id.clone(),
            author_username: submission.author_username.clone(),
            is_paid: false,
            paid_until: None,
            created_at: now,
            updated_at: now,
        };

        // 资源创建和状态翻转在同一事务内, 两者要么都发生要么都不发生
        let response = self
            .db
            .query_with_params(
                &approve_transaction_sql(),
                json!({
                    "submission_id": submission_id
                        .strip_prefix("submission:")
                        .unwrap_or(submission_id),
                    "resource": resource,
                    "moderator_id": moderator_id,
                    "moderator": moderator_username,
                }),
            )
            .await
            .map_err(map_transition_error)?;

        response
            .check()
            .map_err(|e| map_transition_error(AppError::from(e)))?;

        let created = resource;

        // 分类计数器: 尽力而为, 与资源创建不在一个事务内
        if let Err(e) = self.bump_category_count(&created.category_id).await {
            warn!(
                "Failed to bump resource_count for category {}: {}",
                created.category_id, e
            );
        }

        // 频道发布失败不能影响批准结果
        let publisher = self.publisher.clone();
        let published = created.clone();
        tokio::spawn(async move {
            if let Err(e) = publisher.publish_resource(&published).await {
                warn!(
                    "Channel publication failed for resource {}: {}",
                    published.id, e
                );
            }
        });

        info!(
            "Submission {} approved by {} → resource {}",
            submission_id, moderator_id, created.id
        );

        Ok(created)
    }

    /// 拒绝提交
    pub async fn reject(
        &self,
        submission_id: &str,
        moderator_id: &str,
        moderator_username: &str,
        reason: Option<String>,
    ) -> Result<Submission> {
        let submission: Submission = self
            .db
            .get_by_id("submission", submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Заявка не найдена".to_string()))?;

        submission.status.ensure_pending()?;

        let reason = normalize_reason(reason);

        // 带条件的更新: 只有仍然 pending 的提交才会被翻转
        let mut response = self
            .db
            .query_with_params(
                r#"
                UPDATE type::thing('submission', $submission_id) MERGE {
                    status: 'rejected',
                    rejection_reason: $reason,
                    moderated_by_id: $moderator_id,
                    moderated_by: $moderator,
                    moderated_at: time::now()
                } WHERE status = 'pending' RETURN AFTER
                "#,
                json!({
                    "submission_id": submission_id
                        .strip_prefix("submission:")
                        .unwrap_or(submission_id),
                    "reason": reason,
                    "moderator_id": moderator_id,
                    "moderator": moderator_username,
                }),
            )
            .await?;

        let rejected: Vec<Submission> = response.take(0)?;
        let updated = rejected
            .into_iter()
            .next()
            .ok_or_else(|| AppError::InvalidState("Заявка уже обработана".to_string()))?;

        info!("Submission {} rejected by {}", submission_id, moderator_id);
        Ok(updated)
    }

    async fn bump_category_count(&self, category_id: &str) -> Result<()> {
        debug!("Incrementing resource_count for category {}", category_id);
        self.db
            .query_with_params(
                "UPDATE type::thing('category', $id) SET resource_count += 1",
                json!({ "id": category_id }),
            )
            .await?;
        Ok(())
    }
}

/// 批准事务: 资源创建与提交状态翻转原子地发生,
/// 状态在事务内重新检查, 并发批准只有一个能通过
fn approve_transaction_sql() -> String {
    format!(
        r#"
        BEGIN TRANSACTION;
        LET $sub = (SELECT * FROM type::thing('submission', $submission_id));
        IF array::len($sub) = 0 {{ THROW '{not_found}'; }};
        IF $sub[0].status != 'pending' {{ THROW '{not_pending}'; }};
        CREATE type::table('resource') CONTENT $resource;
        UPDATE type::thing('submission', $submission_id) MERGE {{
            status: 'approved',
            moderated_by_id: $moderator_id,
            moderated_by: $moderator,
            moderated_at: time::now()
        }};
        COMMIT TRANSACTION;
        "#,
        not_found = ERR_SUBMISSION_NOT_FOUND,
        not_pending = ERR_SUBMISSION_NOT_PENDING,
    )
}

fn map_transition_error(err: AppError) -> AppError {
    let text = err.to_string();
    if text.contains(ERR_SUBMISSION_NOT_PENDING) {
        AppError::InvalidState("Заявка уже обработана".to_string())
    } else if text.contains(ERR_SUBMISSION_NOT_FOUND) {
        AppError::NotFound("Заявка не найдена".to_string())
    } else {
        err
    }
}

/// 资源链接: 明确给出的链接优先, 否则从用户名推导 https://t.me/<username>
fn resolve_link(submission: &Submission) -> Result<String> {
    if let Some(link) = submission.telegram_link.as_ref().filter(|l| !l.is_empty()) {
        return Ok(link.clone());
    }
    if let Some(username) = submission
        .telegram_username
        .as_ref()
        .filter(|u| !u.is_empty())
    {
        return Ok(validation::link_from_username(username));
    }
    Err(AppError::Validation(
        "У заявки нет ни ссылки, ни имени пользователя".to_string(),
    ))
}

/// 空原因替换为占位符, 不允许存空值
fn normalize_reason(reason: Option<String>) -> String {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::SubmissionStatus;

    fn submission(
        link: Option<&str>,
        username: Option<&str>,
        status: SubmissionStatus,
    ) -> Submission {
        Submission {
            id: "s1".to_string(),
            title: "Test channel".to_string(),
            description: String::new(),
            telegram_link: link.map(String::from),
            telegram_username: username.map(String::from),
            cover_image: "https://example.com/cover.png".to_string(),
            category_id: "c1".to_string(),
            subcategory_id: "sub1".to_string(),
            is_private: false,
            author_id: "1".to_string(),
            author_username: "author".to_string(),
            status,
            created_at: Utc::now(),
            moderated_by_id: None,
            moderated_by: None,
            moderated_at: None,
            rejection_reason: None,
        }
    }

    #[test]
    fn test_link_derived_from_username() {
        let s = submission(None, Some("durov"), SubmissionStatus::Pending);
        assert_eq!(resolve_link(&s).unwrap(), "https://t.me/durov");
    }

    #[test]
    fn test_explicit_link_wins_over_username() {
        let s = submission(
            Some("https://t.me/+invite123"),
            Some("durov"),
            SubmissionStatus::Pending,
        );
        assert_eq!(resolve_link(&s).unwrap(), "https://t.me/+invite123");
    }

    #[test]
    fn test_link_requires_username_or_link() {
        let s = submission(None, None, SubmissionStatus::Pending);
        assert!(resolve_link(&s).is_err());
    }

    #[test]
    fn test_empty_reason_gets_placeholder() {
        assert_eq!(normalize_reason(None), DEFAULT_REJECTION_REASON);
        assert_eq!(normalize_reason(Some(String::new())), DEFAULT_REJECTION_REASON);
        assert_eq!(normalize_reason(Some("   ".to_string())), DEFAULT_REJECTION_REASON);
        assert_eq!(normalize_reason(Some("Спам".to_string())), "Спам");
    }

    #[test]
    fn test_approve_script_creates_and_flips_atomically() {
        let sql = approve_transaction_sql();
        assert!(sql.contains("BEGIN TRANSACTION"));
        assert!(sql.contains("COMMIT TRANSACTION"));
        assert!(sql.contains("CREATE type::table('resource')"));
        assert!(sql.contains("UPDATE type::thing('submission', $submission_id)"));
        assert!(sql.contains(ERR_SUBMISSION_NOT_FOUND));
        assert!(sql.contains(ERR_SUBMISSION_NOT_PENDING));
    }

    #[test]
    fn test_transition_error_mapping() {
        let not_pending = AppError::Internal(format!(
            "An error occurred: {}",
            ERR_SUBMISSION_NOT_PENDING
        ));
        assert!(matches!(
            map_transition_error(not_pending),
            AppError::InvalidState(_)
        ));

        let not_found = AppError::Internal(format!(
            "An error occurred: {}",
            ERR_SUBMISSION_NOT_FOUND
        ));
        assert!(matches!(
            map_transition_error(not_found),
            AppError::NotFound(_)
        ));

        let other = AppError::Internal("boom".to_string());
        assert!(matches!(map_transition_error(other), AppError::Internal(_)));
    }

    #[test]
    fn test_moderated_submission_cannot_transition_again() {
        let approved = submission(None, Some("durov"), SubmissionStatus::Approved);
        assert!(matches!(
            approved.status.ensure_pending(),
            Err(AppError::InvalidState(_))
        ));

        let rejected = submission(None, Some("durov"), SubmissionStatus::Rejected);
        assert!(matches!(
            rejected.status.ensure_pending(),
            Err(AppError::InvalidState(_))
        ));
    }
}
