use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 用户提交的目录条目，等待审核
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    #[serde(with = "crate::utils::serde_helpers::thing_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub telegram_link: Option<String>,
    pub telegram_username: Option<String>,
    pub cover_image: String,
    pub category_id: String,
    pub subcategory_id: String,
    pub is_private: bool,
    pub author_id: String,
    pub author_username: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub moderated_by_id: Option<String>,
    pub moderated_by: Option<String>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}


impl SubmissionStatus {
    /// 状态转换是单向的: pending → approved | rejected
    pub fn ensure_pending(&self) -> Result<()> {
        match self {
            Self::Pending => Ok(()),
            Self::Approved => Err(AppError::invalid_state("Заявка уже одобрена")),
            Self::Rejected => Err(AppError::invalid_state("Заявка уже отклонена")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    #[validate(length(min = 1, max = 150, message = "Название должно быть от 1 до 150 символов"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Описание не может превышать 2000 символов"))]
    pub description: Option<String>,

    pub telegram_link: Option<String>,
    pub telegram_username: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectSubmissionRequest {
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_is_one_way() {
        assert!(SubmissionStatus::Pending.ensure_pending().is_ok());
        assert!(matches!(
            SubmissionStatus::Approved.ensure_pending(),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            SubmissionStatus::Rejected.ensure_pending(),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::Rejected).unwrap(),
            "\"rejected\""
        );
    }
}
