use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 广告位购买记录 (只追加, 创建后不可变)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSlotPurchase {
    #[serde(with = "crate::utils::serde_helpers::thing_id")]
    pub id: String,
    pub user_id: String,
    pub resource_id: String,
    pub category_id: String,
    pub duration_days: u32,
    pub price: u64,
    pub status: PurchaseStatus,
    pub payment_id: String,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Completed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseAdSlotRequest {
    pub category_id: String,
    pub resource_id: String,

    #[validate(range(
        min = 1,
        max = 365,
        message = "Срок размещения должен быть от 1 до 365 дней"
    ))]
    pub duration_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(duration_days: u32) -> PurchaseAdSlotRequest {
        PurchaseAdSlotRequest {
            category_id: "c1".to_string(),
            resource_id: "r1".to_string(),
            duration_days,
        }
    }

    #[test]
    fn test_duration_is_bounded() {
        assert!(request(0).validate().is_err());
        assert!(request(1).validate().is_ok());
        assert!(request(365).validate().is_ok());
        assert!(request(366).validate().is_err());
        // 溢出级别的值在到期日计算之前就被拒绝
        assert!(request(u32::MAX).validate().is_err());
    }
}
