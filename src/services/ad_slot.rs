use crate::{
    error::{AppError, Result},
    models::{
        category::{Category, CategoryType},
        purchase::{AdSlotPurchase, PurchaseAdSlotRequest, PurchaseStatus},
        resource::Resource,
    },
    services::Database,
};
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

// 事务内THROW的哨兵值, 映射回业务错误
const ERR_CAPACITY: &str = "AD_SLOT_CAPACITY";
const ERR_ALREADY_PAID: &str = "AD_SLOT_ALREADY_PAID";
const ERR_NOT_FOUND: &str = "AD_SLOT_RESOURCE_NOT_FOUND";

#[derive(Clone)]
pub struct AdSlotService {
    db: Arc<Database>,
}

impl AdSlotService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 分类内当前活跃的付费资源数
    pub async fn active_paid_count(&self, category_id: &str) -> Result<u32> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                SELECT count() AS total FROM resource
                WHERE category_id = $category_id
                AND is_paid = true
                AND (paid_until = NONE OR paid_until > time::now())
                GROUP ALL
                "#,
                json!({ "category_id": category_id }),
            )
            .await?;

        let counts: Vec<serde_json::Value> = response.take(0)?;
        Ok(counts
            .first()
            .and_then(|v| v["total"].as_u64())
            .unwrap_or(0) as u32)
    }

    /// 购买广告位
    ///
    /// 容量检查、已付费检查、资源更新和购买记录写入在同一个
    /// SurrealDB 事务内完成, 并发购买同一分类不会超出容量上限。
    pub async fn purchase(
        &self,
        user_id: &str,
        request: &PurchaseAdSlotRequest,
    ) -> Result<AdSlotPurchase> {
        request.validate().map_err(AppError::ValidatorError)?;

        // 容量先行检查 (事务内会重新评估)
        let active = self.active_paid_count(&request.category_id).await?;
        if capacity_reached(active, self.db.config.ad_slots_per_category) {
            return Err(AppError::CapacityExceeded(
                "Все рекламные места в этой категории заняты".to_string(),
            ));
        }

        // 所有权/分类一致性在事务外先行检查, 给出精确的错误
        let resource: Resource = self
            .db
            .get_by_id("resource", &request.resource_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ресурс не найден".to_string()))?;

        if resource.author_id != user_id {
            return Err(AppError::Authorization(
                "Вы не являетесь владельцем этого ресурса".to_string(),
            ));
        }
        if resource.category_id != request.category_id {
            return Err(AppError::Validation(
                "Ресурс не принадлежит указанной категории".to_string(),
            ));
        }

        let now = Utc::now();
        if resource.is_actively_paid(now) {
            return Err(AppError::Conflict(
                "Ресурс уже размещён платно".to_string(),
            ));
        }

        let category: Category = self
            .db
            .get_by_id("category", &request.category_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Категория не найдена".to_string()))?;

        let price = compute_price(category.category_type, request.duration_days);
        let expires_at = now + Duration::days(i64::from(request.duration_days));

        let purchase = AdSlotPurchase {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            resource_id: resource.id.clone(),
            category_id: request.category_id.clone(),
            duration_days: request.duration_days,
            price,
            status: PurchaseStatus::Completed,
            payment_id: generate_payment_reference(),
            purchased_at: now,
            expires_at,
        };

        let response = self
            .db
            .query_with_params(
                &purchase_transaction_sql(),
                json!({
                    "resource_id": request.resource_id,
                    "category_id": request.category_id,
                    "max_slots": self.db.config.ad_slots_per_category,
                    "expires_at": expires_at,
                    "purchase": purchase,
                }),
            )
            .await
            .map_err(map_transaction_error)?;

        // THROW 的哨兵不会让 query 返回 Err, 只能通过 check() 读出
        response
            .check()
            .map_err(|e| map_transaction_error(AppError::from(e)))?;

        info!(
            "Ad slot purchased: resource {} in category {} for {} days, price {}",
            request.resource_id, request.category_id, request.duration_days, price
        );

        self.db
            .get_by_id("ad_slot_purchase", &purchase.id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to record purchase".to_string()))
    }

    /// 清除已过期的付费标记 (后台任务; 活跃性总是按 now 计算,
    /// 这里只是让存储的标记与事实一致)
    pub async fn expire_paid_slots(&self) -> Result<u64> {
        let mut response = self
            .db
            .query(
                r#"
                UPDATE resource SET is_paid = false, updated_at = time::now()
                WHERE is_paid = true
                AND paid_until != NONE
                AND paid_until <= time::now()
                "#,
            )
            .await?;

        let expired: Vec<serde_json::Value> = response.take(0)?;
        if !expired.is_empty() {
            debug!("Expired {} paid slot(s)", expired.len());
        }
        Ok(expired.len() as u64)
    }
}

/// 价格 = 基础价 * 天数 * (1 - 折扣); 相同输入总是产生相同结果
pub fn compute_price(category_type: CategoryType, duration_days: u32) -> u64 {
    let base = category_type.base_daily_price();
    let gross = base * u64::from(duration_days);
    let discount_pct = discount_percent(duration_days);
    gross - gross * u64::from(discount_pct) / 100
}

/// 折扣档位, 按天数
pub fn discount_percent(duration_days: u32) -> u8 {
    match duration_days {
        0..=2 => 0,
        3..=6 => 5,
        7..=13 => 10,
        14..=29 => 15,
        _ => 20,
    }
}

/// 模拟支付网关的支付凭据
fn generate_payment_reference() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("SIM-{}-{}", Utc::now().timestamp(), suffix)
}

/// 分类容量判定
pub fn capacity_reached(active_count: u32, max_slots: u32) -> bool {
    active_count >= max_slots
}

/// 购买事务: 容量与付费状态在事务内重新评估, THROW 中止整个事务
fn purchase_transaction_sql() -> String {
    format!(
        r#"
        BEGIN TRANSACTION;
        LET $res = (SELECT * FROM type::thing('resource', $resource_id));
        IF array::len($res) = 0 {{ THROW '{not_found}'; }};
        LET $current = $res[0];
        IF $current.is_paid = true
            AND ($current.paid_until = NONE OR $current.paid_until > time::now())
            {{ THROW '{already_paid}'; }};
        LET $active = (SELECT count() AS total FROM resource
            WHERE category_id = $category_id
            AND is_paid = true
            AND (paid_until = NONE OR paid_until > time::now())
            GROUP ALL);
        IF array::len($active) > 0 AND $active[0].total >= $max_slots
            {{ THROW '{capacity}'; }};
        UPDATE type::thing('resource', $resource_id) MERGE {{
            is_paid: true,
            paid_until: $expires_at,
            updated_at: time::now()
        }};
        CREATE type::table('ad_slot_purchase') CONTENT $purchase;
        COMMIT TRANSACTION;
        "#,
        not_found = ERR_NOT_FOUND,
        already_paid = ERR_ALREADY_PAID,
        capacity = ERR_CAPACITY,
    )
}

fn map_transaction_error(err: AppError) -> AppError {
    let text = err.to_string();
    if text.contains(ERR_CAPACITY) {
        AppError::CapacityExceeded(
            "Все рекламные места в этой категории заняты".to_string(),
        )
    } else if text.contains(ERR_ALREADY_PAID) {
        AppError::Conflict("Ресурс уже размещён платно".to_string())
    } else if text.contains(ERR_NOT_FOUND) {
        AppError::NotFound("Ресурс не найден".to_string())
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_tiers() {
        assert_eq!(discount_percent(1), 0);
        assert_eq!(discount_percent(2), 0);
        assert_eq!(discount_percent(3), 5);
        assert_eq!(discount_percent(6), 5);
        assert_eq!(discount_percent(7), 10);
        assert_eq!(discount_percent(13), 10);
        assert_eq!(discount_percent(14), 15);
        assert_eq!(discount_percent(29), 15);
        assert_eq!(discount_percent(30), 20);
        assert_eq!(discount_percent(365), 20);
    }

    #[test]
    fn test_price_channel_30_days() {
        // 500 * 30 * 0.8 = 12000
        assert_eq!(compute_price(CategoryType::Channel, 30), 12_000);
    }

    #[test]
    fn test_price_no_discount_short_run() {
        assert_eq!(compute_price(CategoryType::Emoji, 1), 200);
        assert_eq!(compute_price(CategoryType::Group, 2), 800);
    }

    #[test]
    fn test_price_mid_tiers() {
        // 300 * 5 * 0.95 = 1425
        assert_eq!(compute_price(CategoryType::Bot, 5), 1_425);
        // 250 * 7 * 0.9 = 1575
        assert_eq!(compute_price(CategoryType::Sticker, 7), 1_575);
        // 500 * 14 * 0.85 = 5950
        assert_eq!(compute_price(CategoryType::Channel, 14), 5_950);
    }

    #[test]
    fn test_price_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(
                compute_price(CategoryType::Channel, 30),
                compute_price(CategoryType::Channel, 30)
            );
        }
    }

    fn paid_resource(paid_until: Option<chrono::DateTime<Utc>>) -> Resource {
        Resource {
            id: Uuid::new_v4().to_string(),
            title: "Test".to_string(),
            description: String::new(),
            telegram_link: "https://t.me/test".to_string(),
            telegram_username: None,
            category_id: "c1".to_string(),
            subcategory_id: "s1".to_string(),
            cover_image: "https://example.com/cover.png".to_string(),
            is_private: false,
            author_id: "1".to_string(),
            author_username: "author".to_string(),
            is_paid: true,
            paid_until,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_fourth_purchase_blocked_at_capacity() {
        assert!(!capacity_reached(0, 3));
        assert!(!capacity_reached(2, 3));
        assert!(capacity_reached(3, 3));
        assert!(capacity_reached(4, 3));
    }

    #[test]
    fn test_slot_frees_after_expiry() {
        let now = Utc::now();
        let resources = vec![
            paid_resource(Some(now + Duration::days(2))),
            paid_resource(Some(now + Duration::days(5))),
            paid_resource(Some(now + Duration::days(9))),
        ];

        let active = resources.iter().filter(|r| r.is_actively_paid(now)).count() as u32;
        assert!(capacity_reached(active, 3));

        // 一个位置到期后, 第四次购买可以通过
        let later = now + Duration::days(3);
        let active = resources
            .iter()
            .filter(|r| r.is_actively_paid(later))
            .count() as u32;
        assert!(!capacity_reached(active, 3));
    }

    #[test]
    fn test_purchase_script_rechecks_inside_transaction() {
        let sql = purchase_transaction_sql();
        assert!(sql.contains("BEGIN TRANSACTION"));
        assert!(sql.contains("COMMIT TRANSACTION"));
        assert!(sql.contains(ERR_NOT_FOUND));
        assert!(sql.contains(ERR_ALREADY_PAID));
        assert!(sql.contains(ERR_CAPACITY));
        assert!(sql.contains("$active[0].total >= $max_slots"));
    }

    #[test]
    fn test_transaction_error_mapping() {
        let capacity = AppError::Internal(format!("An error occurred: {}", ERR_CAPACITY));
        assert!(matches!(
            map_transaction_error(capacity),
            AppError::CapacityExceeded(_)
        ));

        let paid = AppError::Internal(format!("An error occurred: {}", ERR_ALREADY_PAID));
        assert!(matches!(map_transaction_error(paid), AppError::Conflict(_)));

        let other = AppError::Internal("boom".to_string());
        assert!(matches!(map_transaction_error(other), AppError::Internal(_)));
    }
}
