use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::TelegramAuthPayload,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    Extension, RequestPartsExt, TypedHeader,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// 登录小部件数据的最大有效期
const AUTH_DATA_MAX_AGE_SECS: i64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct AuthService {
    config: Config,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Telegram ID
    pub username: String,
    pub role: String,     // "user" | "admin"
    pub iat: i64,
    pub exp: i64,
}

/// 已认证的用户, 从Bearer凭证中提取
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 验证 Telegram 登录小部件的数据
    ///
    /// 校验串: 除 hash 外所有非空字段, 按键名排序, `key=value` 换行连接。
    /// 密钥: SHA-256(bot token)。比较 HMAC-SHA256 摘要 (恒定时间)。
    pub fn verify_telegram_auth(&self, payload: &TelegramAuthPayload) -> Result<()> {
        let age = Utc::now().timestamp() - payload.auth_date;
        if age > AUTH_DATA_MAX_AGE_SECS {
            warn!("Rejecting stale telegram auth data (age: {}s)", age);
            return Err(AppError::Authentication(
                "Данные авторизации устарели, войдите заново".to_string(),
            ));
        }

        let data_check = data_check_string(payload);
        let secret = Sha256::digest(self.config.bot_token.as_bytes());

        let mut mac = HmacSha256::new_from_slice(&secret)
            .map_err(|_| AppError::Internal("HMAC key error".to_string()))?;
        mac.update(data_check.as_bytes());

        // hex比较不区分大小写: 解码后按字节恒定时间比较
        let provided = hex::decode(payload.hash.to_lowercase()).map_err(|_| {
            AppError::Authentication("Недействительные данные авторизации".to_string())
        })?;

        mac.verify_slice(&provided).map_err(|_| {
            warn!("Telegram auth hash mismatch for user {}", payload.id);
            AppError::Authentication("Недействительные данные авторизации".to_string())
        })?;

        debug!("Telegram auth verified for user {}", payload.id);
        Ok(())
    }

    /// 签发JWT (有符号的Bearer凭证)
    pub fn issue_token(&self, payload: &TelegramAuthPayload) -> Result<(AuthUser, String)> {
        let role = if self.config.is_admin(payload.id) {
            "admin"
        } else {
            "user"
        };

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: payload.id.to_string(),
            username: payload.display_username(),
            role: role.to_string(),
            iat: now,
            exp: now + self.config.jwt_expiry_hours * 3600,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )?;

        let user = AuthUser {
            id: claims.sub.clone(),
            username: claims.username.clone(),
            role: claims.role.clone(),
        };

        Ok((user, token))
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_ref());
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                debug!("JWT token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("JWT verification failed: {}", e);
                Err(AppError::Authentication(
                    "Недействительный или просроченный токен".to_string(),
                ))
            }
        }
    }
}

/// 构造校验串: 非空字段按键名字母序, `key=value`, 换行连接
fn data_check_string(payload: &TelegramAuthPayload) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        ("auth_date", payload.auth_date.to_string()),
        ("first_name", payload.first_name.clone()),
        ("id", payload.id.to_string()),
    ];

    if let Some(last_name) = payload.last_name.as_ref().filter(|v| !v.is_empty()) {
        pairs.push(("last_name", last_name.clone()));
    }
    if let Some(username) = payload.username.as_ref().filter(|v| !v.is_empty()) {
        pairs.push(("username", username.clone()));
    }
    if let Some(photo_url) = payload.photo_url.as_ref().filter(|v| !v.is_empty()) {
        pairs.push(("photo_url", photo_url.clone()));
    }

    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

// Axum extractor for authentication
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| {
                AppError::Authentication("Требуется авторизация".to_string())
            })?;

        let Extension(auth_service): Extension<Arc<AuthService>> = parts
            .extract::<Extension<Arc<AuthService>>>()
            .await
            .map_err(|_| {
                AppError::Internal("Auth service not found in request extensions".to_string())
            })?;

        let claims = auth_service.verify_jwt(bearer.token())?;

        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        })
    }
}

// Optional authentication extractor
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(OptionalAuthUser(Some(user))),
            Err(_) => Ok(OptionalAuthUser(None)),
        }
    }
}

/// 仅管理员可用的提取器 (角色包含在凭证中)
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AppError::Authorization(
                "Требуются права администратора".to_string(),
            ));
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
            database_url: "http://localhost:8000".to_string(),
            database_namespace: "test".to_string(),
            database_name: "test".to_string(),
            database_username: "root".to_string(),
            database_password: "root".to_string(),
            bot_token: "110201543:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw".to_string(),
            admin_telegram_ids: vec![42],
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            publish_channel_channels: None,
            publish_channel_groups: None,
            publish_channel_bots: None,
            publish_channel_stickers: None,
            publish_channel_emoji: None,
            max_title_length: 150,
            max_description_length: 2000,
            default_resources_per_page: 20,
            ad_slots_per_category: 3,
            paid_slot_sweep_interval: 3600,
            cors_allowed_origins: "*".to_string(),
        }
    }

    fn payload(auth_date: i64) -> TelegramAuthPayload {
        TelegramAuthPayload {
            id: 42,
            first_name: "Павел".to_string(),
            last_name: None,
            username: Some("durov".to_string()),
            photo_url: None,
            auth_date,
            hash: String::new(),
        }
    }

    /// 按小部件协议给载荷签名
    fn sign(payload: &mut TelegramAuthPayload, bot_token: &str) {
        let secret = Sha256::digest(bot_token.as_bytes());
        let mut mac = HmacSha256::new_from_slice(&secret).unwrap();
        mac.update(data_check_string(payload).as_bytes());
        payload.hash = hex::encode(mac.finalize().into_bytes());
    }

    #[test]
    fn test_data_check_string_sorted_and_skips_empty() {
        let p = payload(1700000000);
        assert_eq!(
            data_check_string(&p),
            "auth_date=1700000000\nfirst_name=Павел\nid=42\nusername=durov"
        );

        let mut with_photo = p.clone();
        with_photo.photo_url = Some("https://t.me/i/userpic/durov.jpg".to_string());
        with_photo.last_name = Some(String::new()); // 空字段不参与校验串
        assert_eq!(
            data_check_string(&with_photo),
            "auth_date=1700000000\nfirst_name=Павел\nid=42\nphoto_url=https://t.me/i/userpic/durov.jpg\nusername=durov"
        );
    }

    #[test]
    fn test_verify_accepts_valid_payload() {
        let config = test_config();
        let service = AuthService::new(&config);

        let mut p = payload(Utc::now().timestamp());
        sign(&mut p, &config.bot_token);

        assert!(service.verify_telegram_auth(&p).is_ok());
    }

    #[test]
    fn test_verify_is_case_insensitive_on_hash() {
        let config = test_config();
        let service = AuthService::new(&config);

        let mut p = payload(Utc::now().timestamp());
        sign(&mut p, &config.bot_token);
        p.hash = p.hash.to_uppercase();

        assert!(service.verify_telegram_auth(&p).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_field() {
        let config = test_config();
        let service = AuthService::new(&config);

        let mut p = payload(Utc::now().timestamp());
        sign(&mut p, &config.bot_token);
        p.first_name = "Eve".to_string(); // hash 保持不变

        assert!(matches!(
            service.verify_telegram_auth(&p),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_verify_rejects_stale_auth_date() {
        let config = test_config();
        let service = AuthService::new(&config);

        // 25小时前: 签名正确但数据已过期
        let mut p = payload(Utc::now().timestamp() - 25 * 3600);
        sign(&mut p, &config.bot_token);

        assert!(matches!(
            service.verify_telegram_auth(&p),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        let config = test_config();
        let service = AuthService::new(&config);

        let mut p = payload(Utc::now().timestamp());
        p.hash = "not-hex".to_string();

        assert!(service.verify_telegram_auth(&p).is_err());
    }

    #[test]
    fn test_jwt_roundtrip_with_admin_role() {
        let config = test_config();
        let service = AuthService::new(&config);

        let p = payload(Utc::now().timestamp());
        let (user, token) = service.issue_token(&p).unwrap();
        assert_eq!(user.role, "admin"); // id 42 在管理员列表中
        assert_eq!(user.username, "durov");

        let claims = service.verify_jwt(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn test_jwt_regular_user_role() {
        let config = test_config();
        let service = AuthService::new(&config);

        let mut p = payload(Utc::now().timestamp());
        p.id = 1000;
        let (user, _) = service.issue_token(&p).unwrap();
        assert_eq!(user.role, "user");
    }

    #[test]
    fn test_jwt_rejects_forged_token() {
        let config = test_config();
        let service = AuthService::new(&config);

        let mut other = test_config();
        other.jwt_secret = "other-secret".to_string();
        let forger = AuthService::new(&other);

        let p = payload(Utc::now().timestamp());
        let (_, token) = forger.issue_token(&p).unwrap();

        assert!(service.verify_jwt(&token).is_err());
    }
}
