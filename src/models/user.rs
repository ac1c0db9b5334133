use serde::{Deserialize, Serialize};

/// Telegram 登录小部件回调的字段
/// https://core.telegram.org/widgets/login#receiving-authorization-data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramAuthPayload {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl TelegramAuthPayload {
    /// 显示用户名: 优先 username, 否则 first_name
    pub fn display_username(&self) -> String {
        self.username
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.first_name.clone())
    }
}
