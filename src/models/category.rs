use serde::{Deserialize, Serialize};

/// 目录分类 (静态参考数据)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(with = "crate::utils::serde_helpers::thing_id")]
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub resource_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Channel,
    Group,
    Bot,
    Sticker,
    Emoji,
}

impl CategoryType {
    /// 每日基础价格 (货币单位/天)
    pub fn base_daily_price(&self) -> u64 {
        match self {
            Self::Channel => 500,
            Self::Group => 400,
            Self::Bot => 300,
            Self::Sticker => 250,
            Self::Emoji => 200,
        }
    }

    /// 该类型是否通过用户名或链接提交
    pub fn accepts_username(&self) -> bool {
        matches!(self, Self::Channel | Self::Group | Self::Bot)
    }

}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Channel => "channel",
            Self::Group => "group",
            Self::Bot => "bot",
            Self::Sticker => "sticker",
            Self::Emoji => "emoji",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_daily_price() {
        assert_eq!(CategoryType::Channel.base_daily_price(), 500);
        assert_eq!(CategoryType::Group.base_daily_price(), 400);
        assert_eq!(CategoryType::Bot.base_daily_price(), 300);
        assert_eq!(CategoryType::Sticker.base_daily_price(), 250);
        assert_eq!(CategoryType::Emoji.base_daily_price(), 200);
    }

    #[test]
    fn test_accepts_username() {
        assert!(CategoryType::Channel.accepts_username());
        assert!(CategoryType::Group.accepts_username());
        assert!(CategoryType::Bot.accepts_username());
        assert!(!CategoryType::Sticker.accepts_username());
        assert!(!CategoryType::Emoji.accepts_username());
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CategoryType::Sticker).unwrap(),
            "\"sticker\""
        );
    }
}
