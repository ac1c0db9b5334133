use crate::error::{AppError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// 验证 Telegram 用户名格式 (@ 前缀可选)
pub fn validate_telegram_username(username: &str) -> Result<()> {
    let name = username.trim().trim_start_matches('@');

    if name.is_empty() {
        return Err(AppError::Validation(
            "Имя пользователя не может быть пустым".to_string(),
        ));
    }

    static USERNAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = USERNAME_RE.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{4,31}$").unwrap());

    if !re.is_match(name) {
        return Err(AppError::Validation(
            "Некорректное имя пользователя Telegram".to_string(),
        ));
    }

    Ok(())
}

/// 验证 Telegram 链接: t.me / telegram.me, 含邀请链接 (t.me/+hash, t.me/joinchat/...)
pub fn validate_telegram_link(link: &str) -> Result<()> {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    let re = LINK_RE.get_or_init(|| {
        Regex::new(r"^https?://(t\.me|telegram\.me)/(\+[a-zA-Z0-9_-]+|joinchat/[a-zA-Z0-9_-]+|addstickers/[a-zA-Z0-9_]+|addemoji/[a-zA-Z0-9_]+|[a-zA-Z][a-zA-Z0-9_]{3,31})/?$").unwrap()
    });

    if !re.is_match(link.trim()) {
        return Err(AppError::Validation(
            "Некорректная ссылка на Telegram".to_string(),
        ));
    }

    Ok(())
}

/// 规范化用户名: 去掉 @ 前缀和空白
pub fn normalize_username(username: &str) -> String {
    username.trim().trim_start_matches('@').to_string()
}

/// 从用户名生成公开链接
pub fn link_from_username(username: &str) -> String {
    format!("https://t.me/{}", normalize_username(username))
}

/// 从链接中提取用户名 (邀请链接没有用户名)
pub fn username_from_link(link: &str) -> Option<String> {
    let trimmed = link.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))?;
    let path = without_scheme
        .strip_prefix("t.me/")
        .or_else(|| without_scheme.strip_prefix("telegram.me/"))?;

    let candidate = path.trim_end_matches('/');
    if candidate.starts_with('+')
        || candidate.starts_with("joinchat/")
        || candidate.starts_with("addstickers/")
        || candidate.starts_with("addemoji/")
        || candidate.contains('/')
    {
        return None;
    }

    Some(candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_telegram_username() {
        assert!(validate_telegram_username("durov").is_ok());
        assert!(validate_telegram_username("@durov").is_ok());
        assert!(validate_telegram_username("some_bot_42").is_ok());

        assert!(validate_telegram_username("").is_err());
        assert!(validate_telegram_username("abc").is_err()); // слишком короткое
        assert!(validate_telegram_username("1starts_with_digit").is_err());
        assert!(validate_telegram_username("has space").is_err());
        assert!(validate_telegram_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_telegram_link() {
        assert!(validate_telegram_link("https://t.me/durov").is_ok());
        assert!(validate_telegram_link("http://telegram.me/durov").is_ok());
        assert!(validate_telegram_link("https://t.me/+AbCdEf123").is_ok());
        assert!(validate_telegram_link("https://t.me/joinchat/AbCdEf123").is_ok());
        assert!(validate_telegram_link("https://t.me/addstickers/CoolPack").is_ok());
        assert!(validate_telegram_link("https://t.me/addemoji/CoolEmoji").is_ok());

        assert!(validate_telegram_link("https://example.com/durov").is_err());
        assert!(validate_telegram_link("t.me/durov").is_err());
        assert!(validate_telegram_link("https://t.me/").is_err());
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("@durov"), "durov");
        assert_eq!(normalize_username("  durov  "), "durov");
    }

    #[test]
    fn test_link_from_username() {
        assert_eq!(link_from_username("@durov"), "https://t.me/durov");
        assert_eq!(link_from_username("durov"), "https://t.me/durov");
    }

    #[test]
    fn test_username_from_link() {
        assert_eq!(
            username_from_link("https://t.me/durov"),
            Some("durov".to_string())
        );
        assert_eq!(
            username_from_link("https://telegram.me/durov/"),
            Some("durov".to_string())
        );
        assert_eq!(username_from_link("https://t.me/+AbCdEf123"), None);
        assert_eq!(username_from_link("https://t.me/joinchat/AbCdEf123"), None);
        assert_eq!(username_from_link("https://example.com/durov"), None);
    }
}
