//! 提交向导机器人: 线性对话流程, 通过 HTTP API 递交申请。
//!
//! 与主服务分开运行, 只依赖公开的 API 端点。

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use teloxide::{
    dispatching::{dialogue, dialogue::InMemStorage, UpdateHandler},
    dptree::deps,
    prelude::*,
    types::{BotCommand, ParseMode, User},
    utils::command::BotCommands,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type SubmitDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "начать подачу заявки")]
    Start,
    #[command(description = "отменить текущую заявку")]
    Cancel,
    #[command(description = "справка")]
    Help,
}

/// 提交草稿, 在对话状态间传递
#[derive(Clone, Debug, Default)]
struct Draft {
    title: String,
    description: String,
    telegram_link: Option<String>,
    telegram_username: Option<String>,
    cover_image: String,
    category_id: String,
    category_name: String,
}

#[derive(Clone, Default)]
enum State {
    #[default]
    Start,
    ReceiveTitle,
    ReceiveDescription {
        draft: Draft,
    },
    ReceiveTarget {
        draft: Draft,
    },
    ReceiveCover {
        draft: Draft,
    },
    ReceiveCategory {
        draft: Draft,
        categories: Vec<CategoryOption>,
    },
    Confirm {
        draft: Draft,
    },
}

/// API 返回的分类 (只取对话需要的字段)
#[derive(Clone, Debug, Deserialize)]
struct CategoryOption {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    data: Vec<CategoryOption>,
}

type ApiError = Box<dyn std::error::Error + Send + Sync>;

/// 目录服务的 HTTP 客户端
#[derive(Clone)]
struct CatalogApi {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl CatalogApi {
    fn new(base_url: String, bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            bot_token,
        }
    }

    /// 用机器人自己的密钥给登录载荷签名, 换取提交用户的凭证。
    /// 机器人持有小部件校验的密钥, 签出的载荷与登录小部件等价。
    async fn login(&self, user: &User) -> Result<String, ApiError> {
        let auth_date = Utc::now().timestamp();

        let mut pairs: Vec<(&str, String)> = vec![
            ("auth_date", auth_date.to_string()),
            ("first_name", user.first_name.clone()),
            ("id", user.id.0.to_string()),
        ];
        if let Some(last_name) = user.last_name.as_ref().filter(|v| !v.is_empty()) {
            pairs.push(("last_name", last_name.clone()));
        }
        if let Some(username) = user.username.as_ref().filter(|v| !v.is_empty()) {
            pairs.push(("username", username.clone()));
        }
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let data_check = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n");

        let secret = Sha256::digest(self.bot_token.as_bytes());
        let mut mac = Hmac::<Sha256>::new_from_slice(&secret)?;
        mac.update(data_check.as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());

        let response = self
            .client
            .post(format!("{}/api/catalog/auth/telegram", self.base_url))
            .json(&json!({
                "id": user.id.0,
                "first_name": user.first_name,
                "last_name": user.last_name,
                "username": user.username,
                "auth_date": auth_date,
                "hash": hash,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("login rejected: {}", response.status()).into());
        }

        let value: serde_json::Value = response.json().await?;
        value
            .pointer("/data/token")
            .and_then(|t| t.as_str())
            .map(String::from)
            .ok_or_else(|| "token missing in login response".into())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryOption>, reqwest::Error> {
        let response: CategoriesResponse = self
            .client
            .get(format!("{}/api/catalog/categories", self.base_url))
            .send()
            .await?
            .json()
            .await?;
        Ok(response.data)
    }

    /// 递交申请, 返回错误消息或 None (成功)
    async fn submit(&self, draft: &Draft, token: &str) -> Result<Option<String>, reqwest::Error> {
        let body = json!({
            "title": draft.title,
            "description": draft.description,
            "telegram_link": draft.telegram_link,
            "telegram_username": draft.telegram_username,
            "cover_image": draft.cover_image,
            "category_id": draft.category_id,
            // 子分类尚未在机器人流程中展开, 沿用根分类
            "subcategory_id": draft.category_id,
        });

        let response = self
            .client
            .post(format!("{}/api/catalog/resources/submit", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(None);
        }

        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| "Сервис временно недоступен".to_string());
        Ok(Some(message))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "catalog_bot=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv::dotenv().ok();
    let token = std::env::var("BOT_TOKEN").expect("BOT_TOKEN must be set");
    let api_url =
        std::env::var("CATALOG_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    info!("Starting submission bot, API at {}", api_url);

    let bot = Bot::new(token.clone());

    if let Err(e) = bot
        .set_my_commands(vec![
            BotCommand::new("start", "начать подачу заявки"),
            BotCommand::new("cancel", "отменить текущую заявку"),
            BotCommand::new("help", "справка"),
        ])
        .await
    {
        warn!("Failed to set bot commands: {}", e);
    }

    let api = CatalogApi::new(api_url, token.clone());

    Dispatcher::builder(bot, schema())
        .dependencies(deps![InMemStorage::<State>::new(), api])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel))
        .branch(case![Command::Help].endpoint(help));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![State::ReceiveTitle].endpoint(receive_title))
        .branch(case![State::ReceiveDescription { draft }].endpoint(receive_description))
        .branch(case![State::ReceiveTarget { draft }].endpoint(receive_target))
        .branch(case![State::ReceiveCover { draft }].endpoint(receive_cover))
        .branch(case![State::ReceiveCategory { draft, categories }].endpoint(receive_category))
        .branch(case![State::Confirm { draft }].endpoint(confirm))
        .branch(dptree::endpoint(fallback));

    dialogue::enter::<Update, InMemStorage<State>, State, _>().branch(message_handler)
}

async fn start(bot: Bot, dialogue: SubmitDialogue, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Добавим ваш ресурс в каталог.\n\nШаг 1 из 5: отправьте название.",
    )
    .await?;
    dialogue.update(State::ReceiveTitle).await?;
    Ok(())
}

async fn cancel(bot: Bot, dialogue: SubmitDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Заявка отменена. /start — начать заново.")
        .await?;
    dialogue.exit().await?;
    Ok(())
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

async fn fallback(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Отправьте /start, чтобы подать заявку на добавление в каталог.",
    )
    .await?;
    Ok(())
}

async fn receive_title(bot: Bot, dialogue: SubmitDialogue, msg: Message) -> HandlerResult {
    let Some(title) = msg.text().map(str::trim).filter(|t| !t.is_empty()) else {
        bot.send_message(msg.chat.id, "Название не может быть пустым, попробуйте ещё раз.")
            .await?;
        return Ok(());
    };

    let draft = Draft {
        title: title.to_string(),
        ..Draft::default()
    };

    bot.send_message(msg.chat.id, "Шаг 2 из 5: отправьте краткое описание.")
        .await?;
    dialogue.update(State::ReceiveDescription { draft }).await?;
    Ok(())
}

async fn receive_description(
    bot: Bot,
    dialogue: SubmitDialogue,
    msg: Message,
    mut draft: Draft,
) -> HandlerResult {
    let Some(description) = msg.text().map(str::trim).filter(|t| !t.is_empty()) else {
        bot.send_message(msg.chat.id, "Описание не может быть пустым.")
            .await?;
        return Ok(());
    };

    draft.description = description.to_string();

    bot.send_message(
        msg.chat.id,
        "Шаг 3 из 5: отправьте ссылку (https://t.me/...) или @имя_пользователя.",
    )
    .await?;
    dialogue.update(State::ReceiveTarget { draft }).await?;
    Ok(())
}

async fn receive_target(
    bot: Bot,
    dialogue: SubmitDialogue,
    msg: Message,
    mut draft: Draft,
) -> HandlerResult {
    let Some(target) = msg.text().map(str::trim).filter(|t| !t.is_empty()) else {
        bot.send_message(msg.chat.id, "Отправьте ссылку или имя пользователя.")
            .await?;
        return Ok(());
    };

    // 链接和用户名互斥, 由前缀判断
    if target.starts_with("http") || target.contains("t.me/") {
        draft.telegram_link = Some(target.to_string());
    } else {
        draft.telegram_username = Some(target.trim_start_matches('@').to_string());
    }

    bot.send_message(
        msg.chat.id,
        "Шаг 4 из 5: отправьте ссылку на обложку (изображение).",
    )
    .await?;
    dialogue.update(State::ReceiveCover { draft }).await?;
    Ok(())
}

async fn receive_cover(
    bot: Bot,
    dialogue: SubmitDialogue,
    msg: Message,
    mut draft: Draft,
    api: CatalogApi,
) -> HandlerResult {
    let Some(cover) = msg.text().map(str::trim).filter(|t| t.starts_with("http")) else {
        bot.send_message(msg.chat.id, "Нужна ссылка на изображение (http...).")
            .await?;
        return Ok(());
    };

    draft.cover_image = cover.to_string();

    let categories = match api.list_categories().await {
        Ok(categories) if !categories.is_empty() => categories,
        Ok(_) | Err(_) => {
            bot.send_message(
                msg.chat.id,
                "Сервис временно недоступен, попробуйте позже.",
            )
            .await?;
            dialogue.exit().await?;
            return Ok(());
        }
    };

    let menu = categories
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.name))
        .collect::<Vec<_>>()
        .join("\n");

    bot.send_message(
        msg.chat.id,
        format!("Шаг 5 из 5: выберите категорию (отправьте номер):\n\n{}", menu),
    )
    .await?;
    dialogue
        .update(State::ReceiveCategory { draft, categories })
        .await?;
    Ok(())
}

async fn receive_category(
    bot: Bot,
    dialogue: SubmitDialogue,
    msg: Message,
    (mut draft, categories): (Draft, Vec<CategoryOption>),
) -> HandlerResult {
    let choice = msg
        .text()
        .and_then(|t| t.trim().parse::<usize>().ok())
        .filter(|n| (1..=categories.len()).contains(n));

    let Some(index) = choice else {
        bot.send_message(
            msg.chat.id,
            format!("Отправьте номер от 1 до {}.", categories.len()),
        )
        .await?;
        return Ok(());
    };

    let category = &categories[index - 1];
    draft.category_id = category.id.clone();
    draft.category_name = category.name.clone();

    let target = draft
        .telegram_link
        .clone()
        .or_else(|| draft.telegram_username.as_ref().map(|u| format!("@{}", u)))
        .unwrap_or_default();

    bot.send_message(
        msg.chat.id,
        format!(
            "Проверьте заявку:\n\n<b>{}</b>\n{}\n{}\nКатегория: {}\n\nОтправить? (да/нет)",
            teloxide::utils::html::escape(&draft.title),
            teloxide::utils::html::escape(&draft.description),
            teloxide::utils::html::escape(&target),
            teloxide::utils::html::escape(&draft.category_name),
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    dialogue.update(State::Confirm { draft }).await?;
    Ok(())
}

async fn confirm(
    bot: Bot,
    dialogue: SubmitDialogue,
    msg: Message,
    draft: Draft,
    api: CatalogApi,
) -> HandlerResult {
    let answer = msg.text().map(|t| t.trim().to_lowercase()).unwrap_or_default();

    if answer != "да" {
        bot.send_message(msg.chat.id, "Заявка отменена. /start — начать заново.")
            .await?;
        dialogue.exit().await?;
        return Ok(());
    }

    let Some(user) = msg.from.as_ref() else {
        bot.send_message(msg.chat.id, "Не удалось определить отправителя.")
            .await?;
        dialogue.exit().await?;
        return Ok(());
    };

    // 先换取该用户的凭证, 提交才会记录真实作者
    let token = match api.login(user).await {
        Ok(token) => token,
        Err(e) => {
            error!("Login for user {} failed: {}", user.id, e);
            bot.send_message(
                msg.chat.id,
                "Сервис временно недоступен, попробуйте позже.",
            )
            .await?;
            dialogue.exit().await?;
            return Ok(());
        }
    };

    match api.submit(&draft, &token).await {
        Ok(None) => {
            info!("Submission sent for user {}", user.id);
            bot.send_message(
                msg.chat.id,
                "Заявка отправлена на модерацию. Спасибо!",
            )
            .await?;
        }
        Ok(Some(message)) => {
            warn!("Submission rejected by API: {}", message);
            bot.send_message(
                msg.chat.id,
                format!("Не удалось отправить заявку: {}", message),
            )
            .await?;
        }
        Err(e) => {
            error!("API request failed: {}", e);
            bot.send_message(
                msg.chat.id,
                "Сервис временно недоступен, попробуйте позже.",
            )
            .await?;
        }
    }

    dialogue.exit().await?;
    Ok(())
}
