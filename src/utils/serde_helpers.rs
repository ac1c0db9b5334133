//! 用于处理 SurrealDB Thing ID 的序列化/反序列化辅助模块

use serde::{Deserialize, Deserializer, Serializer};

/// 记录ID在写入时是纯字符串 (uuid), SurrealDB 读回时是 Thing 结构。
/// 统一反序列化为不带表前缀的纯ID。
pub mod thing_id {
    use super::*;

    pub fn serialize<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(id)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IdValue {
            String(String),
            Thing {
                #[allow(dead_code)]
                tb: String,
                id: serde_json::Value,
            },
        }

        match IdValue::deserialize(deserializer)? {
            IdValue::String(s) => Ok(strip_table_prefix(&s)),
            IdValue::Thing { id, .. } => Ok(inner_id(&id)),
        }
    }

    fn strip_table_prefix(s: &str) -> String {
        match s.split_once(':') {
            Some((_, id)) => id.trim_matches('`').trim_start_matches('⟨').trim_end_matches('⟩').to_string(),
            None => s.to_string(),
        }
    }

    fn inner_id(id: &serde_json::Value) -> String {
        match id {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            // SDK 将 Id 枚举序列化为 {"String": "..."} 形式
            serde_json::Value::Object(map) => map
                .get("String")
                .and_then(|v| v.as_str())
                .map(String::from)
                .or_else(|| map.get("Number").map(|v| v.to_string()))
                .unwrap_or_else(|| id.to_string()),
            _ => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Record {
        #[serde(with = "super::thing_id")]
        id: String,
    }

    #[test]
    fn test_plain_string_id() {
        let rec: Record = serde_json::from_str(r#"{"id": "abc-123"}"#).unwrap();
        assert_eq!(rec.id, "abc-123");
    }

    #[test]
    fn test_prefixed_string_id() {
        let rec: Record = serde_json::from_str(r#"{"id": "resource:abc-123"}"#).unwrap();
        assert_eq!(rec.id, "abc-123");
    }

    #[test]
    fn test_thing_object_id() {
        let rec: Record =
            serde_json::from_str(r#"{"id": {"tb": "resource", "id": {"String": "abc-123"}}}"#)
                .unwrap();
        assert_eq!(rec.id, "abc-123");
    }
}
