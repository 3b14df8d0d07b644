//! 订阅文档解析
//! 重复的键以最后一次出现为准，并展开 `<<` 合并键

use crate::error::FetchError;
use serde::de::{self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Number, Value};
use std::fmt;

/// 解析订阅正文
///
/// serde_yaml 默认遇到重复键会让整份文档失败，这里改为后值覆盖前值，
/// 单个节点写错不会连累同一订阅里的其他节点。
pub fn parse_document(body: &str) -> Result<Value, FetchError> {
    let LenientValue(mut document) = LenientValue::deserialize(serde_yaml::Deserializer::from_str(body))?;
    document.apply_merge()?;
    Ok(document)
}

struct LenientValue(Value);

impl<'de> Deserialize<'de> for LenientValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LenientVisitor).map(LenientValue)
    }
}

struct LenientVisitor;

impl<'de> Visitor<'de> for LenientVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(Number::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(Number::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(Number::from(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        LenientValue::deserialize(deserializer).map(|v| v.0)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(LenientValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut mapping = Mapping::new();
        while let Some((LenientValue(key), LenientValue(value))) = map.next_entry()? {
            // 键保持首次出现的位置，值取最后一次
            mapping.insert(key, value);
        }
        Ok(Value::Mapping(mapping))
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Value, A::Error> {
        let (tag, variant): (String, _) = data.variant()?;
        let LenientValue(value) = variant.newtype_variant()?;
        Ok(Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::extract_nodes;

    fn names(body: &str) -> Vec<String> {
        let document = parse_document(body).unwrap();
        extract_nodes(&document)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect()
    }

    #[test]
    fn test_merge_key_fields_are_applied() {
        let body = r#"
base: &b {type: ss, server: 3.3.3.3, port: 443}
proxies:
  - {name: A, type: ss, server: 1.1.1.1, port: 443}
  - {<<: *b, name: M}
"#;
        assert_eq!(names(body), vec!["A", "M"]);

        let document = parse_document(body).unwrap();
        let nodes = extract_nodes(&document).unwrap();
        assert_eq!(nodes[1].get_address(), "3.3.3.3:443");
        assert!(nodes[1].fields.get("<<").is_none());
    }

    #[test]
    fn test_duplicate_key_keeps_last_value() {
        let body = r#"
proxies:
  - {name: A, type: ss, server: 1.1.1.1, port: 443}
  - {name: B, server: 2.2.2.2, port: 443, udp: true, udp: false}
"#;
        assert_eq!(names(body), vec!["A", "B"]);

        let document = parse_document(body).unwrap();
        let nodes = extract_nodes(&document).unwrap();
        assert_eq!(nodes[1].fields.get("udp").and_then(Value::as_bool), Some(false));
        let keys: Vec<&str> = nodes[1].fields.keys().filter_map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["name", "server", "port", "udp"]);
    }

    #[test]
    fn test_scalars_and_tags_preserved() {
        let document = parse_document("a: 1\nb: -2\nc: 1.5\nd: ~\ne: yes-text\nf: !custom 3\ng: [x, true]").unwrap();
        assert_eq!(document["a"].as_u64(), Some(1));
        assert_eq!(document["b"].as_i64(), Some(-2));
        assert_eq!(document["c"].as_f64(), Some(1.5));
        assert!(document["d"].is_null());
        assert_eq!(document["e"].as_str(), Some("yes-text"));
        assert!(matches!(document["f"], Value::Tagged(_)));
        assert_eq!(document["g"][1].as_bool(), Some(true));
    }

    #[test]
    fn test_broken_yaml_is_error() {
        assert!(matches!(
            parse_document("proxies: [unclosed"),
            Err(FetchError::Yaml(_))
        ));
    }
}
