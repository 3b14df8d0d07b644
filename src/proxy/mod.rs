//! 代理节点数据结构
//! 节点保留订阅中的全部原始字段，只额外解析出名称、地址、端口

mod dedupe;
mod extract;

pub use dedupe::{dedupe_nodes, endpoint_key};
pub use extract::extract_nodes;

use serde::ser::{Serialize, Serializer};
use serde_yaml::{Mapping, Value};

/// 测速失败时使用的延迟值（毫秒），排序时总在最后
pub const UNREACHABLE_DELAY: f64 = 9999.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyNode {
    pub name: String,
    pub server: String,
    pub port: u16,
    /// 订阅中的原始记录，字段顺序保持不变
    pub fields: Mapping,
    /// 测速结果（毫秒）
    pub delay: Option<f64>,
}

impl ProxyNode {
    /// 从订阅中的单条记录构建节点；name / server / port 任一缺失或为空则返回 None
    pub fn from_mapping(fields: &Mapping) -> Option<Self> {
        let name = field_name(fields.get("name")?)?;
        let server = match fields.get("server")? {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return None,
        };
        let port = field_port(fields.get("port")?)?;

        // 分组按名称字符串引用节点，数字名称统一改写为字符串
        let mut fields = fields.clone();
        fields.insert(Value::from("name"), Value::from(name.as_str()));

        Some(Self {
            name,
            server,
            port,
            fields,
            delay: None,
        })
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 获取节点地址（server:port）
    pub fn get_address(&self) -> String {
        endpoint_key(&self.server, self.port)
    }

    /// 未测速或测速失败
    pub fn is_unreachable(&self) -> bool {
        self.delay.map_or(true, |d| d == UNREACHABLE_DELAY)
    }

    /// 输出用的 YAML 结构：原始字段 + delay
    pub fn to_yaml(&self) -> Value {
        let mut map = self.fields.clone();
        if let Some(delay) = self.delay {
            map.insert(Value::from("delay"), Value::from(delay));
        }
        Value::Mapping(map)
    }
}

impl Serialize for ProxyNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_yaml().serialize(serializer)
    }
}

fn field_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn field_port(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    match u16::try_from(port) {
        Ok(p) if p != 0 => Some(p),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn test_node(name: &str, server: &str, port: u16) -> ProxyNode {
    let yaml = format!("name: {name}\ntype: ss\nserver: {server}\nport: {port}\ncipher: aes-256-gcm");
    let fields: Mapping = serde_yaml::from_str(&yaml).unwrap();
    ProxyNode::from_mapping(&fields).unwrap()
}
