use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== Commands ====================

/// 客户端指令标识 (客户端 -> 服务端, 期待一次 Ack)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandAction {
    CreateOrder,
    UpdateOrder,
    UpdateOrderDetail,
    RemoveOrderDetail,
    CreateBill,
}

impl fmt::Display for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateOrder => write!(f, "createOrder"),
            Self::UpdateOrder => write!(f, "updateOrder"),
            Self::UpdateOrderDetail => write!(f, "updateOrderDetail"),
            Self::RemoveOrderDetail => write!(f, "removeOrderDetail"),
            Self::CreateBill => write!(f, "createBill"),
        }
    }
}

/// 指令载荷
///
/// # 示例
/// - `action`: "updateOrderDetail"
/// - `params`: `{ "orderId": "o1", "detailId": "d2", "qtyDelivered": 1 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    /// 操作标识
    pub action: CommandAction,
    /// 操作参数 (可选的 JSON 对象)
    pub params: Option<serde_json::Value>,
}

/// 指令确认载荷 (服务端 -> 发起指令的客户端)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckPayload {
    /// 是否成功
    pub ok: bool,
    /// 响应数据 (可选)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// 响应消息/错误描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl AckPayload {
    pub fn ok(data: Option<serde_json::Value>) -> Self {
        Self {
            ok: true,
            data,
            msg: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            msg: Some(msg.into()),
        }
    }
}

// ==================== Push Events ====================

/// 推送事件标识 (服务端 -> 所有客户端, 无确认)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PushEvent {
    NewOrder,
    UpdateOrder,
    OrderDeleted,
    BillCreated,
}

impl fmt::Display for PushEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewOrder => write!(f, "newOrder"),
            Self::UpdateOrder => write!(f, "updateOrder"),
            Self::OrderDeleted => write!(f, "orderDeleted"),
            Self::BillCreated => write!(f, "billCreated"),
        }
    }
}

/// 推送载荷
///
/// 当某个订单发生变更时（由某个客户端的指令触发），服务端向所有
/// 已连接客户端广播此载荷，包括发起指令的客户端本身。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPayload {
    /// 事件标识
    pub event: PushEvent,
    /// 资源数据 (deleted 时仅携带 `{ "id": ... }`)
    pub data: Option<serde_json::Value>,
    /// 附加消息 (可选)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

// ==================== Handshake ====================

/// 握手载荷 (客户端 -> 服务端, 连接后的第一帧)
///
/// 令牌作为连接级别的认证头携带，而不是业务消息的一部分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// 协议版本
    pub version: u16,
    /// 当前会话的 JWT 令牌
    pub authentication: String,
    /// 客户端名称/标识
    pub client_name: Option<String>,
    /// 客户端版本
    pub client_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_action_wire_names() {
        let json = serde_json::to_string(&CommandAction::UpdateOrderDetail).unwrap();
        assert_eq!(json, "\"updateOrderDetail\"");
        assert_eq!(CommandAction::CreateBill.to_string(), "createBill");
    }

    #[test]
    fn test_push_event_wire_names() {
        let json = serde_json::to_string(&PushEvent::OrderDeleted).unwrap();
        assert_eq!(json, "\"orderDeleted\"");

        let parsed: PushEvent = serde_json::from_str("\"newOrder\"").unwrap();
        assert_eq!(parsed, PushEvent::NewOrder);
    }

    #[test]
    fn test_ack_constructors() {
        let ok = AckPayload::ok(Some(serde_json::json!({"id": "o1"})));
        assert!(ok.ok);
        assert!(ok.msg.is_none());

        let err = AckPayload::error("table already taken");
        assert!(!err.ok);
        assert_eq!(err.msg.as_deref(), Some("table already taken"));
    }
}
