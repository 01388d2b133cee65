//! 消息通道类型定义
//!
//! 这些类型在后端和手持客户端之间共享，
//! 用于进程内（内存）和网络（TCP）通信。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// Channel event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 握手消息（携带认证令牌）
    Handshake = 0,
    /// 客户端指令（期待一次确认）
    Command = 1,
    /// 指令确认
    Ack = 2,
    /// 服务端推送（无确认）
    Push = 3,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::Command),
            2 => Ok(EventType::Ack),
            3 => Ok(EventType::Push),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::Command => write!(f, "command"),
            EventType::Ack => write!(f, "ack"),
            EventType::Push => write!(f, "push"),
        }
    }
}

/// 通道消息体
///
/// `correlation_id` 仅在 Ack 中出现，等于对应 Command 的 `request_id`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub correlation_id: Option<Uuid>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            correlation_id: None,
            payload,
        }
    }

    /// 设置关联 ID (用于 Ack 响应)
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// 创建握手消息
    pub fn handshake(payload: &HandshakePayload) -> Self {
        Self::new(
            EventType::Handshake,
            serde_json::to_vec(payload).expect("Failed to serialize handshake payload"),
        )
    }

    /// 创建指令消息
    pub fn command(payload: &CommandPayload) -> Self {
        Self::new(
            EventType::Command,
            serde_json::to_vec(payload).expect("Failed to serialize command payload"),
        )
    }

    /// 创建确认消息 (服务端 -> 发起指令的客户端)
    pub fn ack(payload: &AckPayload, correlation_id: Uuid) -> Self {
        Self::new(
            EventType::Ack,
            serde_json::to_vec(payload).expect("Failed to serialize ack payload"),
        )
        .with_correlation_id(correlation_id)
    }

    /// 创建推送消息 (服务端 -> 所有客户端)
    pub fn push(payload: &PushPayload) -> Self {
        Self::new(
            EventType::Push,
            serde_json::to_vec(payload).expect("Failed to serialize push payload"),
        )
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_message_creation() {
        let msg = BusMessage::command(&CommandPayload {
            action: CommandAction::CreateOrder,
            params: None,
        });

        assert_eq!(msg.event_type, EventType::Command);
        assert!(!msg.request_id.is_nil());
        assert!(msg.correlation_id.is_none());

        let parsed: CommandPayload = msg.parse_payload().unwrap();
        assert_eq!(parsed.action, CommandAction::CreateOrder);
    }

    #[test]
    fn test_ack_correlates_to_command() {
        let command = BusMessage::command(&CommandPayload {
            action: CommandAction::UpdateOrder,
            params: Some(serde_json::json!({"id": "o1"})),
        });

        let ack = BusMessage::ack(&AckPayload::ok(None), command.request_id);
        assert_eq!(ack.event_type, EventType::Ack);
        assert_eq!(ack.correlation_id, Some(command.request_id));

        let parsed: AckPayload = ack.parse_payload().unwrap();
        assert!(parsed.ok);
    }

    #[test]
    fn test_handshake_message() {
        let payload = HandshakePayload {
            version: PROTOCOL_VERSION,
            authentication: "jwt-token".to_string(),
            client_name: Some("test-client".to_string()),
            client_version: Some("0.1.0".to_string()),
        };

        let msg = BusMessage::handshake(&payload);
        assert_eq!(msg.event_type, EventType::Handshake);

        let parsed: HandshakePayload = msg.parse_payload().unwrap();
        assert_eq!(parsed.version, PROTOCOL_VERSION);
        assert_eq!(parsed.authentication, "jwt-token");
    }

    #[test]
    fn test_event_type_roundtrip() {
        for raw in 0u8..=3 {
            let event_type = EventType::try_from(raw).unwrap();
            assert_eq!(event_type as u8, raw);
        }
        assert!(EventType::try_from(42).is_err());
    }
}
