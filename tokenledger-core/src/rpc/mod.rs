//! JSON-RPC 2.0 error envelopes for the remote tool surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{LedgerError, LedgerResult};

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl RpcErrorCode {
    pub fn code(&self) -> i32 {
        match self {
            RpcErrorCode::ParseError => -32700,
            RpcErrorCode::InvalidRequest => -32600,
            RpcErrorCode::MethodNotFound => -32601,
            RpcErrorCode::InvalidParams => -32602,
            RpcErrorCode::InternalError => -32603,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RpcErrorCode::ParseError => "Parse error",
            RpcErrorCode::InvalidRequest => "Invalid Request",
            RpcErrorCode::MethodNotFound => "Method not found",
            RpcErrorCode::InvalidParams => "Invalid params",
            RpcErrorCode::InternalError => "Internal error",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -32700 => Some(RpcErrorCode::ParseError),
            -32600 => Some(RpcErrorCode::InvalidRequest),
            -32601 => Some(RpcErrorCode::MethodNotFound),
            -32602 => Some(RpcErrorCode::InvalidParams),
            -32603 => Some(RpcErrorCode::InternalError),
            _ => None,
        }
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

impl From<&LedgerError> for RpcErrorCode {
    fn from(err: &LedgerError) -> Self {
        match err {
            LedgerError::ValidationError(_) | LedgerError::InvalidConfigValue { .. } => {
                RpcErrorCode::InvalidParams
            }
            LedgerError::LlmClassUnspecified { .. }
            | LedgerError::LlmClassUnrecognized { .. }
            | LedgerError::LlmPolicyNotRegistered(_) => RpcErrorCode::InvalidRequest,
            e if e.is_config_error() => RpcErrorCode::InvalidRequest,
            _ => RpcErrorCode::InternalError,
        }
    }
}

/// A JSON-RPC request id: a number, a string or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

impl<T: Into<RequestId>> From<Option<T>> for RequestId {
    fn from(id: Option<T>) -> Self {
        id.map(Into::into).unwrap_or(RequestId::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolErrorEnvelope {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: RpcErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolErrorResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolErrorEnvelope {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: ToolErrorResult,
}

/// Protocol-level error reply. The message is the code's label, followed by
/// `extra` when one is given.
pub fn protocol_error(
    id: impl Into<RequestId>,
    code: RpcErrorCode,
    extra: Option<&str>,
) -> ProtocolErrorEnvelope {
    let message = match extra {
        Some(extra) => format!("{}: {}", code.label(), extra),
        None => code.label().to_string(),
    };
    ProtocolErrorEnvelope {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: id.into(),
        error: RpcErrorBody {
            code: code.code(),
            message,
        },
    }
}

/// Protocol-level error reply for a library error.
pub fn protocol_error_from(id: impl Into<RequestId>, err: &LedgerError) -> ProtocolErrorEnvelope {
    let message = err.to_string();
    protocol_error(id, RpcErrorCode::from(err), Some(&message))
}

/// Successful reply carrying a tool failure as text.
pub fn tool_error(id: impl Into<RequestId>, text: impl Into<String>) -> ToolErrorEnvelope {
    ToolErrorEnvelope {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: id.into(),
        result: ToolErrorResult {
            content: vec![TextContent {
                content_type: "text".to_string(),
                text: text.into(),
            }],
            is_error: true,
        },
    }
}

pub fn to_value<T: Serialize>(envelope: &T) -> LedgerResult<Value> {
    Ok(serde_json::to_value(envelope)?)
}
