//! Control messages exchanged between a [`ControlProxy`](crate::ControlProxy)
//! and a [`RenderingHost`](crate::RenderingHost).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Set,
    Get,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Set => "set",
            Verb::Get => "get",
        }
    }
}

/// What a message addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prop {
    /// Instance type selector of a "create".
    Instance(u32),
    Param,
    /// Binary property slot forwarded to the module's `on_message`.
    Slot(u32),
    Manifest,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum LoadStatus {
    Ready,
    Error { reason: String },
}

impl LoadStatus {
    pub fn error(reason: impl Into<String>) -> Self {
        LoadStatus::Error {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadStatus::Ready)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Empty,
    Code(String),
    Param { key: u32, value: f64 },
    Binary(Vec<u8>),
    Text(String),
    Status(LoadStatus),
}

/// Tagged envelope carried by the transport in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: MessageKind,
    pub verb: Verb,
    pub prop: Prop,
    pub payload: Payload,
}

impl Envelope {
    pub fn request(verb: Verb, prop: Prop, payload: Payload) -> Self {
        Self {
            kind: MessageKind::Request,
            verb,
            prop,
            payload,
        }
    }

    pub fn response(verb: Verb, prop: Prop, payload: Payload) -> Self {
        Self {
            kind: MessageKind::Response,
            verb,
            prop,
            payload,
        }
    }

    pub fn create(instance_type: u32, code: String) -> Self {
        Self::request(Verb::Create, Prop::Instance(instance_type), Payload::Code(code))
    }

    pub fn set_param(key: u32, value: f64) -> Self {
        Self::request(Verb::Set, Prop::Param, Payload::Param { key, value })
    }

    pub fn set_binary(slot: u32, data: Vec<u8>) -> Self {
        Self::request(Verb::Set, Prop::Slot(slot), Payload::Binary(data))
    }

    pub fn get(prop: Prop) -> Self {
        Self::request(Verb::Get, prop, Payload::Empty)
    }

    /// Answer to the "create" of `instance_type`.
    pub fn status(instance_type: u32, status: LoadStatus) -> Self {
        Self::response(
            Verb::Create,
            Prop::Instance(instance_type),
            Payload::Status(status),
        )
    }

    pub fn is_request(&self) -> bool {
        self.kind == MessageKind::Request
    }

    pub fn is_response(&self) -> bool {
        self.kind == MessageKind::Response
    }

    /// The load status carried by a "create" response.
    pub fn load_status(&self) -> Option<&LoadStatus> {
        match (&self.kind, &self.payload) {
            (MessageKind::Response, Payload::Status(status)) => Some(status),
            _ => None,
        }
    }
}
