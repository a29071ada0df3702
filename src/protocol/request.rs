//! Request definitions
//!
//! Represents requests from clients.

use serde::{Deserialize, Serialize};

use crate::recordlog::Record;

/// Request frame tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestKind {
    Get = 0x01,
    Set = 0x02,
    List = 0x03,
    Remove = 0x04,
}

impl RequestKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(RequestKind::Get),
            0x02 => Some(RequestKind::Set),
            0x03 => Some(RequestKind::List),
            0x04 => Some(RequestKind::Remove),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

/// A key-value pair on the wire (Set request body, List stream item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub key: String,
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Look up the effective value of a key
    Get(GetRequest),

    /// Append a key-value pair
    Set(KeyValuePair),

    /// Stream every record in log order
    List(ListRequest),

    /// Remove a key (unsupported)
    Remove(RemoveRequest),
}

impl Request {
    pub fn get(key: impl Into<String>) -> Self {
        Request::Get(GetRequest { key: key.into() })
    }

    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Request::Set(KeyValuePair {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn list() -> Self {
        Request::List(ListRequest {})
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Request::Remove(RemoveRequest { key: key.into() })
    }

    /// Get the request kind
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Get(_) => RequestKind::Get,
            Request::Set(_) => RequestKind::Set,
            Request::List(_) => RequestKind::List,
            Request::Remove(_) => RequestKind::Remove,
        }
    }
}

impl From<Record> for KeyValuePair {
    fn from(record: Record) -> Self {
        Self {
            key: record.key,
            value: record.value,
        }
    }
}

impl From<KeyValuePair> for Record {
    fn from(pair: KeyValuePair) -> Self {
        Record::new(pair.key, pair.value)
    }
}
