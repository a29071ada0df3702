//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬──────────┬───────────────────────┐
//! │ Tag (1)  │ Len (4)  │ CRC (4)  │   Payload (bincode)   │
//! └──────────┴──────────┴──────────┴───────────────────────┘
//! ```
//!
//! ### Requests
//! - 0x01: GET    - Payload: GetRequest { key }
//! - 0x02: SET    - Payload: KeyValuePair { key, value }
//! - 0x03: LIST   - Payload: ListRequest {}
//! - 0x04: REMOVE - Payload: RemoveRequest { key }
//!
//! ### Replies
//! - 0x00: UNARY  - Payload: Response (Value | Error)
//! - 0x01: ITEM   - Payload: KeyValuePair (one streamed record)
//! - 0x02: END    - Payload: empty (end of stream)
//! - 0x03: STATUS - Payload: Status { code, message } (transport error)
//!
//! Get, Set and Remove answer with exactly one UNARY or STATUS frame.
//! List answers with any number of ITEM frames closed by END or STATUS.

mod request;
mod response;
mod codec;

pub use request::{GetRequest, KeyValuePair, ListRequest, RemoveRequest, Request, RequestKind};
pub use response::{Reply, ReplyKind, Response, Status, StatusCode};
pub use codec::{
    decode_reply, decode_request, encode_reply, encode_request, read_reply, read_request,
    write_reply, write_request, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
