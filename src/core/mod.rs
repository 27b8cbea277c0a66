//! # Core Protocol Components
//!
//! Address representation, frame wire layout, payload codec, and the
//! frame cipher.
//!
//! ## Components
//! - **Address**: the 4-byte node address and its two textual forms
//! - **Frame**: the fixed 16-byte header and flag semantics
//! - **Packet**: the tagged binary payload codec
//! - **Cipher**: AES-128-CTR with the per-frame nonce rule
//!
//! ## Wire Format
//! ```text
//! [dest(4)] [src(4)] [msg_id(4)] [flags(4)] [payload(N)]
//! ```

pub mod address;
pub mod cipher;
pub mod frame;
pub mod packet;
