//! pulse-protocol
//!
//! Wire-level encoding/decoding for the pulse generator link.
//!
//! The link carries no framing or checksums of its own, only:
//! - fixed 4-byte coordinate frames (host → device, echoed back), and
//! - single status bytes from a fixed alphabet (both directions).
//!
//! - [`wire_types`]  : status alphabet and frame constants
//! - [`frame_codec`] : coordinate frame encode/decode, status classification

pub mod wire_types;
pub mod frame_codec;

pub use wire_types::{StatusCode, COORDINATE_MAX, FRAME_LEN};

pub use frame_codec::{
    CodecError,
    Frame,
    axis_value,
    classify_status,
    decode_echo,
    encode_coordinates,
    hex_bytes,
};
