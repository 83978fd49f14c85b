//! Protocol module containing the inspector wire messages and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{
    decode_incoming, decode_incoming_value, decode_outgoing, encode_message, encode_value,
    to_transmittable, CodecError,
};
pub use messages::*;
