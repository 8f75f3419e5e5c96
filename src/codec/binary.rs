use super::{Codec, ReadSink};
use crate::error::{EncodingError, Result};

/// Compact binary format backed by `postcard`.
///
/// The encoding carries no field names or type tags, so both ends must agree
/// on the exact message and error types. It cannot skip data it does not
/// understand, which is why an error payload is only read when its type is
/// registered locally. Bytes left after the top-level value are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        "postcard"
    }

    fn write(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        postcard::to_allocvec(value).map_err(|e| EncodingError::encode(self.name(), e))
    }

    fn read(&self, body: &[u8], sink: &mut ReadSink<'_>) -> Result<()> {
        let mut de = postcard::Deserializer::from_bytes(body);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        sink(&mut erased).map_err(|e| EncodingError::decode(self.name(), e))
    }
}
