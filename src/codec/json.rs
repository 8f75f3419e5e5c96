use super::{Codec, ReadSink};
use crate::error::{EncodingError, Result};

/// Self-describing text format backed by `serde_json`.
///
/// Field names come from the serde attributes of the message type.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| EncodingError::encode(self.name(), e))
    }

    fn read(&self, body: &[u8], sink: &mut ReadSink<'_>) -> Result<()> {
        let mut de = serde_json::Deserializer::from_slice(body);
        {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
            sink(&mut erased).map_err(|e| EncodingError::decode(self.name(), e))?;
        }
        de.end().map_err(|e| EncodingError::decode(self.name(), e))
    }
}
