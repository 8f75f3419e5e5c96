use super::{Codec, ReadSink};
use crate::error::{EncodingError, Result};

/// Self-describing markup format backed by `quick-xml`.
///
/// Every struct field becomes one child element; the root element takes the
/// serde name of the top-level type. Values without a name of their own
/// (bare strings, numbers, sequences) cannot be written as a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn write(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        quick_xml::se::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| EncodingError::encode(self.name(), e))
    }

    fn read(&self, body: &[u8], sink: &mut ReadSink<'_>) -> Result<()> {
        let text = std::str::from_utf8(body).map_err(|e| EncodingError::decode(self.name(), e))?;
        let mut de = quick_xml::de::Deserializer::from_str(text);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        sink(&mut erased).map_err(|e| EncodingError::decode(self.name(), e))
    }
}
