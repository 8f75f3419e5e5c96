//! Wire-level protocol pieces: media-type grammar, header parsers, constants.
//!
//! ```text
//! protocol/
//! ├── constants  - Well-known media types, sniff hints, success range
//! ├── media_type - `type/subtype; name=value` grammar
//! └── headers    - Accept / Content-Type parsers
//! ```

pub mod constants;
pub mod headers;
pub mod media_type;

pub use constants::is_success;
pub use headers::{highest, parse_accept, parse_content_type, AcceptEntry, AcceptHeader};
pub use media_type::MediaType;
