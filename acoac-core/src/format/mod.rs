/*!
File formats: the native `.aabac` instance format and a translator from
`.arbac` (ARBAC administrative role-based access control, restricted to
a single `role` attribute) into it.

Both parsers build an [`Instance`](crate::model::Instance) directly;
neither grammar aims for byte-for-byte parity with any external tool's
format -- only for the information the rest of the pipeline needs.
*/

pub mod aabac;
pub mod arbac;

pub use aabac::{parse_aabac, write_aabac};
pub use arbac::parse_arbac;

use std::path::Path;

use crate::error::{AcoacError, InputError};
use crate::model::Instance;

/// Dispatch on file extension, as `coachecker`'s driver does, to the
/// matching parser. `.arbac` and `.mohawk` are both ARBAC syntax and share
/// a parser; only `.aabac` is native ACoAC syntax.
pub fn read_instance(path: &Path) -> Result<Instance, AcoacError> {
    let contents = std::fs::read_to_string(path).map_err(InputError::Io)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("aabac") => aabac::parse_aabac(&contents),
        Some("arbac") | Some("mohawk") => arbac::parse_arbac(&contents),
        other => Err(InputError::UnrecognizedExtension(other.unwrap_or("").to_string()).into()),
    }
}
