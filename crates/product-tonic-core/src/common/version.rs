//! API-version gate.

use crate::{Error, Result};

/// The API version implemented by this service. Echoed in every response.
pub const API_VERSION: &str = "v1";

/// Checks the version a client asked for against [`API_VERSION`].
///
/// An empty string means "use the current version" and always passes.
pub fn check_api(requested: &str) -> Result<()> {
    if requested.is_empty() || requested == API_VERSION {
        return Ok(());
    }
    Err(Error::UnsupportedApi {
        supported: API_VERSION,
        requested: requested.to_string(),
    })
}
