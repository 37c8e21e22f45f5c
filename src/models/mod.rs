mod address;
mod secret;

pub use address::{ImportIdError, SecretAddress};
pub use secret::{Secret, SecretOverride, ROOT_PATH};
