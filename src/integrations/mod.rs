//! External service integrations.

pub mod registry {
    pub use crate::registry::*;
    pub use crate::registry_client::*;
}

pub mod webhook_models {
    pub use crate::webhook_models::*;
}
