// Command engine and shared errors/models
pub mod dispatcher {
    pub use crate::dispatcher::*;
}

pub mod parsing {
    pub use crate::field_classifier::*;
    pub use crate::normalize::*;
    pub use crate::payment_parser::*;
}

pub mod resolver {
    pub use crate::resolver::*;
}

pub mod operations {
    pub use crate::payments::*;
    pub use crate::upsert::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
