pub mod form;
pub mod validation;

pub use form::FormData;
pub use validation::{validate_form, FormValidation};
