pub mod email;
pub mod templates;
