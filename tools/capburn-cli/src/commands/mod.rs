pub mod burn;
pub mod check;
pub mod convert;
pub mod shift;
pub mod validate;
