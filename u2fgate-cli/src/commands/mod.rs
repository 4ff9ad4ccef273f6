pub mod authenticate;
pub mod register;
pub mod validate;
