pub mod account;
pub mod introspect;
pub mod members;
pub mod signin;
pub mod tokens;
pub mod two_factor;
