pub mod auth;
pub mod category;
pub mod session;
pub mod swagger_main;
pub mod task;
pub mod user;

#[cfg(test)]
pub mod test_util;
