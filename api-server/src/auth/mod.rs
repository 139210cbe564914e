pub mod guard;
pub mod password;
pub mod session;
pub mod users;
