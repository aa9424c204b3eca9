//! Controllers shipped with the binary.

mod users;

pub use users::{CreateUserRequest, UpdateUserRequest, User, UsersController};
