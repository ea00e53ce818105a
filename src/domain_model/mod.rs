mod friend;
mod repair;
mod user;

pub use friend::*;
pub use repair::*;
pub use user::*;
