mod event;
mod photo;
mod session;
mod user;

pub use event::*;
pub use photo::*;
pub use session::*;
pub use user::*;
