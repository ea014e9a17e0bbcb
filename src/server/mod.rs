mod admin;
pub mod dto;
mod general;
pub mod response;
mod router;
pub mod user;
pub mod validation;

pub use admin::admin_router;
pub use general::general_router;
pub use router::{AppState, REQUEST_ID_HEADER, create_router};
pub use user::user_router;
