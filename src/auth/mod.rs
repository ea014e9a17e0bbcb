mod helpers;
mod middleware;
mod token;

pub use middleware::{AuthError, MaybeUser, RequireAdmin, RequireUser};
pub use token::{TokenGenerator, parse_token};
