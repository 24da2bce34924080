// Public auth handlers: token acquisition only. Everything else lives
// behind the authorization pipeline.

pub mod login;
pub mod refresh;

pub use login::{login, platform_login};
pub use refresh::{platform_refresh, refresh};
