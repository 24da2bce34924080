pub mod cookie;

pub use cookie::{
    clear_refresh_cookie, read_refresh_cookie, set_refresh_cookie, CookieAttributes, SameSite,
    REFRESH_COOKIE_NAME,
};
