pub mod guards;
pub mod routes;

pub use guards::{
    evaluate, guard_navigation, redirect_for_session_expiry, require_admin, require_admin_fetching,
    require_auth, require_guest, Guard, Navigation, Redirect,
};
pub use routes::{Route, RouteName, DEFAULT_TITLE};
