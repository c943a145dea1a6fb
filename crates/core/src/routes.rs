//! Navigable views and how paths map onto them.

use std::fmt;

use crate::resources::PinCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    /// Guest book entered with a PIN from a shared link. The raw segment
    /// is kept; it is validated when the view verifies it.
    Guest(String),
    Dashboard,
    Calendar,
    Notices,
    Documents,
    Messages,
    GuestBook,
    Profile,
    NotFound(String),
}

impl Route {
    /// Where authenticated users land, and where under-privileged ones are
    /// sent back to.
    pub const DEFAULT: Route = Route::Dashboard;

    /// Resolve a path. `/` answers the default route.
    pub fn parse(path: &str) -> Route {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self::DEFAULT,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["guest", pin] => Route::Guest((*pin).to_string()),
            ["dashboard"] => Route::Dashboard,
            ["calendar"] => Route::Calendar,
            ["notices"] => Route::Notices,
            ["documents"] => Route::Documents,
            ["messages"] => Route::Messages,
            ["guestbook"] => Route::GuestBook,
            ["profile"] => Route::Profile,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn guest(pin: &PinCode) -> Route {
        Route::Guest(pin.as_str().to_string())
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Guest(pin) => format!("/guest/{pin}"),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Calendar => "/calendar".to_string(),
            Route::Notices => "/notices".to_string(),
            Route::Documents => "/documents".to_string(),
            Route::Messages => "/messages".to_string(),
            Route::GuestBook => "/guestbook".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    /// Whether the view needs a signed-in session. The not-found page is
    /// static and renders for anyone.
    pub fn is_protected(&self) -> bool {
        !matches!(
            self,
            Route::Login | Route::Register | Route::Guest(_) | Route::NotFound(_)
        )
    }

    /// Permission a route additionally demands. Every page is open to any
    /// member today; actions inside pages are gated instead.
    pub fn required_permission(&self) -> Option<&'static str> {
        None
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
