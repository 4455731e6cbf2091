/// Router Module Index
///
/// Routing is split by access level. The authenticated router is wrapped in
/// the session middleware as a whole, so a route added there can never be
/// reached anonymously by accident.

/// Routes reachable without a session (health, socket placeholder).
pub mod public;

/// Routes behind the `AuthUser` middleware. Group-scoped handlers additionally
/// run the membership guard themselves.
pub mod authenticated;
