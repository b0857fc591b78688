/// Middleware modules for the API server
///
/// - `session`: the session gate for API routes and HTML pages

pub mod session;
