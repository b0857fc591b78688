/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded schema migrations
///
/// Row mapping and queries live with the models; the repository layer in
/// [`crate::repository`] wraps them behind traits.

pub mod migrations;
pub mod pool;
