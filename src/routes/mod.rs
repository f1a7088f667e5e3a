/// Router Module Index
///
/// The site has two access levels, each with its own router:
///
/// - `public`: read-only content pages, open to everyone.
/// - `admin`: everything under `/admin`. Every request gets a visitor session;
///   all but the login, setup and logout endpoints also pass the admin guard.
pub mod admin;
pub mod public;
