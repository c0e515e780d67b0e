/// Database models for userdir
///
/// # Models
///
/// - `user`: user directory entries
///
/// Models carry their own SQL; the `store` module is what the rest of the
/// system talks to.

pub mod user;
