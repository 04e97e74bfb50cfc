//! Request extractors shared by the routes.

pub mod acting_user;

pub use acting_user::ActingUser;
