pub mod client;
pub mod control;
pub mod member;
pub mod user;

pub use client::Client;
pub use control::{ClientControl, ControlMatchText};
pub use member::{ClientMember, Membership};
pub use user::User;
