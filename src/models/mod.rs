pub mod donation;
pub mod session;
pub mod user;

pub use donation::{Donation, NewDonation};
pub use session::Session;
pub use user::User;
