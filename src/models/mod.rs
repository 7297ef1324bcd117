pub mod card;
pub mod owned;
pub mod user;

pub use card::*;
pub use owned::*;
pub use user::*;
