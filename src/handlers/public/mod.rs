pub mod health;
pub mod login;
pub mod token;

pub use health::health;
pub use login::{login_auth, login_form, logout};
pub use token::token_get;
