//! Credentials, session state and the deauthentication hook.

pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use session::{SessionHook, SessionSnapshot, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreConfig};
pub use token::Token;
