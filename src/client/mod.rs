//! Client-side session lifecycle.
//!
//! [`AuthSession`] owns the current [`AuthState`] and composes a
//! [`TokenStore`] (where the session token lives between runs) with a
//! [`UserFetcher`] (who the token belongs to, according to the server).

pub mod config;
pub mod dev_proxy;
pub mod fetcher;
pub mod session;
pub mod token_store;

pub use config::ClientConfig;
pub use dev_proxy::DevProxyConfig;
pub use fetcher::{FetchError, HttpUserFetcher, UserFetcher};
pub use session::{AuthSession, AuthState, SessionPhase};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
