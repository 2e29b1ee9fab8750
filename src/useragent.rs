//! User-agent tokenization.
//!
//! Raw user-agent headers are long, attacker-controlled strings; the
//! detection core only ever sees a fixed-length token of one. The host
//! tokenizes the header when building a [`LoginContext`], and request
//! filters tokenize again before querying the user-agent registry.
//!
//! [`LoginContext`]: crate::login::LoginContext

use sha1::{Digest, Sha1};
use std::fmt::Write;

/// Tokenizer mapping a raw user-agent header to a stable token.
///
/// # Example
///
/// ```rust
/// use breakwater::useragent::UserAgentTokenizer;
///
/// let tokenizer = UserAgentTokenizer::sha1();
/// let token = tokenizer.tokenize("Mozilla/5.0 (X11; Linux x86_64)");
/// assert_eq!(token.len(), 40);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UserAgentTokenizer;

impl UserAgentTokenizer {
    /// SHA-1 based tokenizer producing lowercase hex tokens.
    #[must_use]
    pub fn sha1() -> Self {
        Self
    }

    /// Tokenize a raw user-agent header value.
    #[must_use]
    pub fn tokenize(&self, user_agent: &str) -> String {
        let digest = Sha1::digest(user_agent.as_bytes());

        let mut token = String::with_capacity(digest.len() * 2);
        for byte in digest {
            // Writing into a String cannot fail
            let _ = write!(token, "{:02x}", byte);
        }
        token
    }
}
