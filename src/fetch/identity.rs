//! Client identity rotation.
//!
//! Every attempt presents a User-Agent picked from a pool. The pool is
//! read-only and shared between adapters.

use rand::seq::SliceRandom;

/// Realistic desktop browser identities.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.67",
];

/// Source of client identity strings.
pub trait IdentityPool: Send + Sync {
    /// Identity to present on the next attempt.
    fn pick(&self) -> String;
}

/// Picks uniformly at random from a fixed list.
#[derive(Debug, Clone)]
pub struct RandomIdentityPool {
    agents: Vec<String>,
}

impl RandomIdentityPool {
    pub fn new(agents: Vec<String>) -> Self {
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for RandomIdentityPool {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect())
    }
}

impl IdentityPool for RandomIdentityPool {
    fn pick(&self) -> String {
        self.agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string())
    }
}

/// Always presents the same identity. Used by tests and by sources that
/// require a registered client name.
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub String);

impl IdentityPool for FixedIdentity {
    fn pick(&self) -> String {
        self.0.clone()
    }
}
