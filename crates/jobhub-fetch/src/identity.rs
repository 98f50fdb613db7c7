use rand::seq::SliceRandom;

/// Desktop user agents rotated between sessions.
pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Browser-like identity presented for one session.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_agent: String,
    pub accept_language: String,
}

impl Identity {
    /// Draw a random identity from the user-agent pool.
    pub fn randomized(accept_language: &str) -> Self {
        let mut rng = rand::thread_rng();
        let user_agent = USER_AGENTS
            .choose(&mut rng)
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        Self {
            user_agent: user_agent.to_string(),
            accept_language: accept_language.to_string(),
        }
    }

    /// Headers sent with every request of the session.
    ///
    /// `Accept-Encoding` is negotiated by the HTTP client so responses are
    /// decompressed transparently.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("User-Agent", self.user_agent.clone()),
            ("Accept-Language", self.accept_language.clone()),
            ("DNT", "1".to_string()),
            ("Connection", "keep-alive".to_string()),
            ("Upgrade-Insecure-Requests", "1".to_string()),
        ]
    }
}
