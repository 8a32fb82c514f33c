use unravel_extract::Password;
use unravel_names::DEFAULT_ELIGIBILITY_THRESHOLD;

/// Default upper bound on convergence rounds per folder.
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Behaviour of a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Stored passwords, tried in order.
    pub passwords: Vec<Password>,
    /// Every archive is expected to be protected: skip the empty password.
    pub has_password: bool,
    /// Hand archives that resist every password to the user.
    pub interactive: bool,
    pub max_rounds: usize,
    /// See [`unravel_names::classify`].
    pub eligibility_threshold: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            passwords: Vec::new(),
            has_password: false,
            interactive: false,
            max_rounds: DEFAULT_MAX_ROUNDS,
            eligibility_threshold: DEFAULT_ELIGIBILITY_THRESHOLD,
        }
    }
}

impl Options {
    /// Ordered password candidates for every archive of this run.
    pub fn candidates(&self) -> Vec<Password> {
        unravel_extract::candidates(self.has_password, &self.passwords)
    }
}
