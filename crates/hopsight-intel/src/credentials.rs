use rand::Rng;

/// A pool of equivalent provider credentials.
///
/// One credential is drawn uniformly at random per call to spread
/// rate-limited quota across keys. Selection is a load-distribution
/// detail only: resolver semantics do not depend on which credential
/// served a call, so the pool is owned by the provider client and is
/// invisible above it.
#[derive(Debug, Clone)]
pub struct CredentialPool<T> {
    first: T,
    rest: Vec<T>,
}

impl<T> CredentialPool<T> {
    /// Create a pool holding a single credential.
    pub fn new(credential: T) -> Self {
        Self {
            first: credential,
            rest: Vec::new(),
        }
    }

    /// Add another equivalent credential to the pool.
    #[must_use]
    pub fn with(mut self, credential: T) -> Self {
        self.rest.push(credential);
        self
    }

    /// Create a pool from a non-empty credential list.
    pub fn from_vec(mut credentials: Vec<T>) -> Option<Self> {
        if credentials.is_empty() {
            return None;
        }
        let first = credentials.remove(0);
        Some(Self {
            first,
            rest: credentials,
        })
    }

    /// The number of credentials in the pool.
    pub fn len(&self) -> usize {
        self.rest.len() + 1
    }

    /// The pool always holds at least one credential.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Draw a credential uniformly at random.
    pub fn pick(&self) -> &T {
        let index = rand::thread_rng().gen_range(0..=self.rest.len());
        if index == 0 {
            &self.first
        } else {
            &self.rest[index - 1]
        }
    }
}
