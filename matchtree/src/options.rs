/// Options when creating a [`crate::TreeExpander`].
pub struct Options {
    /// The maximum number of concurrent children resolutions.
    pub(crate) fetch_concurrency: usize,
    /// The maximum number of concurrent volume lookups (dominance expansion
    /// only).
    pub(crate) volume_concurrency: usize,
}

impl Options {
    /// Create a new `Options` instance with the default values.
    pub fn new() -> Self {
        Options {
            fetch_concurrency: 4,
            volume_concurrency: 2,
        }
    }

    /// Set the maximum number of concurrent children resolutions.
    ///
    /// May not be zero.
    pub fn fetch_concurrency(&mut self, fetch_concurrency: usize) {
        assert!(fetch_concurrency > 0);
        self.fetch_concurrency = fetch_concurrency;
    }

    /// Set the maximum number of concurrent volume lookups.
    ///
    /// May not be zero.
    pub fn volume_concurrency(&mut self, volume_concurrency: usize) {
        assert!(volume_concurrency > 0);
        self.volume_concurrency = volume_concurrency;
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}
