/// Configuration for an [`HttpRequester`](super::HttpRequester).
#[derive(Debug, Clone)]
pub struct Configuration {
    path_prefix: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            path_prefix: "/twirp".to_string(),
        }
    }
}

impl Configuration {
    /// Requests are posted to `{base_url}{path_prefix}/{service}/{method}`. Must match the
    /// server's prefix. A trailing `/` is ignored.
    ///
    /// Default: `/twirp`
    pub fn path_prefix(&mut self, path_prefix: impl Into<String>) {
        let path_prefix: String = path_prefix.into();
        self.path_prefix = path_prefix.trim_end_matches('/').to_string();
    }

    /// The prefix requests are posted under.
    pub fn get_path_prefix(&self) -> &str {
        &self.path_prefix
    }
}
