/// Configuration for a [`TwirpServer`](super::TwirpServer).
#[derive(Debug, Clone)]
pub struct Configuration {
    path_prefix: String,
    request_arena: bool,
    max_request_length: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            path_prefix: "/twirp".to_string(),
            request_arena: true,
            max_request_length: 4 << 20,
        }
    }
}

impl Configuration {
    /// Routes are served under `{path_prefix}/{service}/{method}`. A trailing `/` is ignored.
    ///
    /// Default: `/twirp`
    pub fn path_prefix(&mut self, path_prefix: impl Into<String>) {
        let path_prefix: String = path_prefix.into();
        self.path_prefix = path_prefix.trim_end_matches('/').to_string();
    }

    /// Allocate each request's messages in a fresh [`Arena`](crate::Arena), released once
    /// the response is produced. When off, messages are owned independently.
    ///
    /// Default: true
    pub fn request_arena(&mut self, request_arena: bool) {
        self.request_arena = request_arena;
    }

    /// Requests with a larger body are rejected with `OutOfRange` before they are decoded.
    ///
    /// Default: 4MiB
    pub fn max_request_length(&mut self, max_request_length: usize) {
        self.max_request_length = max_request_length;
    }

    /// See [`Configuration::path_prefix`].
    pub fn get_path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// See [`Configuration::request_arena`].
    pub fn get_request_arena(&self) -> bool {
        self.request_arena
    }

    /// See [`Configuration::max_request_length`].
    pub fn get_max_request_length(&self) -> usize {
        self.max_request_length
    }
}

#[cfg(test)]
mod test {
    use super::Configuration;

    #[test]
    fn defaults() {
        let configuration = Configuration::default();
        assert_eq!("/twirp", configuration.get_path_prefix());
        assert!(configuration.get_request_arena());
        assert_eq!(4 * 1024 * 1024, configuration.get_max_request_length());
    }

    #[test]
    fn prefix_drops_trailing_slash() {
        let mut configuration = Configuration::default();
        configuration.path_prefix("/api/v1/");
        assert_eq!("/api/v1", configuration.get_path_prefix());
        configuration.path_prefix("");
        assert_eq!("", configuration.get_path_prefix());
    }
}
