use std::time::Duration;

use crate::error::FeedError;

/// Extra `_changes` parameters for [`ChangeNotifier::start`](crate::ChangeNotifier::start).
///
/// `feed` and `since` belong to the session; setting either makes `start` fail.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StartOptions {
    params: Vec<(String, String)>,
}

impl StartOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the server to send an empty line after `every` of silence.
    pub fn heartbeat(self, every: Duration) -> Self {
        self.param("heartbeat", every.as_millis().to_string())
    }

    /// Asks the server to end the response after `after` without changes.
    pub fn timeout(self, after: Duration) -> Self {
        self.param("timeout", after.as_millis().to_string())
    }

    pub fn include_docs(self, enabled: bool) -> Self {
        self.param("include_docs", enabled.to_string())
    }

    pub fn filter(self, name: impl Into<String>) -> Self {
        self.param("filter", name)
    }

    /// Report every leaf revision instead of only the winner.
    pub fn style_all_docs(self) -> Self {
        self.param("style", "all_docs")
    }

    /// Sets `key`, replacing an earlier value for the same key.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub(crate) fn validate(&self) -> Result<(), FeedError> {
        for (key, _) in &self.params {
            match key.as_str() {
                "feed" => return Err(FeedError::FeedOverride),
                "since" => return Err(FeedError::SinceOverride),
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn into_params(self) -> Vec<(String, String)> {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_render_couchdb_parameters() {
        let options = StartOptions::new()
            .heartbeat(Duration::from_secs(30))
            .include_docs(true)
            .filter("app/by_type")
            .style_all_docs()
            .heartbeat(Duration::from_secs(10));

        assert_eq!(
            options.params(),
            &[
                ("heartbeat".to_string(), "10000".to_string()),
                ("include_docs".to_string(), "true".to_string()),
                ("filter".to_string(), "app/by_type".to_string()),
                ("style".to_string(), "all_docs".to_string()),
            ]
        );
        assert!(options.validate().is_ok());
    }

    #[test]
    fn session_owned_parameters_are_rejected() {
        let feed = StartOptions::new().param("feed", "longpoll");
        assert!(matches!(feed.validate(), Err(FeedError::FeedOverride)));

        let since = StartOptions::new().param("since", "now");
        assert!(matches!(since.validate(), Err(FeedError::SinceOverride)));
    }
}
