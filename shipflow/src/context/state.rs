//! The mutable context of one pipeline invocation.

use super::{ArtifactList, RunIdentity, SkipSet};
use crate::config::Config;
use crate::events::{EventSink, NoOpEventSink};
use crate::git::RepositoryRef;
use crate::template::{SimpleTemplates, TemplateEvaluator};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Process-wide state passed by reference to every stage.
///
/// Stages run one at a time and borrow the context mutably, so no
/// synchronisation is needed for the fields below.
pub struct Context {
    /// The parsed configuration.
    pub config: Config,
    /// Whether every stage failure aborts immediately.
    pub fail_fast: bool,
    /// User-requested skips.
    pub skips: SkipSet,
    /// Artifacts recorded by earlier stages.
    pub artifacts: ArtifactList,
    repo: Option<RepositoryRef>,
    env: BTreeMap<String, String>,
    run_id: RunIdentity,
    templates: Arc<dyn TemplateEvaluator>,
    event_sink: Arc<dyn EventSink>,
}

impl Context {
    /// Creates a context for a configuration.
    ///
    /// Skips listed in the configuration are added to the skip set and the
    /// process environment is captured for templates.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let skips = config.skip.iter().copied().collect();
        Self {
            config,
            fail_fast: false,
            skips,
            artifacts: ArtifactList::new(),
            repo: None,
            env: process_env(),
            run_id: RunIdentity::new(),
            templates: Arc::new(SimpleTemplates::new()),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the fail-fast flag.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Adds user-requested skips.
    #[must_use]
    pub fn with_skips(mut self, skips: SkipSet) -> Self {
        self.skips.extend(skips.iter());
        self
    }

    /// Replaces the template evaluator.
    #[must_use]
    pub fn with_template_evaluator(mut self, templates: Arc<dyn TemplateEvaluator>) -> Self {
        self.templates = templates;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets or overrides an environment variable visible to templates.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Uses a known repository instead of resolving it from git.
    #[must_use]
    pub fn with_repo(mut self, repo: RepositoryRef) -> Self {
        self.repo = Some(repo);
        self
    }

    /// Returns the resolved repository, if any.
    #[must_use]
    pub fn repo(&self) -> Option<&RepositoryRef> {
        self.repo.as_ref()
    }

    /// Stores the resolved repository.
    pub fn set_repo(&mut self, repo: RepositoryRef) {
        debug!(repo = %repo, hosting = %repo.hosting(), "repository resolved");
        self.repo = Some(repo);
    }

    /// Returns the environment visible to templates.
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns the run identity.
    #[must_use]
    pub fn run_id(&self) -> &RunIdentity {
        &self.run_id
    }

    /// Returns the template evaluator.
    #[must_use]
    pub fn templates(&self) -> Arc<dyn TemplateEvaluator> {
        Arc::clone(&self.templates)
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Emits an event tagged with the run ID.
    pub fn emit(&self, event_type: &str, mut data: serde_json::Value) {
        if let Some(map) = data.as_object_mut() {
            map.insert(
                "run_id".to_string(),
                serde_json::Value::String(self.run_id.run_id.to_string()),
            );
        }
        self.event_sink.try_emit(event_type, Some(data));
    }

    /// Returns the download base URL for the resolved repository's platform.
    #[must_use]
    pub fn download_base_url(&self) -> Option<&str> {
        let repo = self.repo.as_ref()?;
        self.config
            .urls_for(repo.hosting())
            .map(|urls| urls.download.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// Captures the process environment. Variables whose name or value is not
/// valid UTF-8 cannot be referenced from templates and are left out.
fn process_env() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("run_id", &self.run_id.run_id)
            .field("fail_fast", &self.fail_fast)
            .field("skips", &self.skips)
            .field("repo", &self.repo)
            .field("artifacts", &self.artifacts.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SkipKey;
    use crate::events::CollectingEventSink;

    #[test]
    fn test_config_skips_are_merged() {
        let config = Config {
            skip: vec![SkipKey::Docker],
            ..Config::default()
        };
        let ctx = Context::new(config).with_skips(SkipSet::parse("publish").unwrap());

        assert!(ctx.skips.contains(SkipKey::Docker));
        assert!(ctx.skips.contains(SkipKey::Publish));
        assert!(!ctx.fail_fast);
        assert!(ctx.repo().is_none());
    }

    #[test]
    fn test_set_repo() {
        let mut ctx = Context::default();
        ctx.set_repo(RepositoryRef::from_url("git@github.com:shipflow/shipflow.git").unwrap());
        assert_eq!(ctx.repo().map(ToString::to_string).as_deref(), Some("shipflow/shipflow"));
    }

    #[test]
    fn test_download_base_url_follows_hosting() {
        let mut config = Config::default();
        config.gitlab_urls.download = "https://gitlab.example.com".to_string();
        let ctx = Context::new(config)
            .with_repo(RepositoryRef::from_url("https://gitlab.example.com/team/app.git").unwrap());

        assert_eq!(ctx.download_base_url(), Some("https://gitlab.example.com"));
        assert_eq!(Context::default().download_base_url(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_environment_is_ignored() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::env::set_var("SHIPFLOW_TEST_LATIN1", OsStr::from_bytes(b"caf\xe9"));
        std::env::set_var("SHIPFLOW_TEST_PLAIN", "cafe");
        let ctx = Context::default();
        std::env::remove_var("SHIPFLOW_TEST_LATIN1");
        std::env::remove_var("SHIPFLOW_TEST_PLAIN");

        assert!(!ctx.env().contains_key("SHIPFLOW_TEST_LATIN1"));
        assert_eq!(ctx.env().get("SHIPFLOW_TEST_PLAIN").map(String::as_str), Some("cafe"));
    }

    #[test]
    fn test_emit_adds_run_id() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = Context::default().with_event_sink(sink.clone());
        ctx.emit("stage.started", serde_json::json!({"stage": "docker"}));

        let events = sink.snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stage(), Some("docker"));
        let data = events[0].data.as_ref().unwrap();
        assert_eq!(data["run_id"], ctx.run_id().run_id.to_string());
    }
}
