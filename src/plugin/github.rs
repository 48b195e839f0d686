//! GitHub plugin content source
//!
//! Plugins hosted on GitHub are addressed by a `github:owner/repo[/ref]?dir=…`
//! flake reference. Their files are fetched from the raw content host and kept
//! in the [`ContentCache`], keyed by URL and TTL override.

use std::env;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::config::defaults::{DEFAULT_BRANCH, PLUGIN_CACHE_TTL, PLUGIN_CONFIG_NAME};
use crate::config::duration::parse_duration;
use crate::config::env as env_vars;
use crate::config::urls::GITHUB_RAW_CONTENT;
use crate::core::cachehash;
use crate::core::flake::{FlakeKind, FlakeRef};
use crate::error::PluginError;
use crate::plugin::auth::redact_auth_header;
use crate::plugin::cache::ContentCache;

/// Fetch settings, normally taken from the environment
#[derive(Debug, Clone)]
pub struct GithubSettings {
    /// Sent as `Authorization: token …`
    pub github_token: Option<String>,
    /// Raw duration string replacing the default TTL
    pub cache_ttl_override: Option<String>,
    /// Raw content host
    pub base_url: String,
}

impl GithubSettings {
    /// Read `GITHUB_TOKEN` and `DEVBOX_X_GITHUB_PLUGIN_CACHE_TTL`
    pub fn from_env() -> Self {
        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            github_token: non_empty(env_vars::GITHUB_TOKEN),
            cache_ttl_override: non_empty(env_vars::PLUGIN_CACHE_TTL),
            ..Self::default()
        }
    }

    fn ttl_override(&self) -> &str {
        self.cache_ttl_override.as_deref().unwrap_or_default()
    }

    fn ttl(&self) -> Result<Duration, PluginError> {
        match self.ttl_override() {
            "" => Ok(PLUGIN_CACHE_TTL),
            raw => Ok(parse_duration(raw)?),
        }
    }
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            github_token: None,
            cache_ttl_override: None,
            base_url: GITHUB_RAW_CONTENT.to_string(),
        }
    }
}

/// A loaded GitHub plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubPlugin {
    reference: FlakeRef,
    name: String,
}

impl GithubPlugin {
    pub fn reference(&self) -> &FlakeRef {
        &self.reference
    }

    /// Name used to refer to the plugin within a project
    pub fn canonical_name(&self) -> &str {
        &self.name
    }

    /// Identifies the plugin pointer, not its content
    pub fn hash(&self) -> String {
        reference_hash(&self.reference)
    }

    /// Key of the plugin in lock files and diagnostics
    pub fn lockfile_key(&self) -> String {
        self.reference.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ManifestName {
    #[serde(default)]
    name: String,
}

/// Fetches plugin files from GitHub through a shared cache
#[derive(Debug, Clone)]
pub struct GithubPluginSource {
    client: reqwest::Client,
    cache: Arc<ContentCache>,
    settings: GithubSettings,
}

impl GithubPluginSource {
    /// Create a source that stores fetched content in `cache`
    pub fn new(cache: Arc<ContentCache>, settings: GithubSettings) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            cache,
            settings,
        }
    }

    /// Fetch the manifest of `reference` and derive the plugin's name.
    ///
    /// A manifest without `name` falls back to the plugin directory with `/`
    /// replaced by `-`.
    pub async fn load(&self, reference: FlakeRef) -> Result<GithubPlugin, PluginError> {
        let (owner, repo) = github_parts(&reference)?;
        let url = self.content_url(&reference, PLUGIN_CONFIG_NAME)?;
        let content = self.file_content(&reference, PLUGIN_CONFIG_NAME).await?;
        let manifest: ManifestName = serde_json::from_value(purify_manifest(&url, &content)?)
            .map_err(|e| PluginError::InvalidManifest {
                url,
                error: e.to_string(),
            })?;

        let name = if manifest.name.is_empty() {
            reference.dir.as_deref().unwrap_or_default().replace('/', "-")
        } else {
            manifest.name
        };
        let name = canonical_name(owner, repo, &name);
        tracing::debug!("Loaded plugin {name} from {reference}");
        Ok(GithubPlugin { reference, name })
    }

    /// Content of the plugin's manifest as plain JSON.
    ///
    /// Comments and trailing commas in the hosted file are removed.
    pub async fn fetch(&self, plugin: &GithubPlugin) -> Result<Vec<u8>, PluginError> {
        let url = self.content_url(&plugin.reference, PLUGIN_CONFIG_NAME)?;
        let content = self.file_content(&plugin.reference, PLUGIN_CONFIG_NAME).await?;
        let manifest = purify_manifest(&url, &content)?;
        serde_json::to_vec_pretty(&manifest).map_err(|e| PluginError::InvalidManifest {
            url,
            error: e.to_string(),
        })
    }

    /// Content of `subpath` inside the plugin directory.
    ///
    /// The TTL override is validated before anything is looked up or fetched.
    pub async fn file_content(
        &self,
        reference: &FlakeRef,
        subpath: &str,
    ) -> Result<Vec<u8>, PluginError> {
        let url = self.content_url(reference, subpath)?;
        let ttl = self.settings.ttl()?;
        let key = format!("{url}{}", self.settings.ttl_override());

        self.cache
            .get_or_set(&key, || async {
                let content = self.request(reference, &url).await?;
                Ok::<_, PluginError>((content, ttl))
            })
            .await
    }

    /// `{base}/{owner}/{repo}/{rev|ref|master}/{dir}/{subpath}`
    pub fn content_url(&self, reference: &FlakeRef, subpath: &str) -> Result<String, PluginError> {
        let (owner, repo) = github_parts(reference)?;
        let version = reference
            .rev
            .as_deref()
            .or(reference.git_ref.as_deref())
            .unwrap_or(DEFAULT_BRANCH);

        let mut url = self.settings.base_url.trim_end_matches('/').to_string();
        let segments = [
            owner,
            repo,
            version,
            reference.dir.as_deref().unwrap_or_default(),
            subpath,
        ];
        for segment in segments.iter().map(|s| s.trim_matches('/')) {
            if !segment.is_empty() {
                url.push('/');
                url.push_str(segment);
            }
        }

        reqwest::Url::parse(&url).map_err(|e| PluginError::InvalidUrl {
            url: url.clone(),
            error: e.to_string(),
        })?;
        Ok(url)
    }

    async fn request(&self, reference: &FlakeRef, url: &str) -> Result<Vec<u8>, PluginError> {
        let auth_header = self
            .settings
            .github_token
            .as_ref()
            .map(|token| format!("token {token}"));

        let mut request = self.client.get(url);
        if let Some(value) = &auth_header {
            tracing::debug!(
                "GITHUB_TOKEN found, sending auth header {}",
                redact_auth_header(value)
            );
            request = request.header(reqwest::header::AUTHORIZATION, value);
        }

        tracing::info!("Fetching {url}");
        let response = request.send().await.map_err(|e| PluginError::Network {
            url: url.to_string(),
            error: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let auth_info = match &auth_header {
                Some(value) => format!(
                    "The auth header `{}` was sent with this request.",
                    redact_auth_header(value)
                ),
                None => "No auth header was sent with this request.".to_string(),
            };
            return Err(PluginError::ManifestNotFound {
                key: reference.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                auth_info,
            });
        }

        let body = response.bytes().await.map_err(|e| PluginError::Network {
            url: url.to_string(),
            error: e.to_string(),
        })?;
        Ok(body.to_vec())
    }
}

/// Join the non-empty parts with `.` and replace every run of characters
/// outside `[a-zA-Z0-9-_.]` with a space
pub fn canonical_name(owner: &str, repo: &str, name: &str) -> String {
    static UNSAFE: OnceLock<Option<Regex>> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\-_.]+").ok());

    let joined = [owner, repo, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    match unsafe_chars {
        Some(re) => re.replace_all(&joined, " ").into_owned(),
        None => joined,
    }
}

/// Hash of a plugin reference string
pub fn reference_hash(reference: &FlakeRef) -> String {
    cachehash::bytes(reference.to_string().as_bytes())
}

fn github_parts(reference: &FlakeRef) -> Result<(&str, &str), PluginError> {
    match &reference.kind {
        FlakeKind::GitHub { owner, repo, .. } => Ok((owner.as_str(), repo.as_str())),
        _ => Err(PluginError::InvalidReference {
            reference: reference.to_string(),
            reason: "not a github reference".to_string(),
        }),
    }
}

/// Parse a manifest that may carry `//` or `/* */` comments and trailing
/// commas.
fn purify_manifest(url: &str, content: &[u8]) -> Result<serde_json::Value, PluginError> {
    let invalid = |error: String| PluginError::InvalidManifest {
        url: url.to_string(),
        error,
    };
    let text = std::str::from_utf8(content).map_err(|e| invalid(e.to_string()))?;
    json5::from_str(text).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "ghp_1234567890abcd";

    fn source(server: &MockServer, settings: GithubSettings) -> GithubPluginSource {
        GithubPluginSource::new(
            Arc::new(ContentCache::new()),
            GithubSettings {
                base_url: server.uri(),
                ..settings
            },
        )
    }

    fn mongodb() -> FlakeRef {
        FlakeRef::github("jetify-com", "devbox-plugins").with_dir("mongodb")
    }

    #[test]
    fn test_content_url_defaults_to_master() {
        let source = GithubPluginSource::new(Arc::new(ContentCache::new()), GithubSettings::default());
        assert_eq!(
            source.content_url(&mongodb(), "plugin.json").unwrap(),
            "https://raw.githubusercontent.com/jetify-com/devbox-plugins/master/mongodb/plugin.json"
        );
    }

    #[test]
    fn test_content_url_prefers_rev_over_ref() {
        let source = GithubPluginSource::new(Arc::new(ContentCache::new()), GithubSettings::default());
        let rev = "75a52265bda7fd25e06e3a67dee3f0354e73243c";
        let reference = FlakeRef::github("o", "r").with_ref("v1").with_rev(rev);
        assert_eq!(
            source.content_url(&reference, "plugin.json").unwrap(),
            format!("https://raw.githubusercontent.com/o/r/{rev}/plugin.json")
        );

        let reference = FlakeRef::github("o", "r").with_ref("v1");
        assert!(source
            .content_url(&reference, "plugin.json")
            .unwrap()
            .ends_with("/o/r/v1/plugin.json"));
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(
            canonical_name("jetify-com", "devbox-plugins", "mongodb"),
            "jetify-com.devbox-plugins.mongodb"
        );
        assert_eq!(canonical_name("owner", "repo", ""), "owner.repo");
        assert_eq!(canonical_name("o", "r", "my plugin!!"), "o.r.my plugin ");
        assert_eq!(canonical_name("o", "r", "a/b@c"), "o.r.a b c");
    }

    #[tokio::test]
    async fn test_load_uses_manifest_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jetify-com/devbox-plugins/master/mongodb/plugin.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name": "mongo db"}"#))
            .mount(&server)
            .await;

        let plugin = source(&server, GithubSettings::default())
            .load(mongodb())
            .await
            .unwrap();
        assert_eq!(plugin.canonical_name(), "jetify-com.devbox-plugins.mongo db");
        assert_eq!(plugin.lockfile_key(), mongodb().to_string());
    }

    #[tokio::test]
    async fn test_commented_manifest_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jetify-com/devbox-plugins/master/mongodb/plugin.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\n  // plugin name\n  \"name\": \"mongo\",\n  /* pinned */ \"version\": \"0.0.1\",\n}",
            ))
            .mount(&server)
            .await;

        let source = source(&server, GithubSettings::default());
        let plugin = source.load(mongodb()).await.unwrap();
        assert_eq!(plugin.canonical_name(), "jetify-com.devbox-plugins.mongo");

        let content = source.fetch(&plugin).await.unwrap();
        let manifest: serde_json::Value = serde_json::from_slice(&content).unwrap();
        assert_eq!(
            manifest,
            serde_json::json!({"name": "mongo", "version": "0.0.1"})
        );
        assert!(!String::from_utf8(content).unwrap().contains("//"));
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jetify-com/devbox-plugins/master/mongodb/plugin.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ name: "))
            .mount(&server)
            .await;

        let result = source(&server, GithubSettings::default())
            .load(mongodb())
            .await;
        assert!(matches!(result, Err(PluginError::InvalidManifest { .. })));
    }

    #[tokio::test]
    async fn test_load_falls_back_to_directory_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/o/r/master/plugins/nginx/plugin.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"version": "0.1"}"#))
            .mount(&server)
            .await;

        let reference = FlakeRef::github("o", "r").with_dir("plugins/nginx");
        let plugin = source(&server, GithubSettings::default())
            .load(reference)
            .await
            .unwrap();
        assert_eq!(plugin.canonical_name(), "o.r.plugins-nginx");
    }

    #[tokio::test]
    async fn test_load_rejects_non_github_reference() {
        let server = MockServer::start().await;
        let result = source(&server, GithubSettings::default())
            .load(FlakeRef::path("./plugin"))
            .await;
        assert!(matches!(result, Err(PluginError::InvalidReference { .. })));
    }

    #[tokio::test]
    async fn test_file_content_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jetify-com/devbox-plugins/master/mongodb/plugin.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let source = source(&server, GithubSettings::default());
        let first = source.file_content(&mongodb(), "plugin.json").await.unwrap();
        let second = source.file_content(&mongodb(), "plugin.json").await.unwrap();
        assert_eq!(first, b"{}");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_ttl_override_is_part_of_cache_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(2)
            .mount(&server)
            .await;

        let cache = Arc::new(ContentCache::new());
        for ttl in ["1h", "30m"] {
            let source = GithubPluginSource::new(
                Arc::clone(&cache),
                GithubSettings {
                    base_url: server.uri(),
                    cache_ttl_override: Some(ttl.to_string()),
                    ..GithubSettings::default()
                },
            );
            source.file_content(&mongodb(), "plugin.json").await.unwrap();
            source.file_content(&mongodb(), "plugin.json").await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_invalid_ttl_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let source = source(
            &server,
            GithubSettings {
                cache_ttl_override: Some("not-a-duration".to_string()),
                ..GithubSettings::default()
            },
        );
        let result = source.file_content(&mongodb(), "plugin.json").await;
        assert!(matches!(result, Err(PluginError::InvalidTtl(_))));
    }

    #[tokio::test]
    async fn test_token_is_sent_as_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Authorization", format!("token {TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let source = source(
            &server,
            GithubSettings {
                github_token: Some(TOKEN.to_string()),
                ..GithubSettings::default()
            },
        );
        source.file_content(&mongodb(), "plugin.json").await.unwrap();
    }

    #[tokio::test]
    async fn test_not_found_reports_redacted_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = source(
            &server,
            GithubSettings {
                github_token: Some(TOKEN.to_string()),
                ..GithubSettings::default()
            },
        );
        let err = source
            .file_content(&mongodb(), "plugin.json")
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, PluginError::ManifestNotFound { status: 404, .. }));
        assert!(message.contains("Status code 404"));
        assert!(message.contains("/jetify-com/devbox-plugins/master/mongodb/plugin.json"));
        assert!(message.contains(&format!("`token ghp_{}`", "*".repeat(14))));
        assert!(!message.contains(TOKEN));
        assert!(message.contains("plugin.json file exists"));
    }

    #[tokio::test]
    async fn test_not_found_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = source(&server, GithubSettings::default())
            .file_content(&mongodb(), "plugin.json")
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("No auth header was sent with this request."));
    }

    #[tokio::test]
    async fn test_hash_does_not_depend_on_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name": "x"}"#))
            .mount(&server)
            .await;

        let plugin = source(&server, GithubSettings::default())
            .load(mongodb())
            .await
            .unwrap();
        assert_eq!(plugin.hash(), reference_hash(&mongodb()));
        assert_eq!(
            plugin.hash(),
            cachehash::bytes(mongodb().to_string().as_bytes())
        );
    }
}
