//! Process-wide translations loaded from JSON string bundles.
//!
//! Bundles are nested JSON objects addressed by language and namespace,
//! fetched from a templated path such as `/locales/{{lng}}/{{ns}}.json`.
//! [`init`] loads them once and installs the global instance; after that,
//! [`t`] resolves keys against the configured language and then the
//! fallback language.
//!
//! # Example
//!
//! ```no_run
//! use card_collection_sdk::i18n::{self, HttpBackend, I18nOptions};
//!
//! # async fn example() -> card_collection_sdk::Result<()> {
//! let backend = HttpBackend::new("https://cards.example.com")?;
//! i18n::init(I18nOptions::default(), backend).await?;
//! println!("{}", i18n::t("collection.title"));
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use log::{info, warn};
use reqwest::Client;
use serde_json::Value;

use crate::config::{DEFAULT_LANGUAGE, DEFAULT_LOAD_PATH, DEFAULT_NAMESPACE};
use crate::error::{CollectionError, Result};

static GLOBAL: OnceLock<I18n> = OnceLock::new();

// ---------------------------------------------------------------------------
// I18nOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I18nOptions {
    /// Language used for lookups.
    pub lng: String,
    /// Language consulted when a key is missing from `lng`.
    pub fallback_lng: String,
    /// Whether interpolated values are HTML-escaped.
    pub escape_value: bool,
    /// Bundle path template with `{{lng}}` and `{{ns}}` placeholders.
    pub load_path: String,
    /// Namespace used for keys without an `ns:` prefix.
    pub default_ns: String,
    /// Namespaces loaded by [`init`].
    pub namespaces: Vec<String>,
}

impl Default for I18nOptions {
    fn default() -> Self {
        Self {
            lng: DEFAULT_LANGUAGE.to_string(),
            fallback_lng: DEFAULT_LANGUAGE.to_string(),
            escape_value: false,
            load_path: DEFAULT_LOAD_PATH.to_string(),
            default_ns: DEFAULT_NAMESPACE.to_string(),
            namespaces: vec![DEFAULT_NAMESPACE.to_string()],
        }
    }
}

/// Fill the `{{lng}}` and `{{ns}}` placeholders of a load path.
pub fn resolve_load_path(template: &str, lng: &str, ns: &str) -> String {
    template.replace("{{lng}}", lng).replace("{{ns}}", ns)
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Source of string bundles.
pub trait BundleBackend: Send + Sync {
    fn read(&self, lng: &str, ns: &str) -> impl Future<Output = Result<Value>> + Send;
}

/// Fetches bundles over HTTP from `{base_url}{load_path}`.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    load_path: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            load_path: DEFAULT_LOAD_PATH.to_string(),
        })
    }

    pub fn with_load_path(mut self, load_path: impl Into<String>) -> Self {
        self.load_path = load_path.into();
        self
    }

    pub fn url(&self, lng: &str, ns: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            resolve_load_path(&self.load_path, lng, ns)
        )
    }
}

impl BundleBackend for HttpBackend {
    async fn read(&self, lng: &str, ns: &str) -> Result<Value> {
        let resp = self
            .client
            .get(self.url(lng, ns))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// Bundles held in memory, for embedded translations and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticBackend {
    bundles: HashMap<(String, String), Value>,
}

impl StaticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(mut self, lng: &str, ns: &str, bundle: Value) -> Self {
        self.bundles
            .insert((lng.to_string(), ns.to_string()), bundle);
        self
    }
}

impl BundleBackend for StaticBackend {
    async fn read(&self, lng: &str, ns: &str) -> Result<Value> {
        self.bundles
            .get(&(lng.to_string(), ns.to_string()))
            .cloned()
            .ok_or_else(|| CollectionError::NotFound(format!("bundle {lng}/{ns}")))
    }
}

// ---------------------------------------------------------------------------
// I18n
// ---------------------------------------------------------------------------

/// Loaded bundles plus the options they were loaded with.
#[derive(Debug)]
pub struct I18n {
    options: I18nOptions,
    bundles: HashMap<(String, String), Value>,
}

impl I18n {
    /// Load every configured namespace for the language and its fallback.
    ///
    /// A bundle that fails to load is logged and skipped; its keys resolve
    /// through the fallback language or to the key itself.
    pub async fn load<B: BundleBackend>(options: I18nOptions, backend: &B) -> Result<Self> {
        let mut languages = vec![options.lng.clone()];
        if options.fallback_lng != options.lng {
            languages.push(options.fallback_lng.clone());
        }
        let mut namespaces = options.namespaces.clone();
        if !namespaces.contains(&options.default_ns) {
            namespaces.push(options.default_ns.clone());
        }

        let mut bundles = HashMap::new();
        for lng in &languages {
            for ns in &namespaces {
                match backend.read(lng, ns).await {
                    Ok(bundle) => {
                        bundles.insert((lng.clone(), ns.clone()), bundle);
                    }
                    Err(e) => warn!("Failed to load translations {lng}/{ns}: {e}"),
                }
            }
        }
        Ok(Self { options, bundles })
    }

    pub fn options(&self) -> &I18nOptions {
        &self.options
    }

    pub fn language(&self) -> &str {
        &self.options.lng
    }

    /// Whether a bundle for `lng`/`ns` was loaded.
    pub fn has_bundle(&self, lng: &str, ns: &str) -> bool {
        self.bundles
            .contains_key(&(lng.to_string(), ns.to_string()))
    }

    /// Translate `key`, returning the key itself when it is missing.
    pub fn t(&self, key: &str) -> String {
        self.t_with(key, &[])
    }

    /// Translate `key` and substitute `{{name}}` placeholders from `args`.
    ///
    /// `key` may carry a namespace prefix (`"ns:some.key"`).
    pub fn t_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        let (ns, path) = match key.split_once(':') {
            Some((ns, path)) if self.options.namespaces.iter().any(|n| n == ns) => (ns, path),
            _ => (self.options.default_ns.as_str(), key),
        };

        let languages = [&self.options.lng, &self.options.fallback_lng];
        for lng in languages {
            let found = self
                .bundles
                .get(&(lng.clone(), ns.to_string()))
                .and_then(|bundle| lookup(bundle, path));
            if let Some(template) = found {
                return interpolate(template, args, self.options.escape_value);
            }
        }
        key.to_string()
    }
}

fn lookup<'a>(bundle: &'a Value, path: &str) -> Option<&'a str> {
    // Flat keys containing dots win over nested lookups.
    if let Some(Value::String(s)) = bundle.get(path) {
        return Some(s);
    }
    path.split('.')
        .try_fold(bundle, |node, part| node.get(part))
        .and_then(Value::as_str)
}

fn interpolate(template: &str, args: &[(&str, &str)], escape: bool) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = rest[start + 2..start + 2 + len].trim();
        match args.iter().find(|(k, _)| *k == name) {
            Some((_, value)) if escape => out.push_str(&escape_html(value)),
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 4 + len]),
        }
        rest = &rest[start + 4 + len..];
    }
    out.push_str(rest);
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Global instance
// ---------------------------------------------------------------------------

/// Load bundles and install the process-wide instance.
///
/// Only the first successful call installs anything; later calls fail with
/// [`CollectionError::AlreadyInitialized`].
pub async fn init<B: BundleBackend>(options: I18nOptions, backend: B) -> Result<&'static I18n> {
    if GLOBAL.get().is_some() {
        return Err(CollectionError::AlreadyInitialized);
    }
    let i18n = I18n::load(options, &backend).await?;
    GLOBAL
        .set(i18n)
        .map_err(|_| CollectionError::AlreadyInitialized)?;
    info!("Translations initialized");
    GLOBAL.get().ok_or(CollectionError::AlreadyInitialized)
}

/// The process-wide instance, if [`init`] has completed.
pub fn global() -> Option<&'static I18n> {
    GLOBAL.get()
}

/// Translate through the global instance. Before [`init`], returns the key.
pub fn t(key: &str) -> String {
    match GLOBAL.get() {
        Some(i18n) => i18n.t(key),
        None => key.to_string(),
    }
}

/// Translate with interpolation through the global instance.
pub fn t_with(key: &str, args: &[(&str, &str)]) -> String {
    match GLOBAL.get() {
        Some(i18n) => i18n.t_with(key, args),
        None => key.to_string(),
    }
}
