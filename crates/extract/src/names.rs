use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Name lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("Name directory error: {0}")]
    Directory(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Malformed directory reply: {0}")]
    Reply(#[from] serde_json::Error),
}

/// Read-only directory mapping a tax identifier (CNPJ) to the entity's
/// display name as printed in the master document.
///
/// `Ok(None)` means the directory has no mapping. Callers treat both that and
/// an error as "use the raw identifier".
pub trait NameResolver: Send + Sync {
    fn resolve(&self, tax_id: &str) -> Result<Option<String>, LookupError>;
}

/// Digits only: `12.345.678/0001-90` -> `12345678000190`.
pub fn tax_id_digits(tax_id: &str) -> String {
    tax_id.chars().filter(char::is_ascii_digit).collect()
}

/// Resolves nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNames;

impl NameResolver for NoNames {
    fn resolve(&self, _tax_id: &str) -> Result<Option<String>, LookupError> {
        Ok(None)
    }
}

/// In-memory directory, keyed by identifier digits so punctuated and bare
/// forms resolve alike.
#[derive(Debug, Default, Clone)]
pub struct StaticNameResolver {
    by_digits: HashMap<String, String>,
}

impl StaticNameResolver {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let by_digits = entries
            .into_iter()
            .map(|(k, v)| (tax_id_digits(k.as_ref()), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { by_digits }
    }

    pub fn len(&self) -> usize {
        self.by_digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_digits.is_empty()
    }
}

impl NameResolver for StaticNameResolver {
    fn resolve(&self, tax_id: &str) -> Result<Option<String>, LookupError> {
        Ok(self.by_digits.get(&tax_id_digits(tax_id)).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    name: Option<String>,
}

/// HTTP name directory: `GET {endpoint}/{digits}` answering `{"name": "..."}`,
/// or 404 when the identifier is unknown.
///
/// Uses the blocking client; call it from a blocking context.
#[derive(Debug, Clone)]
pub struct HttpNameResolver {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpNameResolver {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl NameResolver for HttpNameResolver {
    fn resolve(&self, tax_id: &str) -> Result<Option<String>, LookupError> {
        let digits = tax_id_digits(tax_id);
        if digits.is_empty() {
            return Ok(None);
        }
        let resp = self.client.get(format!("{}/{digits}", self.endpoint)).send()?;
        let status = resp.status();
        directory_reply(status, &resp.text()?)
    }
}

/// 404 and a blank `name` are "no mapping"; any other failure status is an error.
fn directory_reply(status: StatusCode, body: &str) -> Result<Option<String>, LookupError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(LookupError::Directory(format!("directory answered {status}")));
    }
    let entry: DirectoryEntry = serde_json::from_str(body)?;
    Ok(entry.name.filter(|n| !n.trim().is_empty()))
}

/// Tries each resolver in turn; the first mapping wins. An error from one
/// resolver does not stop the chain, but is returned if nothing resolved.
pub struct ChainResolver {
    resolvers: Vec<Arc<dyn NameResolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Arc<dyn NameResolver>>) -> Self {
        Self { resolvers }
    }
}

impl NameResolver for ChainResolver {
    fn resolve(&self, tax_id: &str) -> Result<Option<String>, LookupError> {
        let mut last_err = None;
        for r in &self.resolvers {
            match r.resolve(tax_id) {
                Ok(Some(name)) => return Ok(Some(name)),
                Ok(None) => {}
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

/// Bounds any resolver by a deadline. The lookup runs on its own thread;
/// when the deadline passes the result is abandoned and `Timeout` returned.
pub struct TimeoutResolver {
    inner: Arc<dyn NameResolver>,
    timeout: Duration,
}

impl TimeoutResolver {
    pub fn new(inner: Arc<dyn NameResolver>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl NameResolver for TimeoutResolver {
    fn resolve(&self, tax_id: &str) -> Result<Option<String>, LookupError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let tax_id = tax_id.to_string();
        std::thread::spawn(move || {
            let _ = tx.send(inner.resolve(&tax_id));
        });
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(LookupError::Timeout(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(LookupError::Directory("lookup thread panicked".into()))
            }
        }
    }
}
