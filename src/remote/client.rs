//! Store adapter for an external object-store daemon
//!
//! Speaks the Kubo-style `/api/v0` RPC: every operation becomes one or more
//! `POST` calls with `arg=` query parameters.

use super::config::{Auth, RemoteConfig};
use super::wire::{DaemonError, ObjectGet, ObjectHash, PinList};
use crate::model::{MerkleNode, Multihash, WriterKey};
use crate::store::{validate_label, ContentAddressedStorage};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Content-addressed storage backed by a remote daemon
///
/// The canonical empty node's address is fetched once in
/// [`RemoteStore::connect`] and kept as an immutable field; `put` starts
/// every patch chain from it. Clones share the HTTP connection pool.
#[derive(Clone, Debug)]
pub struct RemoteStore {
    config: RemoteConfig,
    client: Client,
    empty: Multihash,
}

impl RemoteStore {
    /// Build the HTTP client and learn the empty node's address
    pub async fn connect(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        let empty = new_object(&config, &client).await?;
        info!(api = %config.api_url, %empty, "connected to object daemon");

        Ok(RemoteStore {
            config,
            client,
            empty,
        })
    }

    /// Connect using `DAGSTORE_*` environment variables
    pub async fn from_env() -> Result<Self> {
        Self::connect(RemoteConfig::from_env()?).await
    }

    /// Address of the canonical empty node on this daemon
    pub fn empty_node(&self) -> &Multihash {
        &self.empty
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        form: Option<Form>,
    ) -> Result<T> {
        let response = send(&self.config, &self.client, path, query, form).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("{}: bad response body: {}", path, e)))
    }

    async fn patch(&self, op: &str, query: &[(&str, String)], form: Option<Form>) -> Result<Multihash> {
        let path = format!("object/patch/{}", op);
        let body: ObjectHash = self.call(&path, query, form).await?;
        parse_hash(&body.hash)
    }

    async fn patch_data(&self, base: &Multihash, data: &[u8]) -> Result<Multihash> {
        let form = Form::new().part("file", Part::bytes(data.to_vec()).file_name("data"));
        self.patch("set-data", &[("arg", base.to_string())], Some(form))
            .await
    }

    async fn patch_link(&self, base: &Multihash, label: &str, target: &Multihash) -> Result<Multihash> {
        self.patch(
            "add-link",
            &[
                ("arg", base.to_string()),
                ("arg", label.to_string()),
                ("arg", target.to_string()),
            ],
            None,
        )
        .await
    }
}

/// Reads treat a missing object as `None`; everything else propagates
fn absent_as_none<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_hash(s: &str) -> Result<Multihash> {
    Multihash::from_base58(s)
        .map_err(|e| Error::BackendUnavailable(format!("daemon returned bad hash: {}", e)))
}

fn contains_hash(pins: Option<Vec<String>>, hash: &Multihash) -> bool {
    pins.unwrap_or_default()
        .iter()
        .filter_map(|p| Multihash::from_base58(p).ok())
        .any(|p| p == *hash)
}

async fn new_object(config: &RemoteConfig, client: &Client) -> Result<Multihash> {
    let response = send(config, client, "object/new", &[], None).await?;
    let body: ObjectHash = response
        .json()
        .await
        .map_err(|e| Error::BackendUnavailable(format!("object/new: bad response body: {}", e)))?;
    parse_hash(&body.hash)
}

/// Issue one RPC and map failures onto the store error taxonomy
async fn send(
    config: &RemoteConfig,
    client: &Client,
    path: &str,
    query: &[(&str, String)],
    form: Option<Form>,
) -> Result<Response> {
    let url = format!("{}/api/v0/{}", config.api_url.trim_end_matches('/'), path);
    debug!(%url, ?query, "daemon call");

    let mut request = client.post(&url).query(query);
    if let Auth::Bearer(token) = &config.auth {
        request = request.bearer_auth(token);
    }
    if let Some(form) = form {
        request = request.multipart(form);
    }

    let response = request.send().await.map_err(|e| {
        warn!(%url, error = %e, "daemon unreachable");
        Error::BackendUnavailable(format!("{}: {}", path, e))
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(classify_failure(path, status, &text))
}

/// Map a failed reply onto the error taxonomy
///
/// Only a daemon-shaped error on a 500 can mean "absent". Anything else,
/// such as a 404 from a proxy or a wrong base URL, is a backend failure.
fn classify_failure(path: &str, status: StatusCode, body: &str) -> Error {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::Unauthorized(format!("{}: {}", path, body.trim()));
    }

    let daemon = DaemonError::parse(body);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        if let Some(err) = daemon.as_ref().filter(|e| reports_absence(&e.message)) {
            return Error::NotFound(err.message.clone());
        }
    }

    let message = daemon.map_or_else(|| body.trim().to_string(), |e| e.message);
    warn!(path, %status, %message, "daemon call failed");
    Error::BackendUnavailable(format!("{}: {} {}", path, status, message))
}

fn reports_absence(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not found") || lower.contains("not pinned")
}

#[async_trait]
impl ContentAddressedStorage for RemoteStore {
    async fn create_empty(&self, writer: &WriterKey) -> Result<Multihash> {
        debug!(%writer, "create empty object");
        new_object(&self.config, &self.client).await
    }

    async fn set_data(
        &self,
        writer: &WriterKey,
        base: &Multihash,
        data: &[u8],
    ) -> Result<Multihash> {
        debug!(%writer, %base, len = data.len(), "set data");
        self.patch_data(base, data).await
    }

    async fn add_link(
        &self,
        writer: &WriterKey,
        base: &Multihash,
        label: &str,
        target: &Multihash,
    ) -> Result<Multihash> {
        validate_label(label)?;
        debug!(%writer, %base, label, %target, "add link");
        self.patch_link(base, label, target).await
    }

    async fn get_node(&self, hash: &Multihash) -> Result<Option<MerkleNode>> {
        let query = [
            ("arg", hash.to_string()),
            ("data-encoding", "base64".to_string()),
        ];
        let body: ObjectGet = match absent_as_none(self.call("object/get", &query, None).await)? {
            Some(body) => body,
            None => return Ok(None),
        };

        let data = STANDARD
            .decode(body.data.as_bytes())
            .map_err(|e| Error::BackendUnavailable(format!("object/get: bad data encoding: {}", e)))?;

        let mut links = BTreeMap::new();
        for link in body.links.unwrap_or_default() {
            if link.name.is_empty() {
                return Err(Error::Corruption(format!(
                    "{} has an unnamed link to {}",
                    hash, link.hash
                )));
            }
            links.insert(link.name, parse_hash(&link.hash)?);
        }

        Ok(Some(MerkleNode { data, links }))
    }

    async fn get_data(&self, hash: &Multihash) -> Result<Option<Vec<u8>>> {
        let query = [("arg", hash.to_string())];
        let response =
            match absent_as_none(send(&self.config, &self.client, "object/data", &query, None).await)? {
                Some(response) => response,
                None => return Ok(None),
            };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("object/data: {}", e)))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn put(&self, writer: &WriterKey, node: &MerkleNode) -> Result<Multihash> {
        for label in node.links.keys() {
            validate_label(label)?;
        }

        // Each patch targets the address the previous one returned
        let mut current = self.patch_data(&self.empty, &node.data).await?;
        for (label, target) in &node.links {
            current = self.patch_link(&current, label, target).await?;
        }

        debug!(%writer, hash = %current, links = node.links.len(), "put node");
        Ok(current)
    }

    async fn recursive_pin(&self, hash: &Multihash) -> Result<bool> {
        let query = [("arg", hash.to_string()), ("recursive", "true".to_string())];
        match absent_as_none(self.call::<PinList>("pin/add", &query, None).await)? {
            Some(body) => Ok(contains_hash(body.pins, hash)),
            None => Ok(false),
        }
    }

    async fn recursive_unpin(&self, hash: &Multihash) -> Result<bool> {
        let query = [("arg", hash.to_string()), ("recursive", "true".to_string())];
        match absent_as_none(self.call::<PinList>("pin/rm", &query, None).await)? {
            Some(body) => Ok(contains_hash(body.pins, hash)),
            None => Ok(false),
        }
    }
}
