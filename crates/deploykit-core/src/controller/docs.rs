//! API documentation publishing.
//!
//! Docs are best effort: a failed upload is logged and the surrounding
//! operation carries on.

use std::path::Path;

use anyhow::Context;
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use super::Controller;
use crate::config::DocsConfig;

/// Uploads one file to one URL.
pub trait DocsUploader {
    fn upload(&self, file: &Path, url: &Url) -> anyhow::Result<()>;
}

/// HTTP PUT with basic authentication.
#[derive(Debug)]
pub struct HttpUploader {
    client: reqwest::blocking::Client,
    user: String,
    password: Option<String>,
}

impl HttpUploader {
    /// Credentials come from `docs.user` and the variable named by
    /// `docs.password_env`.
    pub fn from_config(docs: &DocsConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            user: docs.user.clone(),
            password: std::env::var(&docs.password_env).ok(),
        })
    }
}

impl DocsUploader for HttpUploader {
    fn upload(&self, file: &Path, url: &Url) -> anyhow::Result<()> {
        let body = std::fs::read(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        self.client
            .put(url.clone())
            .basic_auth(&self.user, self.password.as_ref())
            .body(body)
            .send()
            .with_context(|| format!("Failed to upload {} to {}", file.display(), url))?
            .error_for_status()
            .with_context(|| format!("Upload of {} to {} was rejected", file.display(), url))?;
        Ok(())
    }
}

/// `<base>/<stage>/`, tolerant of a base URL without trailing slash.
pub fn stage_url(base: &str, stage: &str) -> anyhow::Result<Url> {
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = Url::parse(&base).with_context(|| format!("Invalid docs base URL: {base}"))?;
    base.join(&format!("{stage}/"))
        .with_context(|| format!("Invalid stage for docs URL: {stage}"))
}

/// Versionless alias of a schema file name: `v1.api.json` → `latest.api.json`.
pub fn latest_alias(schema: &str) -> anyhow::Result<String> {
    let version = Regex::new(r"v\d+")?;
    Ok(version.replace_all(schema, "latest").into_owned())
}

fn file_name(path: &Path) -> anyhow::Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("Path has no file name: {}", path.display()))
}

impl Controller<'_> {
    /// Publish the API schemas and changelog for `stage`. Returns whether
    /// everything was uploaded; failures are logged, never raised.
    pub fn publish_docs(&mut self, stage: &str) -> bool {
        info!("publishing docs to {}", stage);
        match self.upload_docs(stage) {
            Ok(()) => true,
            Err(e) => {
                warn!("ERROR: {:#}", e);
                warn!("docs was not published!");
                false
            }
        }
    }

    fn upload_docs(&self, stage: &str) -> anyhow::Result<()> {
        let config = self.fleet.config();
        let docs = &config.docs;
        let stage_url = stage_url(&config.docs_base_url(), stage)?;

        for schema in &docs.schemas {
            let path = docs.schema_dir.join(schema);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read schema {}", path.display()))?;
            serde_json::from_str::<serde_json::Value>(&content)
                .with_context(|| format!("Schema {} is not valid JSON", path.display()))?;

            for name in [schema.clone(), latest_alias(schema)?] {
                let url = stage_url.join(&name)?;
                info!("uploading {} to {}", path.display(), url);
                self.uploader.upload(&path, &url)?;
            }
        }

        let url = stage_url.join(file_name(&docs.changelog)?)?;
        info!("uploading {} to {}", docs.changelog.display(), url);
        self.uploader.upload(&docs.changelog, &url)?;

        Ok(())
    }
}
