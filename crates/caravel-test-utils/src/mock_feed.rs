//! A wiremock-backed package feed speaking the Caravel feed protocol.

use crate::packages::package_archive;
use std::collections::{BTreeMap, BTreeSet};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock feed serving version indexes and package archives.
///
/// Publishing re-mounts every route so indexes always reflect the full
/// version list.
#[derive(Debug)]
pub struct MockFeed {
    server: MockServer,
    packages: BTreeMap<(String, String), String>,
    broken: BTreeSet<String>,
}

impl MockFeed {
    /// Start an empty feed.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            packages: BTreeMap::new(),
            broken: BTreeSet::new(),
        }
    }

    /// The feed's base URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Publish a package version with the given `package.json` metadata.
    pub async fn publish(&mut self, name: &str, version: &str, metadata: &str) {
        self.packages
            .insert((name.to_string(), version.to_string()), metadata.to_string());
        self.remount().await;
    }

    /// Serve a 500 for a name's index, simulating a broken feed.
    pub async fn break_name(&mut self, name: &str) {
        self.broken.insert(name.to_string());
        self.remount().await;
    }

    async fn remount(&self) {
        self.server.reset().await;

        let mut versions: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for ((name, version), metadata) in &self.packages {
            versions.entry(name).or_default().push(version);
            let archive = package_archive(metadata, &[]);
            Mock::given(method("GET"))
                .and(path(format!("/{name}/{version}/{name}.{version}.zip")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
                .mount(&self.server)
                .await;
        }

        for (name, versions) in versions {
            if self.broken.contains(name) {
                continue;
            }
            let body = serde_json::json!({ "versions": versions });
            Mock::given(method("GET"))
                .and(path(format!("/{name}/index.json")))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&self.server)
                .await;
        }

        for name in &self.broken {
            Mock::given(method("GET"))
                .and(path(format!("/{name}/index.json")))
                .respond_with(ResponseTemplate::new(500))
                .mount(&self.server)
                .await;
        }
    }
}
