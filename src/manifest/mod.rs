//! Kubernetes manifests for the message service.
//!
//! Renders the Deployment and the NodePort Service from the same
//! configuration the server runs with, so the container port, labels and
//! replica count in the cluster match the binary. Output is JSON, which
//! `kubectl apply -f` accepts like any other YAML document.
//!
//! - Deployment: `replicas` pods selected by `app=<app_name>`
//! - Service: `node_port` on every node forwarded to the pods' HTTP port

pub mod deployment;
pub mod service;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{AppConfig, NODE_PORT_RANGE};

pub use deployment::Deployment;
pub use service::Service;

/// Label key tying the Service and Deployment to their pods
pub const APP_LABEL: &str = "app";

/// File names used by [`ManifestSet::write_dir`]
pub const DEPLOYMENT_FILE: &str = "deployment.json";
pub const SERVICE_FILE: &str = "service.json";

/// Ordered so rendered manifests are stable across runs.
pub type Labels = BTreeMap<String, String>;

pub fn app_labels(app_name: &str) -> Labels {
    Labels::from([(APP_LABEL.to_string(), app_name.to_string())])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: Labels,
}

impl ObjectMeta {
    fn named(name: &str, namespace: &str, labels: Labels) -> Self {
        Self {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels,
        }
    }

    fn labels_only(labels: Labels) -> Self {
        Self {
            name: None,
            namespace: None,
            labels,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Deployment contract violated: {0}")]
    Contract(String),

    #[error("Failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write manifest: {0}")]
    Io(#[from] std::io::Error),
}

/// `v1/List` wrapper so both objects can go through a single `kubectl apply -f -`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestList<'a> {
    api_version: &'static str,
    kind: &'static str,
    items: (&'a Deployment, &'a Service),
}

/// The Deployment and Service that together make up one installation.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSet {
    pub deployment: Deployment,
    pub service: Service,
}

impl ManifestSet {
    pub fn from_config(config: &AppConfig) -> Self {
        let container_port = config.http.port;
        Self {
            deployment: Deployment::from_config(&config.kubernetes, container_port),
            service: Service::from_config(&config.kubernetes, container_port),
        }
    }

    /// Check the cross-object invariants a cluster would otherwise only
    /// surface as pods that never receive traffic.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let spec = &self.deployment.spec;
        let template_labels = &spec.template.metadata.labels;

        if spec.replicas == 0 {
            return Err(ManifestError::Contract(
                "deployment must request at least one replica".to_string(),
            ));
        }

        if spec.selector.match_labels.is_empty() {
            return Err(ManifestError::Contract(
                "deployment selector is empty".to_string(),
            ));
        }
        if !is_subset(&spec.selector.match_labels, template_labels) {
            return Err(ManifestError::Contract(format!(
                "deployment selector {:?} does not match pod template labels {:?}",
                spec.selector.match_labels, template_labels
            )));
        }

        let selector = &self.service.spec.selector;
        if selector.is_empty() {
            return Err(ManifestError::Contract(
                "service selector is empty".to_string(),
            ));
        }
        if !is_subset(selector, template_labels) {
            return Err(ManifestError::Contract(format!(
                "service selector {:?} does not select the deployment's pods {:?}",
                selector, template_labels
            )));
        }

        if self.service.spec.ports.is_empty() {
            return Err(ManifestError::Contract(
                "service exposes no ports".to_string(),
            ));
        }
        for port in &self.service.spec.ports {
            if !self
                .deployment
                .container_ports()
                .any(|p| p == port.target_port)
            {
                return Err(ManifestError::Contract(format!(
                    "service targetPort {} is not a container port",
                    port.target_port
                )));
            }
            match port.node_port {
                Some(node_port) if NODE_PORT_RANGE.contains(&node_port) => {}
                Some(node_port) => {
                    return Err(ManifestError::Contract(format!(
                        "nodePort {} is outside {}-{}",
                        node_port,
                        NODE_PORT_RANGE.start(),
                        NODE_PORT_RANGE.end()
                    )));
                }
                None => {
                    return Err(ManifestError::Contract(format!(
                        "service port {} has no nodePort",
                        port.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Both objects as one pretty-printed `v1/List`.
    pub fn to_list_json(&self) -> Result<String, ManifestError> {
        let list = ManifestList {
            api_version: "v1",
            kind: "List",
            items: (&self.deployment, &self.service),
        };
        Ok(serde_json::to_string_pretty(&list)?)
    }

    /// Write one file per object into `dir`, creating it if needed.
    pub fn write_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, ManifestError> {
        std::fs::create_dir_all(dir)?;

        let deployment_path = dir.join(DEPLOYMENT_FILE);
        std::fs::write(
            &deployment_path,
            serde_json::to_string_pretty(&self.deployment)? + "\n",
        )?;

        let service_path = dir.join(SERVICE_FILE);
        std::fs::write(
            &service_path,
            serde_json::to_string_pretty(&self.service)? + "\n",
        )?;

        Ok(vec![deployment_path, service_path])
    }
}

fn is_subset(selector: &Labels, labels: &Labels) -> bool {
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}
