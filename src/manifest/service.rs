//! Service object: exposes the pods on a node port.

use serde::Serialize;

use crate::config::KubernetesConfig;

use super::deployment::HTTP_PORT_NAME;
use super::{app_labels, Labels, ObjectMeta};

pub const SERVICE_TYPE_NODE_PORT: &str = "NodePort";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSpec {
    #[serde(rename = "type")]
    pub service_type: &'static str,
    pub selector: Labels,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub name: &'static str,
    pub protocol: &'static str,
    /// Port on the service's cluster IP
    pub port: u16,
    /// Port on the pods traffic is forwarded to
    pub target_port: u16,
    /// Port opened on every node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_port: Option<u16>,
}

impl Service {
    /// Build a NodePort Service forwarding `config.node_port` to `container_port`.
    pub fn from_config(config: &KubernetesConfig, container_port: u16) -> Self {
        let labels = app_labels(&config.app_name);

        Self {
            api_version: "v1",
            kind: "Service",
            metadata: ObjectMeta::named(&config.app_name, &config.namespace, labels.clone()),
            spec: ServiceSpec {
                service_type: SERVICE_TYPE_NODE_PORT,
                selector: labels,
                ports: vec![ServicePort {
                    name: HTTP_PORT_NAME,
                    protocol: "TCP",
                    port: container_port,
                    target_port: container_port,
                    node_port: Some(config.node_port),
                }],
            },
        }
    }
}
