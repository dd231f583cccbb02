//! Deployment object: the pods running the message service.

use serde::Serialize;

use crate::config::{ImagePullPolicy, KubernetesConfig, HEALTH_PATH};

use super::{app_labels, Labels, ObjectMeta};

/// Name of the container port, referenced by humans reading `kubectl describe`
pub const HTTP_PORT_NAME: &str = "http";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: ObjectMeta,
    pub spec: DeploymentSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    pub replicas: u32,
    pub selector: LabelSelector,
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: Labels,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodTemplateSpec {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodSpec {
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    pub image_pull_policy: ImagePullPolicy,
    pub ports: Vec<ContainerPort>,
    pub liveness_probe: Probe,
    pub readiness_probe: Probe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub name: &'static str,
    pub container_port: u16,
    pub protocol: &'static str,
}

/// HTTP probe against the health route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub http_get: HttpGetAction,
    pub initial_delay_seconds: u32,
    pub period_seconds: u32,
    pub timeout_seconds: u32,
    pub failure_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpGetAction {
    pub path: &'static str,
    pub port: u16,
}

impl Probe {
    fn health(port: u16, initial_delay_seconds: u32, period_seconds: u32) -> Self {
        Self {
            http_get: HttpGetAction {
                path: HEALTH_PATH,
                port,
            },
            initial_delay_seconds,
            period_seconds,
            timeout_seconds: 2,
            failure_threshold: 3,
        }
    }
}

impl Deployment {
    /// Build the Deployment for `config`, with pods listening on `container_port`.
    pub fn from_config(config: &KubernetesConfig, container_port: u16) -> Self {
        let labels = app_labels(&config.app_name);

        Self {
            api_version: "apps/v1",
            kind: "Deployment",
            metadata: ObjectMeta::named(&config.app_name, &config.namespace, labels.clone()),
            spec: DeploymentSpec {
                replicas: config.replicas,
                selector: LabelSelector {
                    match_labels: labels.clone(),
                },
                template: PodTemplateSpec {
                    metadata: ObjectMeta::labels_only(labels),
                    spec: PodSpec {
                        containers: vec![Container {
                            name: config.app_name.clone(),
                            image: config.image.clone(),
                            image_pull_policy: config.image_pull_policy,
                            ports: vec![ContainerPort {
                                name: HTTP_PORT_NAME,
                                container_port,
                                protocol: "TCP",
                            }],
                            liveness_probe: Probe::health(container_port, 5, 10),
                            readiness_probe: Probe::health(container_port, 2, 5),
                        }],
                    },
                },
            },
        }
    }

    /// Every port any container in the pod template exposes.
    pub fn container_ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.spec
            .template
            .spec
            .containers
            .iter()
            .flat_map(|c| c.ports.iter().map(|p| p.container_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_deployment() {
        let deployment = Deployment::from_config(&KubernetesConfig::default(), 8080);
        assert_eq!(deployment.metadata.name.as_deref(), Some("kube-message"));
        assert_eq!(deployment.spec.replicas, 2);
        assert_eq!(
            deployment.spec.selector.match_labels,
            deployment.spec.template.metadata.labels
        );

        let container = &deployment.spec.template.spec.containers[0];
        assert_eq!(container.image, crate::config::DEFAULT_IMAGE);
        assert_eq!(container.image_pull_policy, ImagePullPolicy::IfNotPresent);
        assert_eq!(container.liveness_probe.http_get.path, "/health");
        assert_eq!(container.readiness_probe.http_get.port, 8080);
        assert_eq!(deployment.container_ports().collect::<Vec<_>>(), vec![8080]);
    }

    #[test]
    fn test_serialized_shape() {
        let mut config = KubernetesConfig::default();
        config.replicas = 4;
        config.image = "registry.local/kube-message:dev".to_string();
        let json = serde_json::to_value(Deployment::from_config(&config, 9000)).unwrap();

        assert_eq!(json["apiVersion"], "apps/v1");
        assert_eq!(json["kind"], "Deployment");
        assert_eq!(json["metadata"]["namespace"], "default");
        assert_eq!(json["spec"]["replicas"], 4);
        assert_eq!(json["spec"]["selector"]["matchLabels"]["app"], "kube-message");
        assert_eq!(json["spec"]["template"]["metadata"]["labels"]["app"], "kube-message");
        assert!(json["spec"]["template"]["metadata"].get("name").is_none());

        let container = &json["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["image"], "registry.local/kube-message:dev");
        assert_eq!(container["imagePullPolicy"], "IfNotPresent");
        assert_eq!(container["ports"][0]["containerPort"], 9000);
        assert_eq!(container["ports"][0]["protocol"], "TCP");
        assert_eq!(container["livenessProbe"]["httpGet"]["path"], "/health");
        assert_eq!(container["readinessProbe"]["initialDelaySeconds"], 2);
    }
}
