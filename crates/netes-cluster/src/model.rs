//! Cluster descriptor as served by the directory.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A tenant cluster. Read-only once it has been handed to the factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Selects the embedded backend kind.
    #[serde(default)]
    pub embedded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k8s_server_config: Option<K8sServerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_config: Option<EmbeddedConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

/// Server-side configuration block owned by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sServerConfig {
    #[serde(default)]
    pub admission_controllers: Vec<String>,
    #[serde(default)]
    pub service_net_cidr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedConfig {
    #[serde(default)]
    pub service_net_cidr: String,
}

/// Identity the directory resolved for the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Vec<String>>,
}

/// Backend variant a cluster is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Embedded,
    /// No backend can serve this cluster; requests get "no cluster".
    Unsupported,
}

impl Cluster {
    /// Backend kind selected by this descriptor.
    pub fn kind(&self) -> BackendKind {
        if self.embedded {
            BackendKind::Embedded
        } else {
            BackendKind::Unsupported
        }
    }

    /// Make sure the server-side config block is present.
    pub fn ensure_server_config(&mut self) -> &mut K8sServerConfig {
        self.k8s_server_config.get_or_insert_with(K8sServerConfig::default)
    }

    /// Cluster-specific service CIDR, if one is set.
    ///
    /// The server-side block wins over the embedded block.
    pub fn service_net_cidr(&self) -> Option<&str> {
        let server = self
            .k8s_server_config
            .as_ref()
            .map(|c| c.service_net_cidr.as_str());
        let embedded = self
            .embedded_config
            .as_ref()
            .map(|c| c.service_net_cidr.as_str());
        server
            .into_iter()
            .chain(embedded)
            .find(|cidr| !cidr.is_empty())
    }

    /// Cluster-specific admission controllers, if any are set.
    pub fn admission_controllers(&self) -> Option<&[String]> {
        self.k8s_server_config
            .as_ref()
            .map(|c| c.admission_controllers.as_slice())
            .filter(|list| !list.is_empty())
    }
}
