//! Mapping inbound requests to a cluster.

use http::header::{AUTHORIZATION, COOKIE};
use http::{HeaderMap, HeaderValue, Uri};
use netes_core::{CLUSTER_ID_HEADER, TOKEN_COOKIE};

/// Extract the cluster id an inbound request addresses.
///
/// The `X-API-Cluster-Id` header wins when non-empty. Otherwise the path is
/// split on `/`; with more than three segments and a second segment starting
/// with `cluster`, the third segment is the id (`/k8s/clusters/{id}/...`).
pub fn cluster_id<'a>(headers: &'a HeaderMap, path: &'a str) -> Option<&'a str> {
    if let Some(id) = headers
        .get(CLUSTER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        && !id.is_empty()
    {
        return Some(id);
    }

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() > 3 && parts[2].starts_with("cluster") && !parts[3].is_empty() {
        return Some(parts[3]);
    }
    None
}

/// The parts of an inbound request the directory needs.
///
/// Owned and `Sync`, so it can be held across awaits while the request
/// body stays with the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterRequest {
    cluster_id: Option<String>,
    authorization: Option<HeaderValue>,
    token_cookie: Option<String>,
}

impl ClusterRequest {
    /// Capture cluster id and credentials from request headers and URI.
    pub fn from_parts(headers: &HeaderMap, uri: &Uri) -> Self {
        Self {
            cluster_id: cluster_id(headers, uri.path()).map(str::to_string),
            authorization: headers.get(AUTHORIZATION).cloned(),
            token_cookie: token_cookie(headers),
        }
    }

    /// A request for `cluster_id` without credentials.
    pub fn new(cluster_id: impl Into<String>) -> Self {
        let id = cluster_id.into();
        Self {
            cluster_id: (!id.is_empty()).then_some(id),
            ..Default::default()
        }
    }

    pub fn with_authorization(mut self, value: HeaderValue) -> Self {
        self.authorization = Some(value);
        self
    }

    pub fn with_token_cookie(mut self, token: impl Into<String>) -> Self {
        self.token_cookie = Some(token.into());
        self
    }

    /// The addressed cluster id, `None` when the request names none.
    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id.as_deref()
    }

    pub fn authorization(&self) -> Option<&HeaderValue> {
        self.authorization.as_ref()
    }

    pub fn token_cookie(&self) -> Option<&str> {
        self.token_cookie.as_deref()
    }
}

fn token_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn header_wins_over_path() {
        let h = headers(&[("x-api-cluster-id", "c1")]);
        assert_eq!(cluster_id(&h, "/k8s/clusters/c2/api"), Some("c1"));
    }

    #[test]
    fn path_convention() {
        let h = HeaderMap::new();
        assert_eq!(cluster_id(&h, "/k8s/clusters/c2/api"), Some("c2"));
        assert_eq!(cluster_id(&h, "/v3/cluster/c9/x"), Some("c9"));
    }

    #[test]
    fn too_few_segments() {
        assert_eq!(cluster_id(&HeaderMap::new(), "/k8s/clusters"), None);
    }

    #[test]
    fn second_segment_must_start_with_cluster() {
        assert_eq!(cluster_id(&HeaderMap::new(), "/k8s/nodes/c2"), None);
    }

    #[test]
    fn three_segments_exactly_is_enough() {
        // "/k8s/clusters/c2" splits into four parts including the leading empty one
        assert_eq!(cluster_id(&HeaderMap::new(), "/k8s/clusters/c2"), Some("c2"));
    }

    #[test]
    fn empty_header_falls_back_to_path() {
        let h = headers(&[("x-api-cluster-id", "")]);
        assert_eq!(cluster_id(&h, "/k8s/clusters/c2/api"), Some("c2"));
    }

    #[test]
    fn empty_id_segment_is_none() {
        assert_eq!(cluster_id(&HeaderMap::new(), "/k8s/clusters//api"), None);
    }

    #[test]
    fn captures_credentials() {
        let h = headers(&[
            ("authorization", "Bearer abc"),
            ("cookie", "lang=en; token=t0k"),
        ]);
        let uri: Uri = "/k8s/clusters/c2/api/v1".parse().unwrap();
        let req = ClusterRequest::from_parts(&h, &uri);
        assert_eq!(req.cluster_id(), Some("c2"));
        assert_eq!(req.authorization().unwrap(), "Bearer abc");
        assert_eq!(req.token_cookie(), Some("t0k"));
    }

    #[test]
    fn token_cookie_in_second_header() {
        let h = headers(&[("cookie", "a=1"), ("cookie", "token=xyz")]);
        let req = ClusterRequest::from_parts(&h, &Uri::from_static("/"));
        assert_eq!(req.cluster_id(), None);
        assert_eq!(req.token_cookie(), Some("xyz"));
    }

    #[test]
    fn empty_id_is_no_cluster() {
        assert_eq!(ClusterRequest::new("").cluster_id(), None);
        assert_eq!(ClusterRequest::new("c1").cluster_id(), Some("c1"));
    }
}
