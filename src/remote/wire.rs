//! Request/response shapes of the daemon's `/api/v0` RPC

use serde::Deserialize;

/// Body of `object/new` and `object/patch/*`
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectHash {
    #[serde(rename = "Hash")]
    pub hash: String,
}

/// One link as reported by `object/get`
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectLink {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Hash")]
    pub hash: String,
}

/// Body of `object/get?data-encoding=base64`
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectGet {
    #[serde(rename = "Data", default)]
    pub data: String,
    #[serde(rename = "Links", default)]
    pub links: Option<Vec<ObjectLink>>,
}

/// Body of `pin/add` and `pin/rm`
#[derive(Debug, Deserialize)]
pub(crate) struct PinList {
    #[serde(rename = "Pins", default)]
    pub pins: Option<Vec<String>>,
}

/// Error body the daemon sends with non-2xx statuses
#[derive(Debug, Deserialize)]
pub(crate) struct DaemonError {
    #[serde(rename = "Message")]
    pub message: String,
    /// Always `"error"` on a genuine daemon reply
    #[serde(rename = "Type", default)]
    pub kind: String,
}

impl DaemonError {
    /// Parse a failed response body, accepting only the daemon's own error shape
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<DaemonError>(body)
            .ok()
            .filter(|e| e.kind == "error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_links_decode() {
        let body: ObjectGet = serde_json::from_str(r#"{"Data":"","Links":null}"#).unwrap();
        assert!(body.links.is_none());
        assert!(body.data.is_empty());
    }

    #[test]
    fn test_extra_fields_ignored() {
        let body: ObjectHash =
            serde_json::from_str(r#"{"Hash":"Qm123","Links":[],"Size":0}"#).unwrap();
        assert_eq!(body.hash, "Qm123");

        let err: DaemonError =
            serde_json::from_str(r#"{"Message":"merkledag: not found","Code":0,"Type":"error"}"#)
                .unwrap();
        assert_eq!(err.message, "merkledag: not found");
        assert_eq!(err.kind, "error");
    }

    #[test]
    fn test_daemon_error_shape_required() {
        assert!(DaemonError::parse(r#"{"Message":"merkledag: not found","Code":0,"Type":"error"}"#).is_some());
        assert!(DaemonError::parse("404 page not found").is_none());
        // JSON from something else, e.g. a proxy
        assert!(DaemonError::parse(r#"{"Message":"not found"}"#).is_none());
        assert!(DaemonError::parse(r#"{"error":"not found"}"#).is_none());
    }
}
