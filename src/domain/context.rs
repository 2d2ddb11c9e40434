//! Typed view of the context object handed over by the mini-app host.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUser {
    pub fid: u64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub client_fid: Option<u64>,
    #[serde(default)]
    pub added: bool,
}

/// Host context; every part may be missing when running outside a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniAppContext {
    #[serde(default)]
    pub user: Option<ContextUser>,
    #[serde(default)]
    pub client: Option<ClientInfo>,
}

impl MiniAppContext {
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Display name, then username, then `fid:<n>`; `None` without a user.
    pub fn display_name(&self) -> Option<String> {
        let user = self.user.as_ref()?;
        user.display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| user.username.clone())
            .or_else(|| Some(format!("fid:{}", user.fid)))
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.user.as_ref()?.pfp_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_full_host_context() {
        let ctx = MiniAppContext::from_json(json!({
            "user": {
                "fid": 6841,
                "username": "deodad",
                "displayName": "Tony D'Addeo",
                "pfpUrl": "https://i.imgur.com/dMoIan7.jpg"
            },
            "client": { "clientFid": 9152, "added": true },
            "location": { "type": "launcher" }
        }))
        .unwrap();

        assert_eq!(ctx.display_name().as_deref(), Some("Tony D'Addeo"));
        assert_eq!(ctx.avatar_url(), Some("https://i.imgur.com/dMoIan7.jpg"));
        assert_eq!(ctx.client.unwrap().client_fid, Some(9152));
    }

    #[test]
    fn test_missing_user_is_none() {
        let ctx = MiniAppContext::from_json(json!({})).unwrap();
        assert_eq!(ctx.display_name(), None);
        assert_eq!(ctx.avatar_url(), None);
    }

    #[test]
    fn test_display_name_falls_back() {
        let ctx = MiniAppContext::from_json(json!({ "user": { "fid": 7 } })).unwrap();
        assert_eq!(ctx.display_name().as_deref(), Some("fid:7"));

        let ctx = MiniAppContext::from_json(json!({
            "user": { "fid": 7, "username": "alice", "displayName": " " }
        }))
        .unwrap();
        assert_eq!(ctx.display_name().as_deref(), Some("alice"));
    }
}
