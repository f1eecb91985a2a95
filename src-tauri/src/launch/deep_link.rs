use serde::Serialize;
use url::Url;

pub const DEEP_LINK_SCHEME: &str = "touchtyper";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeepLinkTarget {
    Practice,
    Settings,
    Stats,
}

impl DeepLinkTarget {
    fn from_host(host: &str) -> Option<Self> {
        match host {
            "practice" => Some(DeepLinkTarget::Practice),
            "settings" => Some(DeepLinkTarget::Settings),
            "stats" => Some(DeepLinkTarget::Stats),
            _ => None,
        }
    }
}

/// Navigation intent delivered to the renderer as the `deep-link` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepLinkAction {
    pub action: DeepLinkTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Passed through as-is; the renderer validates it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Returns `None` for anything that is not a `touchtyper://` link to a known
/// feature; never fails.
pub fn parse_deep_link(raw: &str) -> Option<DeepLinkAction> {
    let url = Url::parse(raw).ok()?;
    if url.scheme() != DEEP_LINK_SCHEME {
        return None;
    }
    let action = DeepLinkTarget::from_host(url.host_str()?)?;

    let mut duration = None;
    let mut mode = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "duration" => duration = value.parse().ok(),
            "mode" => mode = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(DeepLinkAction {
        action,
        duration,
        mode,
    })
}

/// First argument that looks like one of our deep links.
pub fn extract_deep_link(argv: &[String]) -> Option<&str> {
    let prefix = format!("{DEEP_LINK_SCHEME}://");
    argv.iter()
        .map(String::as_str)
        .find(|arg| arg.starts_with(&prefix))
}
