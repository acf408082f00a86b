use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts, uri::Authority},
};

/// Scheme and host the client used to reach us, for building absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
}

impl Origin {
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Extracts the request [`Origin`] from `Host` and `X-Forwarded-Proto`.
///
/// Holds `None` when the request has no usable `Host`, in which case URLs are
/// emitted relative to the server root.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin(pub Option<Origin>);

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Authority>().ok())
            .filter(|a| !a.host().is_empty());

        let Some(host) = host else {
            return Self(None);
        };

        let scheme = match headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
        {
            Some(proto) if proto == "https" => "https",
            _ => "http",
        };

        // Rebuild from host and port so any userinfo is dropped.
        let host = match host.port_u16() {
            Some(port) => format!("{}:{}", host.host(), port),
            None => host.host().to_string(),
        };

        Self(Some(Origin {
            scheme: scheme.to_string(),
            host,
        }))
    }
}

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
