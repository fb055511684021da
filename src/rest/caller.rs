//! Who is calling: the identity partitioning stored wizard data and the
//! session that carries it between requests.

use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::identity::{Identity, RequestIdentity};
use crate::rest::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const SESSION_HEADER: &str = "x-wizard-session";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Address used when neither a proxy header nor a peer address is known
const UNKNOWN_ADDRESS: &str = "127.0.0.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: Identity,
    pub session_id: String,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Result<Self, ApiError> {
        let user_id = match header(headers, USER_ID_HEADER) {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                ApiError::BadRequest(format!("Invalid {} header: '{}'", USER_ID_HEADER, raw))
            })?),
            None => None,
        };

        let ip_address = header(headers, FORWARDED_FOR_HEADER)
            .and_then(|forwarded| forwarded.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string());

        let identity = Identity::resolve(&RequestIdentity {
            user_id,
            ip_address,
        });
        let session_id = header(headers, SESSION_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| identity.to_string());

        Ok(Self {
            identity,
            session_id,
        })
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Caller::from_headers(&parts.headers, peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_user_header_wins() {
        let caller = Caller::from_headers(
            &headers(&[("x-user-id", "7"), ("x-forwarded-for", "10.0.0.1")]),
            None,
        )
        .unwrap();

        assert_eq!(caller.identity, Identity::Authenticated(7));
        assert_eq!(caller.session_id, "user:7");
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let caller = Caller::from_headers(
            &headers(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1")]),
            Some("192.168.1.2:5000".parse().unwrap()),
        )
        .unwrap();

        assert_eq!(
            caller.identity,
            Identity::Anonymous("203.0.113.9".to_string())
        );
    }

    #[test]
    fn test_peer_address_fallback() {
        let caller =
            Caller::from_headers(&HeaderMap::new(), Some("192.168.1.2:5000".parse().unwrap()))
                .unwrap();
        assert_eq!(
            caller.identity,
            Identity::Anonymous("192.168.1.2".to_string())
        );

        let caller = Caller::from_headers(&HeaderMap::new(), None).unwrap();
        assert_eq!(caller.identity.ip_address(), Some("127.0.0.1"));
    }

    #[test]
    fn test_explicit_session_header() {
        let caller = Caller::from_headers(
            &headers(&[("x-user-id", "1"), ("x-wizard-session", "abc")]),
            None,
        )
        .unwrap();

        assert_eq!(caller.session_id, "abc");
    }

    #[test]
    fn test_invalid_user_header() {
        let err = Caller::from_headers(&headers(&[("x-user-id", "admin")]), None)
            .err()
            .unwrap();

        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
