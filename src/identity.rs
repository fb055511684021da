//! Identity of the principal whose wizard progress is being stored.

use std::fmt;

/// Collaborator exposing who is making the current request.
pub trait IdentityResolver {
    fn current_user_id(&self) -> Option<i64>;
    fn request_ip_address(&self) -> String;
}

/// Who owns a stored wizard document, resolved once per request.
///
/// An authenticated user is keyed by id, anyone else by network address.
/// Logging in mid-flow switches the identity and leaves the anonymous row
/// behind; the two are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Authenticated(i64),
    Anonymous(String),
}

impl Identity {
    pub fn resolve(resolver: &dyn IdentityResolver) -> Self {
        match resolver.current_user_id() {
            Some(id) => Identity::Authenticated(id),
            None => Identity::Anonymous(resolver.request_ip_address()),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::Authenticated(id) => Some(*id),
            Identity::Anonymous(_) => None,
        }
    }

    pub fn ip_address(&self) -> Option<&str> {
        match self {
            Identity::Authenticated(_) => None,
            Identity::Anonymous(ip) => Some(ip),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Authenticated(id) => write!(f, "user:{}", id),
            Identity::Anonymous(ip) => write!(f, "ip:{}", ip),
        }
    }
}

/// Plain request facts, used where no framework guard is available.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    pub user_id: Option<i64>,
    pub ip_address: String,
}

impl IdentityResolver for RequestIdentity {
    fn current_user_id(&self) -> Option<i64> {
        self.user_id
    }

    fn request_ip_address(&self) -> String {
        self.ip_address.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_user_id() {
        let request = RequestIdentity {
            user_id: Some(777),
            ip_address: "123.456.789.000".to_string(),
        };
        let identity = Identity::resolve(&request);

        assert_eq!(identity, Identity::Authenticated(777));
        assert_eq!(identity.user_id(), Some(777));
        assert_eq!(identity.ip_address(), None);
        assert_eq!(identity.to_string(), "user:777");
    }

    #[test]
    fn test_resolve_falls_back_to_ip_address() {
        let request = RequestIdentity {
            user_id: None,
            ip_address: "127.0.0.1".to_string(),
        };
        let identity = Identity::resolve(&request);

        assert_eq!(identity, Identity::Anonymous("127.0.0.1".to_string()));
        assert_eq!(identity.ip_address(), Some("127.0.0.1"));
        assert_eq!(identity.to_string(), "ip:127.0.0.1");
    }
}
