use std::fmt;
use shared::protocol::DEFAULT_DOMAIN;
use crate::error::{BrowseError, Result};

/// A browsable service type such as `_http._tcp` in domain `local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceType {
    /// `_service._proto`, without trailing dot
    pub service: String,
    /// Domain without trailing dot, e.g. "local"
    pub domain: String,
}

impl ServiceType {
    /// Parse `_http._tcp`, `_http._tcp.` or `_http._tcp.local.`.
    pub fn parse(input: &str) -> Result<Self> {
        let labels: Vec<&str> = input
            .trim_end_matches('.')
            .split('.')
            .collect();

        if labels.len() < 2
            || labels[..2].iter().any(|l| l.len() < 2 || !l.starts_with('_'))
            || labels[2..].iter().any(|l| l.is_empty())
        {
            return Err(BrowseError::InvalidServiceType(input.to_string()));
        }

        let domain = if labels.len() > 2 {
            labels[2..].join(".")
        } else {
            DEFAULT_DOMAIN.to_string()
        };

        Ok(Self {
            service: labels[..2].join("."),
            domain,
        })
    }

    /// Fully-qualified name queried for, e.g. `_http._tcp.local.`
    pub fn fqdn(&self) -> String {
        format!("{}.{}.", self.service, self.domain)
    }

    /// Whether a record's service/domain pair belongs to this type.
    /// DNS names compare case-insensitively.
    pub fn matches(&self, service: &str, domain: &str) -> bool {
        self.service.eq_ignore_ascii_case(service) && self.domain.eq_ignore_ascii_case(domain)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqdn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        for input in ["_http._tcp", "_http._tcp.", "_http._tcp.local."] {
            let st = ServiceType::parse(input).unwrap();
            assert_eq!(st.service, "_http._tcp");
            assert_eq!(st.domain, "local");
            assert_eq!(st.fqdn(), "_http._tcp.local.");
        }
    }

    #[test]
    fn test_parse_multi_label_domain() {
        let st = ServiceType::parse("_ipp._tcp.office.example.").unwrap();
        assert_eq!(st.domain, "office.example");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in ["", "http", "_http", "http._tcp", "_http.tcp.local", "_http._tcp..local", "_._tcp"] {
            assert!(
                matches!(ServiceType::parse(input), Err(BrowseError::InvalidServiceType(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_matches_ignores_case() {
        let st = ServiceType::parse("_http._tcp").unwrap();
        assert!(st.matches("_HTTP._tcp", "Local"));
        assert!(!st.matches("_ipp._tcp", "local"));
    }
}
