//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in declared order
//! - Look up matching route for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Declared order is the contract: first match wins

use crate::config::RouteConfig;
use crate::routing::matcher::PathPrefixMatcher;

/// A compiled route.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    matcher: PathPrefixMatcher,
    /// Identifier of the backend service requests are forwarded to.
    pub target: String,
    pub requires_auth: bool,
    pub required_module: Option<String>,
}

impl RouteDescriptor {
    pub fn path_prefix(&self) -> &str {
        self.matcher.prefix()
    }

    /// Path as seen by the backend: the route prefix removed.
    pub fn rewrite<'a>(&self, path: &'a str) -> &'a str {
        self.matcher.strip(path)
    }
}

impl From<RouteConfig> for RouteDescriptor {
    fn from(config: RouteConfig) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(config.path_prefix),
            target: config.target,
            requires_auth: config.requires_auth,
            required_module: config.required_module,
        }
    }
}

/// Ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Compile routes, preserving declared order.
    pub fn from_config(routes: Vec<RouteConfig>) -> Self {
        let routes: Vec<RouteDescriptor> = routes.into_iter().map(RouteDescriptor::from).collect();

        for route in &routes {
            if route.required_module.is_some() && !route.requires_auth {
                tracing::warn!(
                    prefix = %route.path_prefix(),
                    "Route requires a module but not authentication; requests will be rejected"
                );
            }
        }

        Self { routes }
    }

    /// Find the first route whose prefix covers `path`.
    pub fn resolve(&self, path: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.matcher.matches(path))
    }

    /// All configured prefixes, in declared order.
    pub fn prefixes(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.path_prefix().to_string()).collect()
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    fn default_table() -> RouteTable {
        RouteTable::from_config(GatewayConfig::default().routes)
    }

    #[test]
    fn test_resolves_module_route() {
        let table = default_table();
        let route = table.resolve("/api/ventas/facturas/7").unwrap();
        assert_eq!(route.target, "sales");
        assert!(route.requires_auth);
        assert_eq!(route.required_module.as_deref(), Some("VENTAS"));
        assert_eq!(route.rewrite("/api/ventas/facturas/7"), "/facturas/7");
    }

    #[test]
    fn test_public_route() {
        let table = default_table();
        let route = table.resolve("/api/auth/login").unwrap();
        assert_eq!(route.target, "auth");
        assert!(!route.requires_auth);
    }

    #[test]
    fn test_similar_prefixes_resolve_independently() {
        let table = default_table();
        assert_eq!(table.resolve("/api/clientes/3").unwrap().target, "clients");
        assert_eq!(
            table.resolve("/api/clientes-licensing/3").unwrap().target,
            "licensing"
        );
        assert_eq!(table.resolve("/api/licencias").unwrap().target, "licensing");
    }

    #[test]
    fn test_first_declared_match_wins() {
        let table = RouteTable::from_config(vec![
            RouteConfig::protected("/api/licencias", "licensing"),
            RouteConfig::public("/api", "catch-all"),
        ]);
        assert_eq!(table.resolve("/api/licencias/1").unwrap().target, "licensing");
        assert_eq!(table.resolve("/api/other").unwrap().target, "catch-all");

        let reversed = RouteTable::from_config(vec![
            RouteConfig::public("/api", "catch-all"),
            RouteConfig::protected("/api/licencias", "licensing"),
        ]);
        assert_eq!(reversed.resolve("/api/licencias/1").unwrap().target, "catch-all");
    }

    #[test]
    fn test_no_match() {
        let table = default_table();
        assert!(table.resolve("/api/nonexistent").is_none());
        assert!(table.resolve("/api/auth2").is_none());
        assert_eq!(table.prefixes().len(), 11);
        assert_eq!(table.prefixes()[0], "/api/auth");
    }
}
