/// Connection details of one game server's remote console
#[derive(Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    /// Unique name in the directory
    pub name: String,

    /// Hostname or IP address
    pub host: String,

    /// Remote console TCP port
    pub port: u16,

    /// Shared secret used to authenticate
    pub password: String,
}

impl ServerEndpoint {
    /// Create an endpoint
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            password: password.into(),
        }
    }

    /// `host:port`, suitable for connecting. IPv6 literals are bracketed.
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.parse::<std::net::Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

// Never print the secret.
impl std::fmt::Debug for ServerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerEndpoint")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let endpoint = ServerEndpoint::new("eu-1", "10.0.0.5", 9100, "hunter2");
        let debug = format!("{endpoint:?}");
        assert!(debug.contains("eu-1"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(endpoint.address(), "10.0.0.5:9100");
    }

    #[test]
    fn test_address_brackets_ipv6() {
        let v6 = ServerEndpoint::new("eu-6", "2001:db8::5", 9100, "x");
        assert_eq!(v6.address(), "[2001:db8::5]:9100");
        assert!(v6.address().parse::<std::net::SocketAddr>().is_ok());

        let named = ServerEndpoint::new("us-1", "game.example.org", 9101, "x");
        assert_eq!(named.address(), "game.example.org:9101");
    }
}
