//! Connection configuration types.

use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 143).
    StartTls,
    /// TLS from the start (port 993). **Recommended.**
    #[default]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// Poll command used when the server lacks IDLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingIdleCommand {
    /// Poll with NOOP (default).
    #[default]
    Noop,
    /// Poll with SELECT of the current mailbox.
    Select,
    /// Poll with STATUS of the current mailbox.
    Status,
}

/// Authentication settings.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Account username.
    pub user: String,
    /// Password, for LOGIN / AUTH=PLAIN / AUTH=LOGIN.
    pub pass: Option<String>,
    /// `OAuth2` access token, for XOAUTH2 / OAUTHBEARER.
    pub access_token: Option<String>,
    /// Force a specific mechanism instead of the negotiated priority.
    pub login_method: Option<String>,
    /// Authorization identity for AUTH=PLAIN.
    pub authzid: Option<String>,
}

impl AuthConfig {
    /// Creates password credentials.
    #[must_use]
    pub fn password(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: Some(pass.into()),
            ..Self::default()
        }
    }

    /// Creates `OAuth2` credentials.
    #[must_use]
    pub fn access_token(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            access_token: Some(token.into()),
            ..Self::default()
        }
    }
}

/// IMAP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// TLS server name, when it differs from `host` (e.g. behind a proxy).
    pub servername: Option<String>,
    /// Credentials for `authenticate`.
    pub auth: Option<AuthConfig>,
    /// Client identification sent with ID (RFC 2971).
    pub client_info: Option<Vec<(String, String)>>,
    /// Request QRESYNC-aware selection when the server supports it.
    pub qresync: bool,
    /// Never issue COMPRESS even if advertised.
    pub disable_compression: bool,
    /// Never use BINARY fetch/append even if advertised.
    pub disable_binary: bool,
    /// Skip the automatic ENABLE after authentication.
    pub disable_auto_enable: bool,
    /// Restart IDLE after this long to keep the connection alive.
    pub max_idle_time: Duration,
    /// Poll command used when the server lacks IDLE.
    pub missing_idle_command: MissingIdleCommand,
    /// Connection establishment timeout.
    pub connection_timeout: Duration,
    /// Server greeting timeout.
    pub greeting_timeout: Duration,
    /// Socket inactivity timeout.
    pub socket_timeout: Duration,
    /// Log raw wire traffic at trace level.
    pub log_raw: bool,
}

impl Config {
    /// Creates a new configuration with implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 993,
            security: Security::Implicit,
            servername: None,
            auth: None,
            client_info: None,
            qresync: false,
            disable_compression: false,
            disable_binary: false,
            disable_auto_enable: false,
            max_idle_time: Duration::from_secs(5 * 60),
            missing_idle_command: MissingIdleCommand::default(),
            connection_timeout: Duration::from_secs(90),
            greeting_timeout: Duration::from_secs(16),
            socket_timeout: Duration::from_secs(300),
            log_raw: false,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Returns the TLS server name to verify against.
    #[must_use]
    pub fn tls_servername(&self) -> &str {
        self.servername.as_deref().unwrap_or(&self.host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: Config::new(host),
        }
    }

    /// Sets the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the security mode; resets the port to the mode's default.
    #[must_use]
    pub fn security(mut self, security: Security) -> Self {
        self.config.security = security;
        self.config.port = security.default_port();
        self
    }

    /// Sets the TLS server name.
    #[must_use]
    pub fn servername(mut self, servername: impl Into<String>) -> Self {
        self.config.servername = Some(servername.into());
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.config.auth = Some(auth);
        self
    }

    /// Sets the ID client info.
    #[must_use]
    pub fn client_info(mut self, info: Vec<(String, String)>) -> Self {
        self.config.client_info = Some(info);
        self
    }

    /// Requests QRESYNC-aware selection.
    #[must_use]
    pub fn qresync(mut self, enabled: bool) -> Self {
        self.config.qresync = enabled;
        self
    }

    /// Disables COMPRESS=DEFLATE.
    #[must_use]
    pub fn disable_compression(mut self) -> Self {
        self.config.disable_compression = true;
        self
    }

    /// Disables BINARY fetch/append.
    #[must_use]
    pub fn disable_binary(mut self) -> Self {
        self.config.disable_binary = true;
        self
    }

    /// Skips the automatic ENABLE after authentication.
    #[must_use]
    pub fn disable_auto_enable(mut self) -> Self {
        self.config.disable_auto_enable = true;
        self
    }

    /// Sets the IDLE restart interval.
    #[must_use]
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.config.max_idle_time = duration;
        self
    }

    /// Sets the poll command for servers without IDLE.
    #[must_use]
    pub fn missing_idle_command(mut self, command: MissingIdleCommand) -> Self {
        self.config.missing_idle_command = command;
        self
    }

    /// Sets the connection establishment timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Sets the greeting timeout.
    #[must_use]
    pub fn greeting_timeout(mut self, timeout: Duration) -> Self {
        self.config.greeting_timeout = timeout;
        self
    }

    /// Sets the socket inactivity timeout.
    #[must_use]
    pub fn socket_timeout(mut self, timeout: Duration) -> Self {
        self.config.socket_timeout = timeout;
        self
    }

    /// Enables raw wire logging at trace level.
    #[must_use]
    pub fn log_raw(mut self) -> Self {
        self.config.log_raw = true;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 143);
        assert_eq!(Security::StartTls.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.connection_timeout, Duration::from_secs(90));
        assert_eq!(config.greeting_timeout, Duration::from_secs(16));
        assert_eq!(config.socket_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .security(Security::StartTls)
            .auth(AuthConfig::password("user", "pass"))
            .qresync(true)
            .build();

        assert_eq!(config.port, 143);
        assert!(config.qresync);
        assert_eq!(config.auth.map(|a| a.user), Some("user".to_string()));
    }

    #[test]
    fn test_tls_servername_falls_back_to_host() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.tls_servername(), "imap.example.com");

        let config = Config::builder("10.0.0.1").servername("imap.example.com").build();
        assert_eq!(config.tls_servername(), "imap.example.com");
    }
}
