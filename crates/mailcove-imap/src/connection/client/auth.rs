//! Connection security and authentication operations.

use mailcove_sasl::{
    LoginPrompt, classify_login_prompt, login_response, oauthbearer_response, parse_oauth_error,
    plain_response, xoauth2_response,
};

use super::ImapClient;
use crate::command::Command;
use crate::connection::config::AuthConfig;
use crate::connection::state::ProtocolState;
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

impl ImapClient {
    /// Upgrades the connection with STARTTLS.
    ///
    /// Requires the not-authenticated state, the STARTTLS capability, and
    /// a plaintext transport; otherwise resolves `false` without touching
    /// the wire. After the handshake the capability set is re-probed.
    pub async fn starttls(&mut self) -> Result<bool> {
        if self.state != ProtocolState::NotAuthenticated
            || !self.has_capability(&Capability::StartTls)
            || self.encrypted
        {
            return Ok(false);
        }

        let result = self.exec(&Command::StartTls).await?;
        if !result.is_ok() {
            tracing::warn!(text = %result.text, "STARTTLS rejected");
            return Ok(false);
        }

        let servername = self.config.tls_servername().to_string();
        let transport = self.take_transport();
        match transport.upgrade_to_tls(&servername).await {
            Ok(upgraded) => {
                self.restore_transport(upgraded);
                self.encrypted = true;
            }
            Err(err) => {
                self.teardown();
                return Err(err);
            }
        }

        // Post-TLS capabilities may differ; the pre-TLS set is void
        self.capabilities.clear();
        self.expect_capability_update = true;
        self.refresh_capabilities().await;

        Ok(true)
    }

    /// Switches the transport to COMPRESS=DEFLATE framing.
    ///
    /// Best-effort: resolves `false` when the capability is missing, the
    /// stream is already compressed, or compression is disabled.
    pub async fn compress(&mut self) -> Result<bool> {
        if self.compressed
            || self.config.disable_compression
            || !self.has_capability(&Capability::CompressDeflate)
            || !self.state.is_authenticated()
        {
            return Ok(false);
        }

        match self.exec(&Command::Compress).await {
            Ok(result) if result.is_ok() => {
                let transport = self.take_transport();
                self.restore_transport(transport.compress());
                self.compressed = true;
                tracing::debug!("deflate compression active");
                Ok(true)
            }
            Ok(result) => {
                tracing::debug!(text = %result.text, "COMPRESS rejected");
                Ok(false)
            }
            Err(err) => {
                tracing::debug!(?err, "COMPRESS failed");
                Ok(false)
            }
        }
    }

    /// Authenticates with LOGIN.
    ///
    /// # Errors
    ///
    /// Raises [`Error::WrongState`] when already authenticated and
    /// [`Error::AuthenticationFailed`] on a server NO.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        if self.state.is_authenticated() {
            return Err(Error::WrongState("already authenticated".to_string()));
        }

        tracing::debug!(username, "LOGIN");
        let result = self
            .exec(&Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        if !result.is_ok() {
            return Err(Error::AuthenticationFailed {
                code: result.code,
                oauth_error: None,
                text: result.text,
            });
        }

        self.finish_authentication(result.code);
        Ok(())
    }

    /// Authenticates with the best mechanism for the configured
    /// credentials.
    ///
    /// Priority: OAUTHBEARER or XOAUTH2 when an access token is present;
    /// otherwise AUTH=PLAIN, then AUTH=LOGIN, then plain LOGIN. The
    /// `login_method` override in [`AuthConfig`] pins a mechanism.
    ///
    /// Returns the authenticated identity (the authzid for PLAIN when one
    /// was supplied).
    pub async fn authenticate(&mut self, auth: &AuthConfig) -> Result<String> {
        if self.state.is_authenticated() {
            return Err(Error::WrongState("already authenticated".to_string()));
        }

        let mechanism = self.pick_mechanism(auth)?;
        tracing::debug!(mechanism, user = %auth.user, "AUTHENTICATE");

        match mechanism.as_str() {
            "OAUTHBEARER" | "XOAUTH2" => self.authenticate_oauth(auth, &mechanism).await,
            "PLAIN" => self.authenticate_plain(auth).await,
            "LOGIN" => self.authenticate_login(auth).await,
            "USERPASS" => {
                let pass = auth.pass.clone().unwrap_or_default();
                let user = auth.user.clone();
                self.login(&user, &pass).await?;
                Ok(user)
            }
            _ => Err(Error::UnsupportedAuthMechanism),
        }
    }

    fn pick_mechanism(&self, auth: &AuthConfig) -> Result<String> {
        if let Some(method) = &auth.login_method {
            return Ok(method.to_uppercase());
        }

        if auth.access_token.is_some() {
            if self.supports_auth("OAUTHBEARER") {
                return Ok("OAUTHBEARER".to_string());
            }
            if self.supports_auth("XOAUTH2") || self.supports_auth("XOAUTH") {
                return Ok("XOAUTH2".to_string());
            }
            return Err(Error::UnsupportedAuthMechanism);
        }

        if auth.pass.is_some() {
            if self.supports_auth("PLAIN") {
                return Ok("PLAIN".to_string());
            }
            if self.supports_auth("LOGIN") {
                return Ok("LOGIN".to_string());
            }
            if !self.has_capability(&Capability::LoginDisabled) {
                return Ok("USERPASS".to_string());
            }
        }

        Err(Error::UnsupportedAuthMechanism)
    }

    async fn authenticate_oauth(&mut self, auth: &AuthConfig, mechanism: &str) -> Result<String> {
        let token = auth.access_token.clone().unwrap_or_default();
        let initial = if mechanism == "OAUTHBEARER" {
            oauthbearer_response(&auth.user, &self.config.host, self.config.port, &token)
        } else {
            xoauth2_response(&auth.user, &token)
        };

        let sasl_ir = self.has_capability(&Capability::SaslIr);
        let command = Command::Authenticate {
            mechanism: mechanism.to_string(),
            initial_response: sasl_ir.then(|| initial.clone()),
        };

        // A `+` prompt mid-exchange either asks for the deferred initial
        // response or carries a base64 JSON error blob; answering an error
        // prompt with an empty line elicits the tagged NO
        let mut sent_initial = sasl_ir;
        let mut oauth_error = None;
        let result = self
            .exec_with(&command, |prompt| {
                if sent_initial {
                    oauth_error = parse_oauth_error(prompt).ok();
                    Some(b"\r\n".to_vec())
                } else {
                    sent_initial = true;
                    Some(format!("{initial}\r\n").into_bytes())
                }
            })
            .await?;

        if result.status == Status::Ok {
            self.finish_authentication(result.code);
            Ok(auth.user.clone())
        } else {
            Err(Error::AuthenticationFailed {
                code: result.code,
                oauth_error,
                text: result.text,
            })
        }
    }

    async fn authenticate_plain(&mut self, auth: &AuthConfig) -> Result<String> {
        let pass = auth.pass.clone().unwrap_or_default();
        let initial = plain_response(auth.authzid.as_deref(), &auth.user, &pass);

        let sasl_ir = self.has_capability(&Capability::SaslIr);
        let command = Command::Authenticate {
            mechanism: "PLAIN".to_string(),
            initial_response: sasl_ir.then(|| initial.clone()),
        };

        let mut sent_initial = sasl_ir;
        let result = self
            .exec_with(&command, |_| {
                if sent_initial {
                    None
                } else {
                    sent_initial = true;
                    Some(format!("{initial}\r\n").into_bytes())
                }
            })
            .await?;

        if result.status == Status::Ok {
            self.finish_authentication(result.code);
            // With an authzid the server acts as that identity
            Ok(auth
                .authzid
                .clone()
                .filter(|z| !z.is_empty())
                .unwrap_or_else(|| auth.user.clone()))
        } else {
            Err(Error::AuthenticationFailed {
                code: result.code,
                oauth_error: None,
                text: result.text,
            })
        }
    }

    async fn authenticate_login(&mut self, auth: &AuthConfig) -> Result<String> {
        let user = auth.user.clone();
        let pass = auth.pass.clone().unwrap_or_default();

        let command = Command::Authenticate {
            mechanism: "LOGIN".to_string(),
            initial_response: None,
        };

        let mut bad_prompt = None;
        let result = self
            .exec_with(&command, |prompt| {
                let reply = match classify_login_prompt(prompt) {
                    LoginPrompt::Username => login_response(&user),
                    LoginPrompt::Password => login_response(&pass),
                    LoginPrompt::Unknown => {
                        bad_prompt = Some(prompt.to_string());
                        return Some(b"*\r\n".to_vec());
                    }
                };
                Some(format!("{reply}\r\n").into_bytes())
            })
            .await?;

        if let Some(prompt) = bad_prompt {
            return Err(Error::Protocol(format!(
                "unexpected AUTH=LOGIN prompt: {prompt}"
            )));
        }

        if result.status == Status::Ok {
            self.finish_authentication(result.code);
            Ok(auth.user.clone())
        } else {
            Err(Error::AuthenticationFailed {
                code: result.code,
                oauth_error: None,
                text: result.text,
            })
        }
    }

    /// Transitions to authenticated and refreshes capabilities unless the
    /// tagged OK already carried them.
    fn finish_authentication(&mut self, code: Option<ResponseCode>) {
        self.state = ProtocolState::Authenticated;
        self.auth_capabilities.clear();

        if let Some(ResponseCode::Capability(caps)) = code {
            self.install_capabilities(caps);
        } else {
            self.capabilities.clear();
            self.expect_capability_update = true;
        }
    }
}
