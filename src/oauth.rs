//! OAuth2 installed-application flow for user credentials.
//!
//! The consent step opens (and prints) an authorization URL and collects the
//! code either through a loopback listener or from a redirect URL pasted on
//! stdin. Code
//! exchange uses PKCE (S256) and a random `state` checked on the way back.

use std::path::Path;
use std::process::Command;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{DriveError, Result};
use crate::models::{ClientSecrets, ClientSecretsFile, TokenResponse};

/// Read-only Drive scope; exporting never writes to Drive.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const SUCCESS_PAGE: &str =
    "<html><body><p>The authentication flow has completed. You may close this window.</p></body></html>";

const FAILURE_PAGE: &str =
    "<html><body><p>The authentication flow failed. Check the terminal for details.</p></body></html>";

/// How the consent step receives the authorization code.
#[derive(Debug, Clone)]
pub struct ConsentOptions {
    /// Run a loopback listener; otherwise the user pastes the redirect.
    pub local_webserver: bool,
    pub host: String,
    /// Ports tried in order for the loopback listener.
    pub ports: Vec<u16>,
    /// Launch the system browser on the authorization URL.
    pub open_browser: bool,
}

impl Default for ConsentOptions {
    fn default() -> Self {
        Self {
            local_webserver: true,
            host: "localhost".to_string(),
            ports: vec![8080, 8090],
            open_browser: true,
        }
    }
}

/// PKCE code verifier plus the CSRF state sent with the authorization request.
#[derive(Debug, Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);

        Self {
            verifier: URL_SAFE_NO_PAD.encode(verifier_bytes),
            state: URL_SAFE_NO_PAD.encode(state_bytes),
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// BASE64URL(SHA256(verifier)).
    pub fn challenge(&self) -> String {
        let hash = Sha256::digest(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hash)
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Installed-application OAuth2 client.
#[derive(Debug, Clone)]
pub struct InstalledAppFlow {
    secrets: ClientSecrets,
    scope: String,
    http: Client,
}

impl InstalledAppFlow {
    /// Load client secrets downloaded from the Google Cloud console.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ClientSecretsFile = serde_json::from_str(&content)?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            DriveError::AuthenticationError(
                "Client secrets file has neither an \"installed\" nor a \"web\" section"
                    .to_string(),
            )
        })?;
        Ok(Self::new(secrets, DRIVE_READONLY_SCOPE))
    }

    pub fn new(secrets: ClientSecrets, scope: impl Into<String>) -> Self {
        Self {
            secrets,
            scope: scope.into(),
            http: Client::new(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// URL the user visits to grant access.
    pub fn authorization_url(&self, redirect_uri: &str, pkce: &PkceVerifier) -> Result<String> {
        let mut url = Url::parse(&self.secrets.auth_uri)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.secrets.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scope)
            .append_pair("state", pkce.state())
            .append_pair("code_challenge", &pkce.challenge())
            .append_pair("code_challenge_method", "S256")
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url.into())
    }

    /// Run the interactive consent flow and exchange the resulting code.
    pub async fn run(&self, options: &ConsentOptions) -> Result<TokenResponse> {
        let pkce = PkceVerifier::new();

        if options.local_webserver {
            if let Some((listener, port)) = bind_first(&options.host, &options.ports).await {
                let redirect_uri = format!("http://{}:{}/", options.host, port);
                let auth_url = self.authorization_url(&redirect_uri, &pkce)?;

                show_authorization_url(&auth_url, options.open_browser);
                eprintln!("Waiting for authorization on {} ...", redirect_uri);

                let code = wait_for_code(&listener, pkce.state()).await?;
                return self.exchange_code(&code, &redirect_uri, &pkce).await;
            }

            warn!(
                "Could not listen on {} ports {:?}, falling back to manual entry",
                options.host, options.ports
            );
        }

        let port = options.ports.first().copied().unwrap_or(8080);
        let redirect_uri = format!("http://{}:{}/", options.host, port);
        let auth_url = self.authorization_url(&redirect_uri, &pkce)?;

        show_authorization_url(&auth_url, options.open_browser);
        eprintln!("After approving, paste the URL your browser was redirected to (or just the code):");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

        let code = parse_pasted_code(&line, pkce.state())?;
        self.exchange_code(&code, &redirect_uri, &pkce).await
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        pkce: &PkceVerifier,
    ) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.secrets.client_id.as_str()),
            ("code_verifier", pkce.verifier()),
        ];
        if let Some(ref secret) = self.secrets.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        debug!("Exchanging authorization code for tokens");

        let response = self
            .http
            .post(&self.secrets.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthenticationError(format!(
                "Code exchange returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        info!("Obtained user credentials (expires in {}s)", token.expires_in);
        Ok(token)
    }

    /// Refresh an access token.
    ///
    /// A 4xx from the token endpoint means the refresh token is no longer
    /// usable and is reported as `TokenRefreshError`; other failures are
    /// `ApiError`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
        ];
        if let Some(ref secret) = self.secrets.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        debug!("Refreshing access token");

        let response = self
            .http
            .post(&self.secrets.token_uri)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.json().await?)
    }
}

fn show_authorization_url(auth_url: &str, open_browser: bool) {
    if open_browser {
        match open_in_browser(auth_url) {
            Ok(()) => debug!("Opened browser on the authorization URL"),
            Err(e) => warn!("Could not open a browser: {}", e),
        }
    }
    eprintln!("Go to the following link in your browser:\n\n    {}\n", auth_url);
}

fn open_in_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };

    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = Command::new("xdg-open");

    command.arg(url).spawn().map(|_| ())
}

async fn bind_first(host: &str, ports: &[u16]) -> Option<(TcpListener, u16)> {
    for &port in ports {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Some((listener, port)),
            Err(e) => debug!("Cannot bind {}:{}: {}", host, port, e),
        }
    }
    None
}

/// Accept loopback connections until one carries the authorization result.
async fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Result<String> {
    let base = Url::parse("http://localhost/")?;

    loop {
        let (mut stream, peer) = listener.accept().await?;
        let (read_half, mut write_half) = stream.split();
        let mut reader = BufReader::new(read_half);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;
        debug!("Redirect request from {}: {}", peer, request_line.trim_end());

        // Read the rest of the request head before replying.
        let mut header = String::new();
        loop {
            header.clear();
            let read = reader.read_line(&mut header).await?;
            if read == 0 || header == "\r\n" || header == "\n" {
                break;
            }
        }

        let target = request_line.split_whitespace().nth(1).unwrap_or("/");
        let outcome = base
            .join(target)
            .map_err(DriveError::from)
            .and_then(|url| callback_code(&url, Some(expected_state)));

        let (status, body) = match &outcome {
            Ok(Some(_)) => ("200 OK", SUCCESS_PAGE),
            Ok(None) => ("404 Not Found", ""),
            Err(_) => ("400 Bad Request", FAILURE_PAGE),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        write_half.write_all(response.as_bytes()).await?;
        write_half.flush().await?;

        if let Some(code) = outcome? {
            return Ok(code);
        }
    }
}

/// Extract the authorization code from a redirect URL.
///
/// `Ok(None)` means the URL carries neither a code nor an error (a browser
/// asking for `/favicon.ico`, for instance).
pub fn callback_code(url: &Url, expected_state: Option<&str>) -> Result<Option<String>> {
    let mut code = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(DriveError::AuthenticationError(format!(
            "Authorization was denied: {}",
            error
        )));
    }

    let Some(code) = code else {
        return Ok(None);
    };

    if let Some(expected) = expected_state {
        if state.as_deref() != Some(expected) {
            return Err(DriveError::AuthenticationError(
                "OAuth state mismatch in redirect".to_string(),
            ));
        }
    }

    Ok(Some(code))
}

/// Interpret what the user pasted: a full redirect URL or a bare code.
pub fn parse_pasted_code(input: &str, expected_state: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DriveError::AuthenticationError(
            "No authorization code entered".to_string(),
        ));
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        let url = Url::parse(input)?;
        return callback_code(&url, Some(expected_state))?.ok_or_else(|| {
            DriveError::AuthenticationError("Redirect URL has no code parameter".to_string())
        });
    }

    Ok(input.to_string())
}
