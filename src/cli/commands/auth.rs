use crate::cli::commands::utils::{client_credentials, create_provider};
use crate::provider::{spotify::is_token_expired, Provider, SpotifyProvider};
use crate::state::{credentials, Config};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

/// Run the authorization-code flow and cache the resulting token.
pub async fn run(config: &Config) -> Result<()> {
    let (client_id, client_secret) = client_credentials()?;
    let provider = SpotifyProvider::new(client_id, client_secret);

    let (bind_addr, callback_path) = callback_address(&config.redirect_uri)?;

    let state = format!("{:016x}", rand::random::<u64>());
    let auth_url = provider.oauth_url(&config.redirect_uri, &state);

    println!("Opening browser for Spotify authorization...\n");
    println!("If it doesn't open, visit:\n{}\n", auth_url);

    let _ = open::that(auth_url.clone());

    let code = wait_for_callback(&bind_addr, &callback_path, &state)?;

    println!("Exchanging code for token...");
    let token = provider
        .exchange_code(&code, &config.redirect_uri)
        .await?;

    let path = config.credentials_path();
    credentials::save(&path, &token)?;

    println!("\nSuccessfully authenticated with Spotify!");
    println!("  Token saved to {:?}", path);

    Ok(())
}

/// Split the redirect URI into the local address to listen on and the
/// callback path.
fn callback_address(redirect_uri: &str) -> Result<(String, String)> {
    let url = reqwest::Url::parse(redirect_uri)
        .with_context(|| format!("Invalid redirect URI '{}'", redirect_uri))?;
    let host = url
        .host_str()
        .with_context(|| format!("Redirect URI '{}' has no host", redirect_uri))?;
    let port = url.port_or_known_default().unwrap_or(80);

    Ok((format!("{}:{}", host, port), url.path().to_string()))
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| {
            let value = urlencoding::decode(v)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| v.to_string());
            (k.to_string(), value)
        })
        .collect()
}

fn wait_for_callback(bind_addr: &str, callback_path: &str, expected_state: &str) -> Result<String> {
    let listener = TcpListener::bind(bind_addr).with_context(|| {
        format!(
            "Failed to bind to {}. Is another instance running?",
            bind_addr
        )
    })?;

    println!("Waiting for callback...");

    for stream in listener.incoming() {
        let mut stream = stream?;
        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;

        // GET /callback?code=xxx&state=yyy HTTP/1.1
        if let Some(target) = request_line.split_whitespace().nth(1) {
            let (path, query) = target.split_once('?').unwrap_or((target, ""));
            if path == callback_path {
                let params = parse_query(query);

                if params.get("state").map(String::as_str) != Some(expected_state) {
                    send_response(
                        &mut stream,
                        StatusCode::BAD_REQUEST,
                        "State mismatch - possible CSRF",
                    )?;
                    continue;
                }

                if let Some(code) = params.get("code") {
                    send_response(
                        &mut stream,
                        StatusCode::OK,
                        "<html><body><h1>Success!</h1><p>You can close this tab.</p></body></html>",
                    )?;
                    return Ok(code.clone());
                }

                if let Some(error) = params.get("error") {
                    send_response(
                        &mut stream,
                        StatusCode::BAD_REQUEST,
                        &format!("Auth failed: {}", error),
                    )?;
                    anyhow::bail!("Authorization denied: {}", error);
                }
            }
        }

        send_response(&mut stream, StatusCode::NOT_FOUND, "Not Found")?;
    }

    anyhow::bail!("No valid callback received")
}

fn send_response(stream: &mut impl Write, status: StatusCode, body: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown"),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()?;
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let path = config.credentials_path();

    if credentials::load(&path)?.is_none() {
        println!("Not logged in");
        return Ok(());
    }

    credentials::delete(&path)?;

    println!("Logged out, removed {:?}", path);
    println!("Run 'spotify-backup auth' to login again");

    Ok(())
}

pub async fn whoami(config: &Config) -> Result<()> {
    let token = credentials::load(&config.credentials_path())?
        .context("Not authenticated. Run 'spotify-backup auth' first")?;

    let provider = create_provider(config)?;
    let user_id = provider.current_user_id().await?;

    println!("Logged in to Spotify as {}", user_id);
    if let Some(scope) = &token.scope {
        println!("Scopes: {}", scope);
    }
    if let Some(expires_at) = token.expires_at {
        if is_token_expired(&token) {
            println!("Token expired (will auto-refresh on next use)");
        } else {
            let now = chrono::Utc::now().timestamp().max(0) as u64;
            println!("Token expires in: {}s", expires_at.saturating_sub(now));
        }
    }

    Ok(())
}
