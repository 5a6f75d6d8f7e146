//! Minimal client for MediaWiki-style action APIs.
//!
//! Every write is a two-step exchange: fetch a CSRF token, then POST the
//! action with that token. Both steps carry the principal's access key as a
//! bearer token.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::ports::credentials::CredentialPair;

/// Token MediaWiki hands to anonymous sessions.
const ANONYMOUS_TOKEN: &str = "+\\";

/// Blocking HTTP client shared by the edit and link adapters.
#[derive(Clone)]
pub struct ActionClient {
    client: Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    query: Option<TokenQuery>,
}

#[derive(Deserialize)]
struct TokenQuery {
    tokens: Option<Tokens>,
}

#[derive(Deserialize)]
struct Tokens {
    csrftoken: Option<String>,
}

impl ActionClient {
    /// Builds a client with the given timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Fetches a CSRF token for the principal.
    ///
    /// Returns `Ok(None)` when the API answers without a usable token,
    /// including the anonymous `+\` token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub fn csrf_token(
        &self,
        api: &str,
        credentials: &CredentialPair,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let response: TokenResponse = self
            .client
            .get(api)
            .query(&[("action", "query"), ("meta", "tokens"), ("type", "csrf"), ("format", "json")])
            .bearer_auth(&credentials.access_key)
            .send()
            .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                format!("token request to {api} failed: {e}").into()
            })?
            .json()?;

        Ok(response
            .query
            .and_then(|q| q.tokens)
            .and_then(|t| t.csrftoken)
            .filter(|t| !t.is_empty() && t != ANONYMOUS_TOKEN))
    }

    /// Unauthenticated GET returning a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        let response = self.client.get(url).query(query).send().map_err(
            |e| -> Box<dyn std::error::Error + Send + Sync> {
                format!("GET {url} failed: {e}").into()
            },
        )?;
        Ok(response.json()?)
    }

    /// POSTs an action with its CSRF token and returns the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub fn post_action(
        &self,
        api: &str,
        params: &[(&'static str, String)],
        token: &str,
        credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        let mut form: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        form.push(("token", token));

        let response = self
            .client
            .post(api)
            .bearer_auth(&credentials.access_key)
            .form(&form)
            .send()
            .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                format!("POST to {api} failed: {e}").into()
            })?;

        let status = response.status();
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
            format!("{api} answered {} with non-JSON body: {e}", status.as_u16()).into()
        })
    }
}
