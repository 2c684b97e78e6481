use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::config::Settings;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide client. The first caller's settings decide timeout and User-Agent.
pub fn http_client(settings: &Settings) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| build_client(settings))
}

pub fn build_client(settings: &Settings) -> Result<Client> {
    // The API answers empty bodies to reqwest's default agent.
    Client::builder()
        .timeout(settings.http_timeout)
        .user_agent(settings.user_agent.clone())
        .build()
        .context("failed to build http client")
}

/// GET `url` and return the fully drained body.
pub fn fetch_body(client: &Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, truncate(&body, 200)));
    }
    Ok(body)
}

fn truncate(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("ééé", 2), "éé");
    }
}
