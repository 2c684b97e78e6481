use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://fantasy.premierleague.com/api";
const DEFAULT_USER_AGENT: &str = "fpl-predict/0.1";
const DEFAULT_OUT_DIR: &str = "csv_out";

/// Runtime settings, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base: String,
    pub user_agent: String,
    pub http_timeout: Duration,
    pub fetch_parallelism: usize,
    pub out_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout: Duration::from_secs(10),
            fetch_parallelism: 16,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_base = non_blank_env("FPL_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        let user_agent = non_blank_env("FPL_USER_AGENT").unwrap_or(defaults.user_agent);
        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.clamp(1, 120)))
            .unwrap_or(defaults.http_timeout);
        let fetch_parallelism = env::var("FETCH_PARALLELISM")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(defaults.fetch_parallelism)
            .clamp(1, 64);
        let out_dir = non_blank_env("CSV_OUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.out_dir);

        Self {
            api_base,
            user_agent,
            http_timeout,
            fetch_parallelism,
            out_dir,
        }
    }

    pub fn bootstrap_url(&self) -> String {
        format!("{}/bootstrap-static/", self.api_base)
    }

    /// Template with a single `{id}` placeholder for the element-summary endpoint.
    pub fn element_summary_template(&self) -> String {
        format!("{}/element-summary/{{id}}/", self.api_base)
    }
}

/// Fill the `{id}` placeholder of an endpoint template.
pub fn endpoint_for(template: &str, player_id: u32) -> String {
    template.replace("{id}", &player_id.to_string())
}

fn non_blank_env(key: &str) -> Option<String> {
    let raw = env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
