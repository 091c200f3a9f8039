use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, wizard::WizardTimeouts, Result};

/// Typed configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    /// Empty means everyone may use the bot.
    pub telegram_allowed_users: Vec<i64>,

    // Wizard deadlines
    pub wizard_menu_timeout: Duration,
    pub wizard_reply_timeout: Duration,

    // Telegram limits
    pub button_label_max_length: usize,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

impl Config {
    /// Load `.env` / `token.env` (without overriding real variables), then read
    /// the process environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        load_dotenv_if_present(Path::new("token.env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let telegram_allowed_users = parse_csv_i64(lookup("TELEGRAM_ALLOWED_USERS"));

        let defaults = WizardTimeouts::default();
        let wizard_menu_timeout = parse_u64(lookup("WIZARD_MENU_TIMEOUT_SECS"))
            .map(Duration::from_secs)
            .unwrap_or(defaults.menu);
        let wizard_reply_timeout = parse_u64(lookup("WIZARD_REPLY_TIMEOUT_SECS"))
            .map(Duration::from_secs)
            .unwrap_or(defaults.reply);

        let button_label_max_length = parse_u64(lookup("BUTTON_LABEL_MAX_LENGTH"))
            .map(|n| n as usize)
            .unwrap_or(30);

        let audit_log_path = lookup("AUDIT_LOG_PATH")
            .and_then(non_empty)
            .map(PathBuf::from);
        let audit_log_json = lookup("AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            wizard_menu_timeout,
            wizard_reply_timeout,
            button_label_max_length,
            audit_log_path,
            audit_log_json,
        })
    }

    pub fn wizard_timeouts(&self) -> WizardTimeouts {
        WizardTimeouts {
            menu: self.wizard_menu_timeout,
            reply: self.wizard_reply_timeout,
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t")])).unwrap();
        assert!(cfg.telegram_allowed_users.is_empty());
        assert_eq!(cfg.wizard_timeouts(), WizardTimeouts::default());
        assert_eq!(cfg.audit_log_path, None);
        assert!(!cfg.audit_log_json);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TELEGRAM_ALLOWED_USERS", "1, 2,,x,3"),
            ("WIZARD_MENU_TIMEOUT_SECS", "15"),
            ("WIZARD_REPLY_TIMEOUT_SECS", "45"),
            ("AUDIT_LOG_PATH", "/tmp/bcb-audit.log"),
            ("AUDIT_LOG_JSON", "yes"),
        ]))
        .unwrap();
        assert_eq!(cfg.telegram_allowed_users, vec![1, 2, 3]);
        assert_eq!(cfg.wizard_menu_timeout, Duration::from_secs(15));
        assert_eq!(cfg.wizard_reply_timeout, Duration::from_secs(45));
        assert_eq!(
            cfg.audit_log_path.as_deref(),
            Some(Path::new("/tmp/bcb-audit.log"))
        );
        assert!(cfg.audit_log_json);
    }

    #[test]
    fn dotenv_lines_are_parsed() {
        let parsed = parse_dotenv(
            "# comment\nTELEGRAM_BOT_TOKEN=\"abc\"\n\nNOEQUALS\n =x\nAUDIT_LOG_JSON = 'true'\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "abc".to_string()),
                ("AUDIT_LOG_JSON".to_string(), "true".to_string()),
            ]
        );
    }
}
