use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub csrf_token: Option<String>,
    pub user_id: Option<String>,
    pub role: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            csrf_token: None,
            user_id: None,
            role: "student".into(),
        }
    }
}

/// `portal.toml` in the working directory, then environment overrides.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("portal.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
            if let Some(v) = file_cfg.get("csrf_token") {
                settings.csrf_token = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("user_id") {
                settings.user_id = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("role") {
                settings.role = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("PORTAL_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("PORTAL_CSRF_TOKEN") {
        settings.csrf_token = Some(v);
    }
    if let Ok(v) = std::env::var("PORTAL_USER_ID") {
        settings.user_id = Some(v);
    }
    if let Ok(v) = std::env::var("PORTAL_ROLE") {
        settings.role = v;
    }

    settings
}
