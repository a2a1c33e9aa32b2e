// Actor and host identity recorded in audit logs

use chrono::Local;

const UNKNOWN: &str = "N/A";

pub const TIMESTAMP_FORMAT: &str = "%d %b %Y %H:%M:%S";

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Login name with `.` replaced by `_`
pub fn current_user() -> String {
    first_env(&["USER", "USERNAME"])
        .map(|u| u.replace('.', "_"))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Raw login name, as matched against the admin list
pub fn login_name() -> String {
    first_env(&["USER", "USERNAME"]).unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn current_host() -> String {
    first_env(&["HOSTNAME", "COMPUTERNAME"]).unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
