use std::str::FromStr;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse an optional string into `T`. Missing values yield `Ok(default)`; unparseable values are returned as the
/// `Err` variant, carrying the raw string, so the caller can decide how loudly to complain.
pub fn parse_env_or<T: FromStr>(value: Option<String>, default: T) -> Result<T, (String, T)> {
    match value {
        None => Ok(default),
        Some(s) => s.trim().parse::<T>().map_err(|_| (s, default)),
    }
}
