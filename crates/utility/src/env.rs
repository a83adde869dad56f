use std::{env, fmt::Display, str::FromStr};

/// Reads and parses an environment variable. Unset or empty variables yield
/// `default`, unparsable ones yield `default` with a warning.
pub fn var_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(value) = env::var(name) else {
        return default;
    };
    let value = value.trim();
    if value.is_empty() {
        return default;
    }
    match value.parse() {
        Ok(parsed) => parsed,
        Err(why) => {
            log::warn!("ignoring {}={:?} ({}), using {}", name, value, why, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default() {
        env::set_var("UTILITY_ENV_TEST_GARBAGE", "twelve");
        env::set_var("UTILITY_ENV_TEST_VALUE", " 12 ");
        assert_eq!(var_or("UTILITY_ENV_TEST_GARBAGE", 3u64), 3);
        assert_eq!(var_or("UTILITY_ENV_TEST_VALUE", 3u64), 12);
        assert_eq!(var_or("UTILITY_ENV_TEST_UNSET", 3u64), 3);
    }
}
