use std::time::Duration;

use inspect_rs::config::secrets::{Auth, ExposeSecret};
use inspect_rs::config::{Config, LoginRegistry};
use inspect_rs::error::Error;

const VARS: [&str; 5] = [
    "REQUEST_DELAY_MS",
    "REQUEST_TTL_MS",
    "LOGIN_STAGGER_SECS",
    "RELOG_INTERVAL_SECS",
    "LOGINS_FILE",
];

// Environment is process-global, so every env case lives in one test.
#[test]
fn config_from_env() {
    unsafe {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.request_delay, Duration::from_millis(1100));
    assert_eq!(config.request_ttl, Duration::from_millis(5000));
    assert_eq!(config.login_stagger, Duration::from_secs(240));
    assert_eq!(config.relog_interval, Some(Duration::from_secs(1800)));
    assert!(!config.log_level.is_empty());

    unsafe {
        std::env::set_var("REQUEST_DELAY_MS", "250");
        std::env::set_var("RELOG_INTERVAL_SECS", "0");
        std::env::set_var("LOGINS_FILE", "/etc/inspect/logins.toml");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.request_delay, Duration::from_millis(250));
    assert_eq!(config.relog_interval, None);
    assert_eq!(config.logins_file.to_str(), Some("/etc/inspect/logins.toml"));

    let settings = config.worker_settings();
    assert_eq!(settings.request_delay, Duration::from_millis(250));
    assert_eq!(settings.request_ttl, Duration::from_millis(5000));
    assert_eq!(settings.login_delay, Duration::ZERO);

    unsafe {
        std::env::set_var("REQUEST_TTL_MS", "five seconds");
    }
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    unsafe {
        for var in VARS {
            std::env::remove_var(var);
        }
    }
}

#[test]
fn logins_parse_in_order_with_auth_kinds() {
    let logins = LoginRegistry::from_toml(
        r#"
        [[login]]
        user = "inspector1"
        pass = "hunter2"

        [[login]]
        user = "inspector2"
        pass = "hunter3"
        auth = "X7KQ2"

        [[login]]
        user = "inspector3"
        pass = "hunter4"
        auth = "cnVzdGFjZWFuc2hhcmVkc2VjcmV0"
        "#,
    )
    .unwrap();

    assert_eq!(logins.len(), 3);
    let logins: Vec<_> = logins.iter().collect();
    assert_eq!(logins[0].user, "inspector1");
    assert_eq!(logins[0].pass.expose_secret(), "hunter2");
    assert!(logins[0].auth().is_none());
    assert!(matches!(logins[1].auth(), Some(Auth::EmailCode(code)) if code.expose_secret() == "X7KQ2"));
    assert!(matches!(logins[2].auth(), Some(Auth::SharedSecret(_))));
}

#[test]
fn logins_debug_output_hides_secrets() {
    let logins = LoginRegistry::from_toml(
        r#"
        [[login]]
        user = "inspector1"
        pass = "hunter2"
        auth = "X7KQ2"
        "#,
    )
    .unwrap();

    let debug = format!("{logins:?}");
    assert!(debug.contains("inspector1"));
    assert!(!debug.contains("hunter2"));
    assert!(!debug.contains("X7KQ2"));
}

#[test]
fn logins_reject_duplicates_and_blank_users() {
    let duplicate = LoginRegistry::from_toml(
        r#"
        [[login]]
        user = "inspector1"
        pass = "a"

        [[login]]
        user = "inspector1"
        pass = "b"
        "#,
    );
    assert!(matches!(duplicate, Err(Error::Config(_))));

    let blank = LoginRegistry::from_toml(
        r#"
        [[login]]
        user = ""
        pass = "a"
        "#,
    );
    assert!(matches!(blank, Err(Error::Config(_))));

    let missing_pass = LoginRegistry::from_toml(
        r#"
        [[login]]
        user = "inspector1"
        "#,
    );
    assert!(matches!(missing_pass, Err(Error::Config(_))));
}

#[test]
fn empty_logins_file_is_empty_registry() {
    let logins = LoginRegistry::from_toml("").unwrap();
    assert!(logins.is_empty());
}

#[test]
fn missing_logins_file_is_config_error() {
    let result = LoginRegistry::load(std::path::Path::new("/nonexistent/inspect/logins.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}
