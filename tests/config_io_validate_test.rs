use chrono::NaiveDate;
use solarlog::config::{Config, MAX_CATCHUP_DAYS};
use solarlog::Credentials;
use std::fs;
use std::path::Path;

fn valid() -> Config {
    let mut cfg = Config::default();
    cfg.credentials = Credentials::new("owner@example.com", "secret");
    cfg
}

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = valid();
    cfg.install_date = NaiveDate::from_ymd_opt(2021, 4, 12);
    cfg.timezone = "Europe/Amsterdam".to_string();
    cfg.logging.file = Some(path.with_extension("log").to_string_lossy().to_string());

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.credentials, cfg.credentials);
    assert_eq!(loaded.install_date, cfg.install_date);
    assert_eq!(loaded.timezone, "Europe/Amsterdam");
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn legacy_json_file_loads() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("solarweb.json");
    fs::write(
        &path,
        r#"{"username": "owner@example.com", "password": "secret", "install_date": "2020-08-01"}"#,
    )
    .unwrap();

    let cfg = Config::load(Some(&path)).unwrap();

    assert_eq!(cfg.credentials.username, "owner@example.com");
    assert_eq!(cfg.install_date, NaiveDate::from_ymd_opt(2020, 8, 1));
    assert_eq!(cfg.poll_interval_secs, 30);
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    assert!(valid().validate().is_ok());

    // Missing credentials
    let err = Config::default().validate().unwrap_err();
    assert!(err.to_string().contains("username"));

    let mut cfg = valid();
    cfg.credentials.password.clear();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("password"));

    // Poll interval zero
    cfg = valid();
    cfg.poll_interval_secs = 0;
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.request_timeout_secs = 0;
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.max_catchup_days = MAX_CATCHUP_DAYS;
    assert!(cfg.validate().is_ok());
    cfg.max_catchup_days = u32::MAX;
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("max_catchup_days"));

    cfg = valid();
    cfg.timezone = "Mars/Olympus_Mons".to_string();
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.portal.base_url = " ".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn install_date_must_be_an_iso_date() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"username: a\npassword: b\ninstall_date: 12/04/2021\n").unwrap();
    assert!(Config::from_file(tmp.path()).is_err());
}

#[test]
fn database_path_precedence() {
    let mut cfg = valid();
    let cli = Path::new("/tmp/cli.db");

    assert_eq!(cfg.database_path(Some(cli)).unwrap(), cli);

    cfg.database = Some("/var/lib/solarlog/solar.db".to_string());
    assert_eq!(
        cfg.database_path(None).unwrap(),
        Path::new("/var/lib/solarlog/solar.db")
    );
    assert_eq!(cfg.database_path(Some(cli)).unwrap(), cli);
}
