use serde_json::json;
use std::io::Write;
use std::time::Duration;
use stressapi::config::{ConfigFile, RunConfig, Settings, SyslogTarget, SyslogTransport, DEFAULT_USER_AGENT};
use stressapi_common::{ConfigError, Method};

const CPUS: usize = 8;

fn validate(value: serde_json::Value) -> Result<Settings, ConfigError> {
    ConfigFile::from_json(&value.to_string())?.validate(CPUS)
}

fn minimal() -> serde_json::Value {
    json!({"url": "http://localhost:8000/api", "method": "GET"})
}

fn with(field: &str, value: serde_json::Value) -> serde_json::Value {
    let mut config = minimal();
    config[field] = value;
    config
}

#[test]
fn test_minimal_config_gets_defaults() {
    let s = validate(minimal()).unwrap();
    assert_eq!(s.url, "http://localhost:8000/api");
    assert_eq!(s.method, Method::Get);
    assert_eq!(s.timeout, 1.0);
    assert_eq!(s.interval, 0.5);
    assert_eq!(s.burst, 1);
    assert_eq!(s.threads, 1);
    assert_eq!(s.success_status_codes, vec![200, 201, 202, 204]);
    assert!(s.cpu_affinity.is_empty());
    assert_eq!(s.syslog, None);
    assert_eq!(s.headers, vec![("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string())]);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "url": "https://example.com/v1/%%randomint:1:10%%",
            "method": "post",
            "post_data": {{"id": "abc", "n": 3}},
            "headers": {{"Content-Type": "application/json", "User-Agent": "probe/1.0"}},
            "timeout": 2.5,
            "success_status_codes": [200, 201],
            "start_interval": "0.1",
            "start_burst": 4,
            "start_threads": 3,
            "cpu_affinity": [0, 1]
        }}"#
    )
    .unwrap();

    let s = ConfigFile::load(file.path()).unwrap().validate(CPUS).unwrap();
    assert_eq!(s.method, Method::Post);
    assert_eq!(s.timeout, 2.5);
    assert_eq!(s.interval, 0.1);
    assert_eq!(s.burst, 4);
    assert_eq!(s.threads, 3);
    assert_eq!(s.cpu_affinity, vec![0, 1]);
    assert_eq!(s.success_status_codes, vec![200, 201]);
    assert_eq!(s.headers.len(), 2);
    assert!(s.headers.iter().any(|(k, v)| k == "User-Agent" && v == "probe/1.0"));
    assert_eq!(s.body(), br#"{"id":"abc","n":3}"#.to_vec());
    assert!(s.source.is_some());
}

#[test]
fn test_unreadable_and_invalid_files() {
    let missing = ConfigFile::load(std::path::Path::new("/nonexistent/stressapi.json"));
    assert!(matches!(missing, Err(ConfigError::Unreadable(_, _))));

    let broken = ConfigFile::from_json("{\"url\": ");
    assert!(matches!(broken, Err(ConfigError::InvalidJson(_))));
}

#[test]
fn test_url_checks() {
    assert_eq!(
        validate(json!({"method": "GET"})).unwrap_err(),
        ConfigError::MissingField("url")
    );
    assert!(matches!(
        validate(with("url", json!("localhost:8000/api"))),
        Err(ConfigError::UnsupportedScheme(_))
    ));
    assert!(matches!(
        validate(with("url", json!("ftp://localhost/file"))),
        Err(ConfigError::UnsupportedScheme(_))
    ));
    assert!(matches!(validate(with("url", json!("http://"))), Err(ConfigError::MalformedUrl(_))));
    assert!(matches!(
        validate(with("url", json!("http://h/%%nope%%"))),
        Err(ConfigError::InvalidUrlTemplate(_))
    ));
}

#[test]
fn test_method_checks() {
    assert_eq!(
        validate(json!({"url": "http://h/"})).unwrap_err(),
        ConfigError::MissingField("method")
    );
    assert_eq!(
        validate(with("method", json!("TRACE"))).unwrap_err(),
        ConfigError::InvalidMethod("TRACE".to_string())
    );
    assert_eq!(validate(with("method", json!("delete"))).unwrap().method, Method::Delete);
}

#[test]
fn test_post_data_is_only_sent_for_post_and_put() {
    let mut config = with("method", json!("PATCH"));
    config["post_data"] = json!({"a": 1});
    assert!(validate(config.clone()).unwrap().body().is_empty());

    config["method"] = json!("PUT");
    assert_eq!(validate(config.clone()).unwrap().body(), br#"{"a":1}"#.to_vec());

    config["post_data"] = json!([1, 2]);
    assert!(matches!(validate(config), Err(ConfigError::InvalidType { field: "post_data", .. })));
}

#[test]
fn test_header_checks() {
    assert_eq!(
        validate(with("headers", json!({"Content-Type": "application/x-nope"}))).unwrap_err(),
        ConfigError::InvalidContentType("application/x-nope".to_string())
    );
    assert!(validate(with("headers", json!({"content-type": "text/plain"}))).is_ok());
    assert!(matches!(
        validate(with("headers", json!({"X-Count": 3}))),
        Err(ConfigError::InvalidHeader(_))
    ));
    assert!(matches!(
        validate(with("headers", json!({"Bad Name": "x"}))),
        Err(ConfigError::InvalidHeader(_))
    ));
}

#[test]
fn test_header_order_is_preserved() {
    let s = validate(with("headers", json!({"X-B": "2", "X-A": "1", "user-agent": "me"}))).unwrap();
    let names: Vec<&str> = s.headers.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, vec!["X-B", "X-A", "user-agent"]);
}

#[test]
fn test_positive_numbers_are_required() {
    assert_eq!(
        validate(with("start_threads", json!(0))).unwrap_err(),
        ConfigError::NotPositive { field: "start_threads", value: "0".to_string() }
    );
    assert!(matches!(
        validate(with("start_burst", json!(-2))),
        Err(ConfigError::NotPositive { field: "start_burst", .. })
    ));
    assert!(matches!(
        validate(with("start_interval", json!(0))),
        Err(ConfigError::NotPositive { field: "start_interval", .. })
    ));
    assert!(matches!(
        validate(with("start_threads", json!("many"))),
        Err(ConfigError::InvalidType { field: "start_threads", .. })
    ));
}

#[test]
fn test_ranges_are_clamped() {
    let mut config = minimal();
    config["start_interval"] = json!(30);
    config["start_burst"] = json!(1000);
    config["timeout"] = json!(600);
    let s = validate(config).unwrap();
    assert_eq!(s.interval, 5.0);
    assert_eq!(s.burst, 300);
    assert_eq!(s.timeout, 60.0);
}

#[test]
fn test_tiny_timeout_falls_back_to_default() {
    assert_eq!(validate(with("timeout", json!(0.0005))).unwrap().timeout, 1.0);
    assert_eq!(validate(with("timeout", json!(0.002))).unwrap().timeout, 0.002);
}

#[test]
fn test_cpu_affinity() {
    assert_eq!(validate(with("cpu_affinity", json!([-1]))).unwrap().cpu_affinity, vec![7]);
    assert_eq!(validate(with("cpu_affinity", json!([0, 7]))).unwrap().cpu_affinity, vec![0, 7]);
    assert_eq!(
        validate(with("cpu_affinity", json!([999]))).unwrap_err(),
        ConfigError::InvalidCpu { cpu: 999, max: 7 }
    );
    assert!(matches!(
        validate(with("cpu_affinity", json!([-1, 2]))),
        Err(ConfigError::InvalidCpu { cpu: -1, .. })
    ));
}

#[test]
fn test_syslog_targets() {
    let udp = SyslogTarget::parse("udp://10.0.0.5:514?facility=local3").unwrap();
    assert_eq!(udp.transport, SyslogTransport::Udp);
    assert_eq!(udp.address, "10.0.0.5:514");
    assert_eq!(udp.facility, "local3");
    assert_eq!(udp.to_string(), "udp://10.0.0.5:514?facility=local3");

    let tcp = SyslogTarget::parse("tcp://logs.internal?facility=daemon").unwrap();
    assert_eq!(tcp.transport, SyslogTransport::Tcp);
    assert_eq!(tcp.address, "logs.internal");

    let unix = SyslogTarget::parse("/dev/log?facility=user").unwrap();
    assert_eq!(unix.transport, SyslogTransport::Unix);
    assert_eq!(unix.address, "/dev/log");

    assert!(matches!(
        SyslogTarget::parse("http://logs?facility=user"),
        Err(ConfigError::InvalidSyslogTarget(_))
    ));
    assert_eq!(
        SyslogTarget::parse("udp://logs?facility=local9").unwrap_err(),
        ConfigError::InvalidSyslogFacility("local9".to_string())
    );
    assert!(matches!(
        SyslogTarget::parse("udp://logs"),
        Err(ConfigError::InvalidSyslogFacility(_))
    ));

    let s = validate(with("syslog_server_url", json!("udp://127.0.0.1?facility=local0"))).unwrap();
    assert_eq!(s.syslog.map(|t| t.facility), Some("local0".to_string()));
}

#[test]
fn test_template_validates() {
    let mut template = ConfigFile::template();
    template["method"] = json!("POST");
    let s = ConfigFile::from_json(&template.to_string()).unwrap().validate(CPUS).unwrap();
    assert_eq!(s.cpu_affinity, vec![CPUS - 1]);
    assert!(s.syslog.is_some());
}

#[test]
fn test_run_config_tunables_clamp() {
    let config = RunConfig::new(validate(minimal()).unwrap());
    assert_eq!(config.cycle().interval, Duration::from_millis(500));
    assert_eq!(config.cycle().burst, 1);
    assert_eq!(config.cycle().timeout, Duration::from_secs(1));

    assert_eq!(config.set_interval(10.0), 5.0);
    assert_eq!(config.set_interval(0.0), 0.00001);
    assert_eq!(config.set_burst(0), 1);
    assert_eq!(config.set_burst(301), 300);
    assert_eq!(config.set_timeout(100.0), 60.0);
    assert_eq!(config.set_timeout(0.0), 0.00001);
    assert_eq!(config.interval(), 0.00001);
    assert_eq!(config.burst(), 300);
}

#[test]
fn test_run_config_success_codes() {
    let config = RunConfig::new(validate(with("success_status_codes", json!([200, "418"]))).unwrap());
    assert!(config.is_success(418));
    assert!(!config.is_success(201));
}
