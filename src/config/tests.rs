use std::io::Write;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::NamedTempFile;

use super::*;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write tmp");
    file
}

fn plan_cli(config_file: Option<PathBuf>, extra: &[&str]) -> CliArgs {
    let mut argv = vec![
        "site-revalidator",
        "plan",
        "--records",
        "records.json",
        "--record",
        "42",
        "--action",
        "update",
    ];
    argv.extend_from_slice(extra);
    let mut cli = CliArgs::try_parse_from(argv).expect("valid arguments");
    cli.config_file = config_file;
    cli
}

#[test]
fn defaults_apply_to_empty_configuration() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.http.timeout, Duration::from_secs(10));
    assert!(settings.http.user_agent.starts_with("site-revalidator/"));
    assert_eq!(settings.dispatch.concurrency.get(), 4);
    assert_eq!(settings.dispatch.max_expanded_paths.get(), 256);
    assert_eq!(settings.dispatch.max_traversal_depth, 8);
    assert_eq!(settings.dispatch.listing_root, "items");
    assert!(settings.dispatch.deadline.is_none());
    assert!(settings.sites.is_empty());
    assert!(settings.revalidators.is_empty());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.dispatch.concurrency = Some(2);
    raw.logging.level = Some("info".to_string());

    let overrides = RuntimeOverrides {
        dispatch_concurrency: Some(9),
        log_level: Some("debug".to_string()),
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_runtime_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.dispatch.concurrency.get(), 9);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.dispatch.max_expanded_paths = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero cap");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "dispatch.max_expanded_paths",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.http.timeout_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.dispatch.deadline_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn invalid_log_level_is_reported() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn multi_segment_listing_root_is_rejected() {
    let mut raw = RawSettings::default();
    raw.dispatch.listing_root = Some("/a/b/".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn site_urls_are_validated() {
    let mut raw = RawSettings::default();
    raw.sites.push(RawSiteSettings {
        id: "blog".to_string(),
        base_url: "not a url".to_string(),
        ..Default::default()
    });
    let err = Settings::from_raw(raw).expect_err("bad base url");
    assert!(matches!(err, LoadError::Invalid { key: "sites.base_url", .. }));
}

#[test]
fn relative_revalidate_url_resolves_against_base_url() {
    let mut raw = RawSettings::default();
    raw.sites.push(RawSiteSettings {
        id: "blog".to_string(),
        base_url: "https://blog.example.com/app/".to_string(),
        revalidate_url: Some("api/revalidate".to_string()),
        ..Default::default()
    });
    raw.sites.push(RawSiteSettings {
        id: "docs".to_string(),
        base_url: "https://docs.example.com".to_string(),
        revalidate_url: Some("https://hooks.example.com/revalidate".to_string()),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    let endpoints: Vec<Option<&str>> = settings
        .sites
        .iter()
        .map(|site| site.revalidate_url.as_ref().map(Url::as_str))
        .collect();
    assert_eq!(
        endpoints,
        [
            Some("https://blog.example.com/app/api/revalidate"),
            Some("https://hooks.example.com/revalidate"),
        ]
    );
}

#[test]
fn site_label_defaults_to_id_and_blank_values_are_dropped() {
    let mut raw = RawSettings::default();
    raw.sites.push(RawSiteSettings {
        id: " blog ".to_string(),
        label: None,
        base_url: "https://blog.example.com".to_string(),
        revalidate_url: Some("  ".to_string()),
        secret: Some(String::new()),
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    let site = &settings.sites[0];
    assert_eq!(site.id, "blog");
    assert_eq!(site.label, "blog");
    assert!(site.revalidate_url.is_none());
    assert!(site.secret.is_none());
}

#[test]
fn parse_plan_arguments() {
    let cli = plan_cli(None, &["--current-path", "/news/a", "--listing-root", "node"]);
    let Command::Plan(args) = &cli.command else {
        panic!("expected plan command");
    };
    assert_eq!(args.trigger.record, "42");
    assert_eq!(args.trigger.action, crate::revalidation::RevalidationAction::Update);
    assert_eq!(args.trigger.current_path.as_deref(), Some("/news/a"));
    assert!(args.trigger.previous_path.is_none());
    assert_eq!(args.overrides.listing_root.as_deref(), Some("node"));
}

#[test]
fn parse_dispatch_arguments() {
    let cli = CliArgs::try_parse_from([
        "site-revalidator",
        "dispatch",
        "--records",
        "records.json",
        "--record",
        "7",
        "--action",
        "predelete",
        "--deadline-seconds",
        "30",
        "--log-json",
        "yes",
    ])
    .expect("valid arguments");

    let Command::Dispatch(args) = &cli.command else {
        panic!("expected dispatch command");
    };
    assert_eq!(args.deadline_seconds, Some(30));
    assert_eq!(args.overrides.log_json, Some(true));

    let mut raw = RawSettings::default();
    raw.apply_runtime_overrides(cli.command.overrides());
    raw.apply_dispatch_overrides(args);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.dispatch.deadline, Some(Duration::from_secs(30)));
}

#[test]
fn unknown_action_is_a_usage_error() {
    let result = CliArgs::try_parse_from([
        "site-revalidator",
        "plan",
        "--records",
        "r.json",
        "--record",
        "1",
        "--action",
        "publish",
    ]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn loads_sites_and_revalidators_from_file() {
    let file = toml_file(
        r#"
[logging]
level = "warn"

[dispatch]
concurrency = 2

[[sites]]
id = "blog"
label = "Blog"
base_url = "https://blog.example.com"
revalidate_url = "https://blog.example.com/api/revalidate"
secret = "s3cr3t"

[[revalidators]]
entity_type = "node"
bundle = "article"
revalidate_page = true
additional_paths = """
/blog
/tags/{field_tags}
"""

[[revalidators]]
entity_type = "node"
bundle = "page"
additional_paths = ["/pages", "/"]
"#,
    );

    let cli = plan_cli(Some(file.path().to_path_buf()), &["--dispatch-concurrency", "3"]);
    let settings = load(&cli).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert_eq!(settings.dispatch.concurrency.get(), 3);
    assert_eq!(settings.sites.len(), 1);
    assert_eq!(settings.sites[0].secret.as_deref(), Some("s3cr3t"));
    assert_eq!(
        settings.sites[0].revalidate_url.as_ref().map(Url::as_str),
        Some("https://blog.example.com/api/revalidate")
    );
    assert_eq!(settings.revalidators.len(), 2);
    assert!(settings.revalidators[0].revalidate_page);
    assert_eq!(
        settings.revalidators[0].additional_paths,
        vec!["/blog", "/tags/{field_tags}"]
    );
    assert_eq!(settings.revalidators[1].additional_paths, vec!["/pages", "/"]);
}

#[test]
#[serial]
fn environment_overrides_file() {
    let file = toml_file("[http]\ntimeout_seconds = 5\n");
    let cli = plan_cli(Some(file.path().to_path_buf()), &[]);

    // SAFETY: serialized with every other test that reads the environment.
    unsafe { std::env::set_var("REVALIDATOR__HTTP__TIMEOUT_SECONDS", "3") };
    let result = load(&cli);
    unsafe { std::env::remove_var("REVALIDATOR__HTTP__TIMEOUT_SECONDS") };

    let settings = result.expect("valid settings");
    assert_eq!(settings.http.timeout, Duration::from_secs(3));
}

#[test]
#[serial]
fn missing_explicit_config_file_is_an_error() {
    let cli = plan_cli(Some(PathBuf::from("/nonexistent/revalidator.toml")), &[]);
    assert!(matches!(load(&cli), Err(LoadError::Build(_))));
}
