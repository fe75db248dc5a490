mod common;

use common::SharedBuf;
use duolog::{Color, Level, LogStream, Logger, SinkBuilder, global, init_log_bridge, set_global};
use log::LevelFilter;

// The `log` facade accepts a single logger per process, so everything bridged
// is checked in one test.
#[test]
fn test_log_macros_reach_global_logger() {
    let log = SharedBuf::default();
    let stdout = SharedBuf::default();
    let stderr = SharedBuf::default();
    let sink = SinkBuilder::new(LogStream::new(log.clone()))
        .with_level(Level::Debug)
        .with_version("v2.0.0")
        .build();
    let previous = set_global(
        Logger::builder(sink, Color::none())
            .with_stdout(stdout.clone())
            .with_stderr(stderr.clone())
            .build(),
    );
    assert!(previous.structured().is_nop());
    init_log_bridge(LevelFilter::Trace).unwrap();
    assert!(init_log_bridge(LevelFilter::Trace).is_err());

    log::info!(attempt = 3, user = "ada"; "bridged");
    log::debug!("quiet");
    log::trace!("quieter");
    log::warn!("careful");
    log::error!(code = 7; "failed");
    log::logger().flush();

    let records = log.records();
    assert_eq!(records.len(), 5);
    let levels: Vec<&str> = records
        .iter()
        .map(|record| record["_level"].as_str().unwrap())
        .collect();
    assert_eq!(levels, ["INFO", "DEBUG", "DEBUG", "ERROR", "ERROR"]);

    let info = &records[0];
    assert_eq!(info["_msg"], "bridged");
    assert_eq!(info["attempt"], 3);
    assert_eq!(info["user"], "ada");
    assert_eq!(info["_function"], "log_bridge");
    assert_eq!(info["_version"], "v2.0.0");
    assert!(
        info["_caller"]
            .as_str()
            .unwrap()
            .starts_with("tests/log_bridge.rs:")
    );
    assert_eq!(records[4]["code"], 7);

    assert_eq!(stdout.text(), "INFO: bridged\n  attempt: 3\n  user: \"ada\"\n\n");
    assert_eq!(stderr.text(), "ERROR: careful\n\nERROR: failed\n  code: 7\n\n");

    // Logging straight through the global handle goes to the same place.
    global().info("direct", duolog::Fields::new());
    assert_eq!(log.records().len(), 6);

    // Debug and trace are skipped when the sink would drop them.
    let filtered = SharedBuf::default();
    let sink = SinkBuilder::new(LogStream::new(filtered.clone()))
        .with_level(Level::Info)
        .build();
    set_global(
        Logger::builder(sink, Color::none())
            .with_stdout(stdout.clone())
            .with_stderr(stderr.clone())
            .build(),
    );
    let metadata = |level| log::Metadata::builder().level(level).build();
    assert!(!log::logger().enabled(&metadata(log::Level::Debug)));
    assert!(log::logger().enabled(&metadata(log::Level::Info)));
    log::debug!(skipped = true; "not recorded");
    log::trace!("not recorded either");
    log::info!("kept");
    let records = filtered.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["_msg"], "kept");
}
