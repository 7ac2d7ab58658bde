use std::fs;

use log::LevelFilter;
use mirror_logging::{initialize, mirror_debug, mirror_info, LogDestination};

#[test]
fn file_destination_receives_messages_at_or_above_level() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("mirror.log");

    assert!(initialize(LogDestination::File(path.clone()), LevelFilter::Info));
    mirror_info!("Loaded {} pages.", 3);
    mirror_debug!("not written");
    log::logger().flush();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("Loaded 3 pages."));
    assert!(!text.contains("not written"));

    // The global logger can only be installed once per process.
    assert!(!initialize(LogDestination::Terminal, LevelFilter::Info));
}
