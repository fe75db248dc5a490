use std::path::PathBuf;

use duolog::{
    Color, Level, Logger, RotatingFile, RotationConfig, StructuredLogger, init_log_bridge,
    set_global,
};
use log::LevelFilter;

fn main() -> duolog::Result<()> {
    let dir = PathBuf::from("/tmp/duolog_example_rotation");
    let _ = std::fs::remove_dir_all(&dir);

    let file = RotatingFile::new(RotationConfig {
        extension: "log".into(),
        max_file_size: None,
        max_lines: Some(10),
        max_files: 3,
        ..RotationConfig::new(&dir, "app")
    })?;
    set_global(
        Logger::builder(
            StructuredLogger::standard(Some(file), Level::Debug, env!("CARGO_PKG_VERSION")),
            Color::prepare(true)?,
        )
        .with_stdout(std::io::sink())
        .build(),
    );
    init_log_bridge(LevelFilter::Debug).expect("no other logger installed");

    for i in 0..50 {
        log::info!(number = i; "Log message number {i}");
    }
    duolog::global().flush()?;

    let files: Vec<String> = std::fs::read_dir(&dir)?
        .flatten()
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            if name.starts_with("app_") && name.ends_with(".log") {
                Some(name)
            } else {
                None
            }
        })
        .collect();

    println!("\n--- Rotation Summary ---");
    println!("Log directory: {}", dir.display());
    println!("Files remaining (max_files=3): {}", files.len());
    for f in &files {
        println!("  {f}");
    }
    assert!(files.len() <= 3, "max_files cleanup should keep at most 3");
    Ok(())
}
