use duolog::{Color, Level, Logger, RotatingFile, RotationConfig, StructuredLogger, fields};

fn main() -> duolog::Result<()> {
    let dir = std::env::temp_dir().join("duolog_example_dual");
    let file = RotatingFile::new(RotationConfig::new(&dir, "app"))?;
    let logger = Logger::builder(
        StructuredLogger::standard(Some(file), Level::Debug, "v1.0.0"),
        Color::prepare(true)?,
    )
    .build();
    let _guard = logger.log_on_panic();

    logger.info(
        "Now we're logging :)",
        fields! { "key" => "value", "otherkey" => "othervalue" },
    );
    logger.debug("only in the file", fields! { "dir" => dir.display().to_string() });
    logger.error("something went wrong", fields! { "attempts" => 3 });

    let worker = logger.named("worker");
    let task = worker.clone();
    let handle = worker.spawn(move || -> () {
        task.info("working", fields! {});
        panic!("the worker gave up");
    });
    assert!(handle.join().is_err());

    logger.flush()?;
    println!("structured records in {}", dir.display());
    Ok(())
}
