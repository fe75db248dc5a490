use std::{
    any::Any,
    backtrace::Backtrace,
    cell::{Cell, RefCell},
    panic,
    sync::Once,
    thread,
};

use duolog_core::{Caller, Entry, Fields, Level};

use crate::Logger;

struct PanicReport {
    message: String,
    location: Option<(String, u32)>,
    backtrace: String,
    logged: bool,
}

thread_local! {
    /// Live guards on this thread. The hook only captures when there is one.
    static ACTIVE_GUARDS: Cell<usize> = const { Cell::new(0) };
    /// Filled by the panic hook, consumed by the guards of the same thread.
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Captures payload, location and backtrace at the panic site, then defers
/// to the previously installed hook.
fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let guarded = ACTIVE_GUARDS.try_with(Cell::get).unwrap_or(0) > 0;
            if guarded {
                let report = PanicReport {
                    message: payload_message(info.payload()),
                    location: info
                        .location()
                        .map(|location| (location.file().to_string(), location.line())),
                    backtrace: Backtrace::force_capture().to_string(),
                    logged: false,
                };
                let _ = LAST_PANIC.try_with(|last| *last.borrow_mut() = Some(report));
            }
            previous(info);
        }));
    });
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Records a panic unwinding through its scope as a Panic-level structured
/// record, with the panic message under `err` and the stack trace captured
/// at the panic site. The panic keeps unwinding afterwards.
///
/// Obtained from [`Logger::log_on_panic`]. Use one guard per thread, created
/// before anything else runs.
#[must_use = "the guard only records panics while alive: `let _guard = logger.log_on_panic();`"]
pub struct PanicGuard {
    logger: Logger,
}

impl PanicGuard {
    pub(crate) fn new(logger: Logger) -> Self {
        install_hook();
        ACTIVE_GUARDS.with(|guards| guards.set(guards.get() + 1));
        Self { logger }
    }
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        let remaining = ACTIVE_GUARDS
            .try_with(|guards| {
                let remaining = guards.get().saturating_sub(1);
                guards.set(remaining);
                remaining
            })
            .unwrap_or(0);
        if !thread::panicking() {
            if remaining == 0 {
                let _ = LAST_PANIC.try_with(|last| last.borrow_mut().take());
            }
            return;
        }
        let report = LAST_PANIC
            .try_with(|last| {
                let mut last = last.borrow_mut();
                match last.as_mut() {
                    Some(report) if report.logged => None,
                    Some(report) => {
                        report.logged = true;
                        Some((
                            report.message.clone(),
                            report.location.clone(),
                            report.backtrace.clone(),
                        ))
                    }
                    // Another hook replaced ours: record what is still known.
                    None => Some((
                        "unknown panic".to_string(),
                        None,
                        Backtrace::force_capture().to_string(),
                    )),
                }
            })
            .ok()
            .flatten();
        let Some((message, location, backtrace)) = report else {
            return;
        };
        let fields = Fields::new().with("err", &message);
        let sink = self.logger.structured();
        sink.write(Entry {
            level: Level::Panic,
            message: "panic found!",
            fields: &fields,
            caller: location
                .as_ref()
                .map(|(file, line)| Caller { file, line: *line }),
            function: None,
            stacktrace: Some(&backtrace),
        });
        if let Err(err) = sink.flush() {
            eprintln!("duolog: unable to flush panic record: {err}");
        }
    }
}
