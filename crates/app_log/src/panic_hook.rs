//! Panic hook for crash reporting

use backtrace::Backtrace;
use chrono::{DateTime, Local};
use std::any::Any;
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

/// Initialize the panic hook for crash reporting
pub fn init_panic_hook() {
    std::panic::set_hook(Box::new(panic_handler));
    tracing::debug!("Panic hook initialized");
}

/// Where a crash at `time` is dumped
pub fn crash_dump_path(dir: &Path, time: DateTime<Local>) -> PathBuf {
    dir.join(format!("portfolio_crash_{}.txt", time.format("%Y%m%d_%H%M%S")))
}

fn payload_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<unknown>")
}

fn panic_handler(info: &PanicHookInfo) {
    let now = Local::now();
    let backtrace = Backtrace::new();
    let thread = std::thread::current();
    let message = payload_message(info.payload());

    let report = format!(
        "=== PORTFOLIO CRASH ===\n\
         Timestamp: {}\n\
         Thread: {}\n\
         Location: {}\n\
         Message: {}\n\n\
         Stack Trace:\n{:?}",
        now.to_rfc3339(),
        thread.name().unwrap_or("<unnamed>"),
        info.location().map(|l| l.to_string()).unwrap_or_default(),
        message,
        backtrace
    );

    eprintln!("{}", report);
    tracing::error!("{}", report);

    let dump_path = crash_dump_path(&std::env::temp_dir(), now);
    if let Err(e) = std::fs::write(&dump_path, &report) {
        eprintln!("Failed to write crash dump: {}", e);
    }

    #[cfg(windows)]
    show_error_dialog(&dump_path, message);
}

#[cfg(windows)]
fn show_error_dialog(dump_path: &Path, message: &str) {
    use windows::core::HSTRING;
    use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

    let msg = format!(
        "Portfolio stopped unexpectedly.\n\n\
         Crash report: {}\n\n\
         Error: {}",
        dump_path.display(),
        message
    );

    unsafe {
        MessageBoxW(
            None,
            &HSTRING::from(msg),
            &HSTRING::from("Portfolio - Fatal Error"),
            MB_ICONERROR | MB_OK,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_crash_dump_path() {
        let time = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = crash_dump_path(Path::new("/tmp"), time);
        assert_eq!(path, Path::new("/tmp/portfolio_crash_20240309_140507.txt"));
    }

    #[test]
    fn test_payload_message() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(payload_message(s.as_ref()), "boom");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(payload_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(payload_message(s.as_ref()), "<unknown>");
    }
}
