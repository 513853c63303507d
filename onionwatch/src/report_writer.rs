//! JSON report output.
//!
//! A completed report is serialized and written to `"<onion>.<suffix>"`,
//! or to stdout when no suffix is configured. File creation is retried
//! forever at a fixed delay: a full disk or a permissions hiccup should
//! hold the report, not discard a finished scan.

use anyhow::Result;
use onionwatch_core::Report;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

const RETRY_DELAY: Duration = Duration::from_secs(5);

pub fn report_file_name(onion: &str, suffix: &str) -> String {
    format!("{}.{}", onion, suffix)
}

pub fn write_json_report(report: &Report, suffix: Option<&str>) -> Result<()> {
    write_json_report_in(Path::new("."), report, suffix)
}

pub fn write_json_report_in(dir: &Path, report: &Report, suffix: Option<&str>) -> Result<()> {
    let body = report.serialize()?;
    match suffix {
        None => println!("{}", body),
        Some(suffix) => {
            let path = dir.join(report_file_name(report.onion.as_str(), suffix));
            let mut file = create_with_retry(&path);
            file.write_all(body.as_bytes())?;
            file.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn create_with_retry(path: &Path) -> File {
    loop {
        match File::create(path) {
            Ok(f) => return f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot create report file, retrying in 5s");
                std::thread::sleep(RETRY_DELAY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_target_dot_suffix() {
        assert_eq!(report_file_name("abc.onion", "json"), "abc.onion.json");
    }

    #[test]
    fn writes_report_to_named_file() {
        let dir = tempfile::tempdir().unwrap();

        let mut report = Report::new("abc.onion");
        report.ssh_banner = "SSH-2.0-OpenSSH_7.2".to_string();
        write_json_report_in(dir.path(), &report, Some("json")).unwrap();

        let written = std::fs::read_to_string(dir.path().join("abc.onion.json")).unwrap();
        assert!(written.contains("OpenSSH_7.2"));
    }
}
