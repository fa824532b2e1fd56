//! Opens the game's UI in the user's browser.

use std::io;

use tokio::process::Command;
use tracing::info;

use super::process::{ProcessHandle, parse_command_line};

/// Spawn `<command> <url>` and return its handle so the caller can tear it down later.
pub fn open_browser(command: &str, url: &str) -> io::Result<ProcessHandle> {
    let (program, args) = parse_command_line(command)
        .filter(|(program, _)| !program.is_empty())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid browser command `{command}`"),
            )
        })?;

    let mut browser = Command::new(program);
    browser.args(args).arg(url);
    let handle = ProcessHandle::spawn("browser", browser)?;
    info!(url, pid = ?handle.pid(), "opened browser");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected() {
        let err = open_browser("  ", "http://localhost:8088").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn url_is_passed_as_last_argument() {
        let url = "http://localhost:8088/q/dev-ui";
        let handle = open_browser(&format!("sh -c 'test \"$0\" = {url}'"), url).unwrap();
        assert_eq!(handle.wait_for_exit().await, Some(0));
    }
}
