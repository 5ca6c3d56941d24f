use std::io::Write;

/// Receives human oriented status updates from the pipeline stages.
///
/// Nothing reported here affects the results of a run.
pub trait ProgressSink: Send + Sync {
    /// `replace_previous` marks high frequency per-item updates that may
    /// overwrite the previous line; other messages start a new line.
    fn report(&self, message: &str, replace_previous: bool);
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _message: &str, _replace_previous: bool) {}
}

/// Writes progress to stdout, overwriting per-item lines in place
/// unless `verbose` is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalProgress {
    verbose: bool,
}

impl TerminalProgress {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

/// Clears the rest of the line, prints the message and resets attributes
fn render(message: &str, replace_previous: bool, verbose: bool) -> String {
    let end = if replace_previous && !verbose {
        '\r'
    } else {
        '\n'
    };
    format!("\x1b[K{message}\x1b[0m{end}")
}

impl ProgressSink for TerminalProgress {
    fn report(&self, message: &str, replace_previous: bool) {
        let mut stdout = std::io::stdout().lock();
        // a closed stdout must not fail the run
        stdout
            .write_all(render(message, replace_previous, self.verbose).as_bytes())
            .and_then(|_| stdout.flush())
            .ok();
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::sync::Mutex;

    /// Captures progress so that tests can inspect it
    #[derive(Default)]
    pub struct RecordingProgress {
        pub messages: Mutex<Vec<(String, bool)>>,
    }

    impl RecordingProgress {
        pub fn replaced(&self) -> Vec<String> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, replace)| *replace)
                .map(|(message, _)| message.clone())
                .collect()
        }
    }

    impl ProgressSink for RecordingProgress {
        fn report(&self, message: &str, replace_previous: bool) {
            self.messages
                .lock()
                .unwrap()
                .push((message.to_string(), replace_previous));
        }
    }

    #[test]
    fn render_replaces_line() {
        assert_eq!(render("  10.0.0.0/8", true, false), "\x1b[K  10.0.0.0/8\x1b[0m\r");
        assert_eq!(render("Complete", false, false), "\x1b[KComplete\x1b[0m\n");
    }

    #[test]
    fn verbose_keeps_history() {
        assert_eq!(render("  10.0.0.0/8", true, true), "\x1b[K  10.0.0.0/8\x1b[0m\n");
    }
}
