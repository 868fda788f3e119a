/// Destination for the informational and error text a monitor produces
/// while a process runs.
pub trait LogSink {
    fn log(&mut self, text: &str);

    fn flush(&mut self) {}
}

/// Default sink: prints each chunk to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log(&mut self, text: &str) {
        println!("{}", text.trim_end_matches(['\r', '\n']));
    }

    fn flush(&mut self) {
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}

/// Routes sink text into `tracing` at info level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&mut self, text: &str) {
        for line in text.lines() {
            tracing::info!(target: "cos::process", "{line}");
        }
    }
}

/// Keeps everything it was given. Handy for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub entries: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All logged text concatenated.
    pub fn joined(&self) -> String {
        self.entries.concat()
    }
}

impl LogSink for MemorySink {
    fn log(&mut self, text: &str) {
        self.entries.push(text.to_string());
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn log(&mut self, text: &str) {
        (**self).log(text);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}

/// Frame stderr text the way it's shown when no error callback is set.
pub fn error_block(text: &str) -> String {
    format!("\n\nError:\n{}\n", text.trim_end())
}
