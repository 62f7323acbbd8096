//! One-way channel for human-readable status and error messages.

use tracing::error;

pub trait MessageSink: Send + Sync {
    fn notify(&self, message: &str);
}

/// Logs messages at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn notify(&self, message: &str) {
        error!("{message}");
    }
}

/// Prints messages to stderr for the CLI user.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl MessageSink for StderrSink {
    fn notify(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::MessageSink;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub(crate) fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl MessageSink for RecordingSink {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}
