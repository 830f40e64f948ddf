use std::io;
use std::str::FromStr;
use std::sync::Arc;

use tokio::process::Command;
use tokio::task::JoinHandle;

const TITLE: &str = "File Uploader";
const DESKTOP_COMMAND: &str = "notify-send";

/// Announces finished upload batches. Delivery is best effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notifier {
    Off,
    /// Emits a tracing event
    Log,
    /// Runs a desktop notification command with title and message arguments
    Desktop { command: String },
}

impl Notifier {
    #[must_use]
    pub fn message(files: usize) -> String {
        format!("A total of {files} files have been received in the Server")
    }

    /// Spawns delivery in the background and returns immediately.
    ///
    /// The caller never learns the result; failures are only logged.
    /// The returned handle may be dropped.
    pub fn fire(self: &Arc<Self>, files: usize) -> Option<JoinHandle<()>> {
        if *self.as_ref() == Notifier::Off {
            return None;
        }
        let notifier = Arc::clone(self);
        Some(tokio::spawn(async move {
            if let Err(e) = notifier.send(files).await {
                tracing::warn!("upload notification not delivered. Error: {e}");
            }
        }))
    }

    pub async fn send(&self, files: usize) -> io::Result<()> {
        let message = Self::message(files);
        match self {
            Notifier::Off => Ok(()),
            Notifier::Log => {
                tracing::info!("{TITLE}: {message}");
                Ok(())
            }
            Notifier::Desktop { command } => {
                let status = Command::new(command)
                    .arg(TITLE)
                    .arg(&message)
                    .status()
                    .await?;
                if status.success() {
                    Ok(())
                } else {
                    Err(io::Error::other(format!("{command} exited with {status}")))
                }
            }
        }
    }
}

impl FromStr for Notifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Notifier::Off),
            "log" => Ok(Notifier::Log),
            "desktop" => Ok(Notifier::Desktop {
                command: DESKTOP_COMMAND.to_owned(),
            }),
            other => Err(format!("unknown notifier '{other}', expected off, log or desktop")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("off", Notifier::Off)]
    #[case("LOG", Notifier::Log)]
    #[case(" desktop ", Notifier::Desktop { command: "notify-send".into() })]
    #[trace]
    fn parse(#[case] value: &str, #[case] expected: Notifier) {
        // Act
        let actual: Notifier = value.parse().unwrap();

        // Assert
        assert_eq!(actual, expected);
    }

    #[test]
    fn parse_unknown() {
        // Act
        let actual = "email".parse::<Notifier>();

        // Assert
        assert!(actual.is_err());
    }

    #[test]
    fn message_names_batch_size() {
        assert_eq!(
            Notifier::message(3),
            "A total of 3 files have been received in the Server"
        );
    }

    #[tokio::test]
    async fn missing_desktop_command_is_an_error() {
        // Arrange
        let notifier = Notifier::Desktop {
            command: "picdrop-no-such-notifier".into(),
        };

        // Act
        let result = notifier.send(1).await;

        // Assert
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fire_off_spawns_nothing() {
        // Arrange
        let notifier = Arc::new(Notifier::Off);

        // Act
        let handle = notifier.fire(2);

        // Assert
        assert!(handle.is_none());
        assert_eq!(Arc::strong_count(&notifier), 1);
    }

    #[tokio::test]
    async fn fire_failure_does_not_reach_caller() {
        // Arrange
        let notifier = Arc::new(Notifier::Desktop {
            command: "picdrop-no-such-notifier".into(),
        });

        // Act
        let handle = notifier.fire(2).unwrap();
        let joined = handle.await;

        // Assert
        assert!(joined.is_ok());
        assert_eq!(Arc::strong_count(&notifier), 1);
    }

    #[tokio::test]
    async fn fire_log_completes() {
        // Arrange
        let notifier = Arc::new(Notifier::Log);

        // Act
        let joined = notifier.fire(5).unwrap().await;

        // Assert
        assert!(joined.is_ok());
    }
}
