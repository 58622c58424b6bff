use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};

fn default_event() -> String {
    crate::application::reconciler::CHARGE_SUCCESS.to_string()
}

/// One line of a replay script. Bookings are addressed by caller-chosen
/// labels; the runner maps labels to the generated ids and references.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Command {
    SeedCompany {
        id: String,
        #[serde(default)]
        name: Option<String>,
        slots: u32,
    },
    Submit {
        label: String,
        company: String,
        student: String,
        cv: String,
        amount: Decimal,
    },
    Approve {
        label: String,
    },
    Reject {
        label: String,
        reason: String,
    },
    Initiate {
        label: String,
        mentor: String,
        student: String,
        at: DateTime<Utc>,
        amount: Decimal,
    },
    /// Simulates the provider's signed server-to-server delivery for the
    /// labeled booking's reference.
    Webhook {
        label: String,
        #[serde(default = "default_event")]
        event: String,
    },
    /// Simulates the payer's browser redirect for the labeled booking.
    Confirm {
        label: String,
    },
    AdvanceTime {
        hours: i64,
    },
    Sweep,
}

/// Streams commands out of a JSON-lines script. Blank lines and `#` comments
/// are skipped; each remaining line must be one JSON command object.
pub struct ScriptReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> ScriptReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .lines()
            .filter(|line| {
                line.as_ref()
                    .map(|l| {
                        let trimmed = l.trim();
                        !trimmed.is_empty() && !trimmed.starts_with('#')
                    })
                    .unwrap_or(true)
            })
            .map(|line| {
                let line = line.map_err(BookingError::Io)?;
                serde_json::from_str(&line).map_err(BookingError::Serde)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_parses_commands_and_skips_comments() {
        let script = concat!(
            "# seed data\n",
            "{\"op\":\"seed-company\",\"id\":\"acme\",\"slots\":3}\n",
            "\n",
            "{\"op\":\"submit\",\"label\":\"a\",\"company\":\"acme\",\"student\":\"s1\",\"cv\":\"cv/s1.pdf\",\"amount\":\"50\"}\n",
            "{\"op\":\"sweep\"}\n",
        );
        let commands: Vec<_> = ScriptReader::new(script.as_bytes())
            .commands()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[0],
            Command::SeedCompany {
                id: "acme".to_string(),
                name: None,
                slots: 3
            }
        );
        assert_eq!(
            commands[1],
            Command::Submit {
                label: "a".to_string(),
                company: "acme".to_string(),
                student: "s1".to_string(),
                cv: "cv/s1.pdf".to_string(),
                amount: dec!(50),
            }
        );
        assert_eq!(commands[2], Command::Sweep);
    }

    #[test]
    fn test_webhook_event_defaults_to_charge_success() {
        let line = r#"{"op":"webhook","label":"a"}"#;
        let command: Command = serde_json::from_str(line).unwrap();
        assert_eq!(
            command,
            Command::Webhook {
                label: "a".to_string(),
                event: "charge.success".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let script = "{\"op\":\"sweep\"}\nnot json\n";
        let results: Vec<_> = ScriptReader::new(script.as_bytes()).commands().collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
