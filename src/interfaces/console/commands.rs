use std::path::PathBuf;
use std::str::FromStr;

use crate::application::use_cases::results_presenter::SortKey;
use crate::domain::error::{AppError, Result};

pub const HELP: &str = "\
Commands:
  open <path>            choose a meter photo
  clear                  drop the chosen photo
  analyze                send the photo for verification
  show                   show the current results
  sort <column>          condition | calculation | actual | expected | status | reason
  collapse               collapse or expand the results table
  export [file name]     write the results as CSV
  print                  print the results table
  save [name]            save the results with a thumbnail
  sessions               list saved analyses
  load <id>              open a saved analysis
  rename <id> [name]     rename a saved analysis
  delete <id>            delete a saved analysis
  new                    start a new analysis
  apikey <key> | clear   store or forget the Gemini API key
  status                 show what is selected
  help                   show this help
  quit                   leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(PathBuf),
    Clear,
    Analyze,
    Show,
    Sort(SortKey),
    Collapse,
    Export(Option<String>),
    Print,
    Save(Option<String>),
    Sessions,
    Load(String),
    Rename { id: String, name: Option<String> },
    Delete(String),
    New,
    ApiKey(Option<String>),
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

        let command = match word.to_ascii_lowercase().as_str() {
            "open" => Command::Open(PathBuf::from(required(rest, "open <path>")?)),
            "clear" => Command::Clear,
            "analyze" | "analyse" => Command::Analyze,
            "show" => Command::Show,
            "sort" => Command::Sort(required(rest, "sort <column>")?.parse()?),
            "collapse" | "expand" => Command::Collapse,
            "export" => Command::Export(rest_opt),
            "print" => Command::Print,
            "save" => Command::Save(rest_opt),
            "sessions" | "history" => Command::Sessions,
            "load" => Command::Load(required(rest, "load <id>")?.to_string()),
            "rename" => {
                let rest = required(rest, "rename <id> [name]")?;
                match rest.split_once(char::is_whitespace) {
                    Some((id, name)) => Command::Rename {
                        id: id.to_string(),
                        name: Some(name.trim().to_string()),
                    },
                    None => Command::Rename {
                        id: rest.to_string(),
                        name: None,
                    },
                }
            }
            "delete" => Command::Delete(required(rest, "delete <id>")?.to_string()),
            "new" => Command::New,
            "apikey" => match rest {
                "" => return Err(usage("apikey <key> | clear")),
                "clear" => Command::ApiKey(None),
                key => Command::ApiKey(Some(key.to_string())),
            },
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(AppError::ValidationError(format!(
                    "Unknown command: {} (type help)",
                    other
                )))
            }
        };
        Ok(command)
    }
}

fn required<'a>(rest: &'a str, form: &str) -> Result<&'a str> {
    if rest.is_empty() {
        Err(usage(form))
    } else {
        Ok(rest)
    }
}

fn usage(form: &str) -> AppError {
    AppError::ValidationError(format!("Usage: {}", form))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("analyze".parse::<Command>().unwrap(), Command::Analyze);
        assert_eq!("  QUIT ".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!("export".parse::<Command>().unwrap(), Command::Export(None));
        assert_eq!(
            "open /tmp/meter photo.jpg".parse::<Command>().unwrap(),
            Command::Open(PathBuf::from("/tmp/meter photo.jpg"))
        );
    }

    #[test]
    fn test_parse_sort_key() {
        assert_eq!(
            "sort actual".parse::<Command>().unwrap(),
            Command::Sort(SortKey::ActualResult)
        );
        assert!("sort colour".parse::<Command>().is_err());
        assert!("sort".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_rename_keeps_spaces_in_name() {
        assert_eq!(
            "rename 1700000000000 Building A March".parse::<Command>().unwrap(),
            Command::Rename {
                id: "1700000000000".to_string(),
                name: Some("Building A March".to_string()),
            }
        );
        assert_eq!(
            "rename 42".parse::<Command>().unwrap(),
            Command::Rename {
                id: "42".to_string(),
                name: None,
            }
        );
    }

    #[test]
    fn test_parse_apikey() {
        assert_eq!(
            "apikey clear".parse::<Command>().unwrap(),
            Command::ApiKey(None)
        );
        assert_eq!(
            "apikey abc123".parse::<Command>().unwrap(),
            Command::ApiKey(Some("abc123".to_string()))
        );
        assert!("apikey".parse::<Command>().is_err());
    }

    #[test]
    fn test_unknown_command_is_a_validation_error() {
        let err = "frobnicate".parse::<Command>().unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
