use std::path::PathBuf;

use core_types::UiLanguage;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// 1-based position in the last printed list.
    Index(usize),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    List,
    Search(String),
    Select(Target),
    Ask(String),
    History,
    /// `refresh` fetches the list again instead of using the session cache.
    Models { refresh: bool },
    Model(String),
    Analysis,
    Rag(String),
    Upload(PathBuf),
    Drop(PathBuf),
    Status,
    Lang(UiLanguage),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("unsupported language `{0}`")]
    Language(String),
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "" => Command::Empty,
        "list" | "ls" => Command::List,
        // Blank search text goes through too; it lists everything.
        "search" => Command::Search(rest.to_owned()),
        "select" | "open" => Command::Select(target(required("select", rest)?)),
        "ask" => Command::Ask(required("ask", rest)?.to_owned()),
        "history" => Command::History,
        "models" => match rest.to_ascii_lowercase().as_str() {
            "" => Command::Models { refresh: false },
            "refresh" => Command::Models { refresh: true },
            _ => return Err(ParseError::Unknown(format!("models {rest}"))),
        },
        "model" => Command::Model(required("model", rest)?.to_owned()),
        "analysis" => Command::Analysis,
        "rag" => Command::Rag(required("rag", rest)?.to_owned()),
        "upload" => Command::Upload(PathBuf::from(required("upload", rest)?)),
        "drop" => Command::Drop(PathBuf::from(required("drop", rest)?)),
        "status" => Command::Status,
        "lang" => Command::Lang(language(required("lang", rest)?)?),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_owned())),
    };
    Ok(command)
}

fn required<'a>(command: &'static str, rest: &'a str) -> Result<&'a str, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

fn target(arg: &str) -> Target {
    match arg.parse::<usize>() {
        Ok(index) if index > 0 => Target::Index(index),
        _ => Target::Id(arg.to_owned()),
    }
}

fn language(arg: &str) -> Result<UiLanguage, ParseError> {
    match arg.to_ascii_lowercase().as_str() {
        "zh" | "zh_cn" | "zh-cn" => Ok(UiLanguage::ZhCn),
        "en" | "en_us" | "en-us" => Ok(UiLanguage::EnUs),
        other => Err(ParseError::Language(other.to_owned())),
    }
}
