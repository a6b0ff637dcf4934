use console::style;
use electronav_core::ElectronavError;
use std::fmt;

/// Error with context and suggestions for the terminal
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Electrode type missing from the catalog in use
pub fn unknown_electrode(id: &str) -> CliError {
    CliError::new("Unknown electrode type")
        .with_context(format!("No catalog entry matches '{}'.", id))
        .with_suggestion("List the available types: electronav electrodes")
        .with_suggestion("Or point at your own catalog: --catalog probes.toml")
        .with_help("Run: electronav electrodes --help")
}

/// No history record for the requested date
pub fn session_not_found(date: &str) -> CliError {
    CliError::new("Session not found")
        .with_context(format!("The recording history has no session dated {}.", date))
        .with_suggestion("List recorded sessions: electronav history list")
        .with_suggestion("Check which spreadsheet is used: electronav config")
        .with_help("Run: electronav history --help")
}

/// Invalid configuration value
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check electronav.toml for typos")
        .with_suggestion("Or unset the matching ELECTRONAV_* environment variable")
        .with_help("Run: electronav config")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    if let Some(cli_error) = error.downcast_ref::<CliError>() {
        return CliError {
            message: cli_error.message.clone(),
            context: cli_error.context.clone(),
            suggestions: cli_error.suggestions.clone(),
            help_command: cli_error.help_command.clone(),
        };
    }

    let detail = format!("{:#}", error);
    match error.downcast_ref::<ElectronavError>() {
        Some(ElectronavError::UnknownElectrodeType { id }) => unknown_electrode(id),
        Some(ElectronavError::SessionNotFound { date }) => session_not_found(&date.to_string()),
        Some(ElectronavError::ConfigInvalid { key, reason }) => invalid_config(key, reason),
        Some(ElectronavError::InvariantViolation(_)) => CliError::new("Operation not allowed")
            .with_context(detail)
            .with_suggestion("A session always keeps at least one electrode"),
        Some(ElectronavError::InvalidArgument { .. }) => CliError::new("Invalid input")
            .with_context(detail)
            .with_suggestion("Check the values passed on the command line"),
        _ if detail.contains("No such file or directory") => CliError::new("File not found")
            .with_context(format!("Error: {}", detail))
            .with_suggestion("Check the file path and try again"),
        _ if detail.contains("ermission denied") => CliError::new("Permission denied")
            .with_context(format!("Error: {}", detail))
            .with_suggestion("Check file permissions"),
        _ => CliError::new(detail),
    }
}
