//! Credential prompts for the login flow
//!
//! The phone number comes from the command line; the code and the 2FA password are
//! read from the terminal (or from piped input when stdin is not a terminal).

use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::{Error, Result};

/// Profile data a sign-up would need. Never produced by this tool.
#[derive(Debug, Clone, Default)]
pub struct SignUpInfo {
    pub first_name: String,
    pub last_name: String,
}

/// Source of credentials for one login negotiation.
pub trait CredentialPrompt {
    /// Phone number of the operating account.
    fn phone(&self) -> &str;

    /// Verification code sent by the service to `phone`.
    fn code(&mut self, phone: &str) -> Result<String>;

    /// 2FA password, only asked when the account requires it.
    fn password(&mut self, hint: Option<&str>) -> Result<String>;

    /// Called when the phone has no account. Sign-up is refused.
    fn accept_terms_of_service(&mut self, _terms: Option<&str>) -> Result<()> {
        Err(Error::SignUpRequired)
    }

    fn sign_up(&mut self) -> Result<SignUpInfo> {
        Err(Error::NotImplemented("sign up"))
    }
}

/// Line-oriented prompt over any reader/writer pair.
pub struct TerminalPrompt<R, W> {
    phone: String,
    input: R,
    output: W,
    masked_password: bool,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process terminal. Password echo is disabled when stdin is a tty.
    pub fn stdio(phone: impl Into<String>) -> Self {
        let masked_password = io::stdin().is_terminal();
        Self {
            phone: phone.into(),
            input: io::stdin().lock(),
            output: io::stdout(),
            masked_password,
        }
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    /// Prompt reading plain lines from `input`; used for piped input and tests.
    pub fn new(phone: impl Into<String>, input: R, output: W) -> Self {
        Self {
            phone: phone.into(),
            input,
            output,
            masked_password: false,
        }
    }

    fn ask(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{}", label).map_err(terminal_error)?;
        self.output.flush().map_err(terminal_error)?;

        let mut line = String::new();
        if self.input.read_line(&mut line).map_err(terminal_error)? == 0 {
            return Err(Error::Auth("input closed before a value was entered".to_string()));
        }
        non_empty(line.trim(), label)
    }
}

/// Credentials that cannot be read leave the login incomplete.
fn terminal_error(err: io::Error) -> Error {
    Error::Auth(format!("failed to read credentials: {}", err))
}

fn non_empty(value: &str, label: &str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::Auth(format!(
            "empty value for '{}'",
            label.trim_end_matches([':', ' '])
        )));
    }
    Ok(value.to_string())
}

impl<R: BufRead, W: Write> CredentialPrompt for TerminalPrompt<R, W> {
    fn phone(&self) -> &str {
        &self.phone
    }

    fn code(&mut self, _phone: &str) -> Result<String> {
        self.ask("Enter code: ")
    }

    fn password(&mut self, hint: Option<&str>) -> Result<String> {
        let label = match hint {
            Some(hint) if !hint.is_empty() => format!("Enter 2FA password (hint: {}): ", hint),
            _ => "Enter 2FA password: ".to_string(),
        };

        if !self.masked_password {
            return self.ask(&label);
        }

        self.output.flush().map_err(terminal_error)?;
        let password = rpassword::prompt_password(&label).map_err(terminal_error)?;
        non_empty(password.trim(), &label)
    }
}
