//! Terminal version of the shared login/registration prompt.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Result;
use tracing::debug;

use eduqa_core::auth::AuthModalMode;
use eduqa_core::forms::{LoginForm, RegisterForm};

use crate::app::App;

/// Failed submissions before the prompt gives up.
const MAX_ATTEMPTS: usize = 3;

/// Typed at the email prompt to switch forms.
const SWITCH_TO_REGISTER: &str = "register";
const SWITCH_TO_LOGIN: &str = "login";
const CANCEL: &str = "cancel";

#[derive(Debug)]
pub enum PromptOutcome {
    /// Signed in; carries the pending redirect path.
    SignedIn(Option<String>),
    /// Closed without signing in.
    Dismissed,
}

/// Drive the prompt while it is open. Without a terminal it is dismissed
/// straight away.
pub async fn run(app: &App) -> Result<PromptOutcome> {
    if !io::stdin().is_terminal() {
        debug!("stdin is not a terminal; dismissing sign-in prompt");
        return Ok(PromptOutcome::Dismissed);
    }

    let mut failures = 0;
    while app.prompt.is_open() && failures < MAX_ATTEMPTS {
        let result = match app.prompt.mode() {
            AuthModalMode::Login => {
                println!(
                    "\nSign in to continue. Type '{}' to create an account or '{}' to close.",
                    SWITCH_TO_REGISTER, CANCEL
                );
                let email = match read_line("Email", app.config.last_email.as_deref())? {
                    Some(email) if !email.eq_ignore_ascii_case(CANCEL) => email,
                    _ => return Ok(PromptOutcome::Dismissed),
                };
                if email.eq_ignore_ascii_case(SWITCH_TO_REGISTER) {
                    app.prompt.set_auth_modal_mode(AuthModalMode::Register);
                    continue;
                }
                let password = rpassword::prompt_password("Password: ")?;
                app.login(&LoginForm { email, password }).await
            }
            AuthModalMode::Register => {
                println!(
                    "\nCreate an account. Type '{}' to sign in instead or '{}' to close.",
                    SWITCH_TO_LOGIN, CANCEL
                );
                let name = match read_line("Name", None)? {
                    Some(name) if !name.eq_ignore_ascii_case(CANCEL) => name,
                    _ => return Ok(PromptOutcome::Dismissed),
                };
                if name.eq_ignore_ascii_case(SWITCH_TO_LOGIN) {
                    app.prompt.set_auth_modal_mode(AuthModalMode::Login);
                    continue;
                }
                let form = read_register_form(name)?;
                app.register(&form).await
            }
        };

        match result {
            Ok(redirect) => return Ok(PromptOutcome::SignedIn(redirect)),
            Err(e) => {
                failures += 1;
                eprintln!("{}", e.user_message());
            }
        }
    }

    if app.session.is_authenticated() {
        return Ok(PromptOutcome::SignedIn(None));
    }
    Ok(PromptOutcome::Dismissed)
}

/// The remaining registration fields after the name.
pub fn read_register_form(name: String) -> Result<RegisterForm> {
    let email = read_line("Email", None)?.unwrap_or_default();
    let password = rpassword::prompt_password("Password: ")?;
    let role = read_line("Role (student/teacher)", Some("student"))?.unwrap_or_default();
    let department = read_line("Department (optional)", None)?;
    let branch = read_line("Branch (optional)", None)?;
    Ok(RegisterForm {
        name,
        email,
        password,
        role,
        department,
        branch,
    })
}

/// Read one trimmed line. Empty input yields `default`, then `None`.
pub fn read_line(label: &str, default: Option<&str>) -> Result<Option<String>> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let input = input.trim();

    Ok(if input.is_empty() {
        default.map(str::to_string)
    } else {
        Some(input.to_string())
    })
}

/// Yes/no question, defaulting to no.
pub fn confirm(question: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }
    let answer = read_line(&format!("{} (y/N)", question), None)?.unwrap_or_default();
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}
