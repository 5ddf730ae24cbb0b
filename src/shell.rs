//! Interactive menu: register, log in, write and read messages.
//!
//! Input is line based so the whole session can be scripted through a pipe.
//! Secrets use hidden prompts only when attached to a terminal.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use cipherchat::{
    EnvelopeId, InboxStore, MessageStatus, Messenger, Session, UserStore, validate_body,
};
use std::io::{BufRead, Write};
use zeroize::Zeroizing;

use crate::auth::trim_newline;

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

pub struct Shell<'a, S, R, W> {
    messenger: &'a mut Messenger<S>,
    input: R,
    out: W,
    hide_secrets: bool,
    session: Option<Session>,
}

enum Flow {
    Continue,
    Quit,
}

impl<'a, S, R, W> Shell<'a, S, R, W>
where
    S: UserStore + InboxStore,
    R: BufRead,
    W: Write,
{
    pub fn new(messenger: &'a mut Messenger<S>, input: R, out: W, hide_secrets: bool) -> Self {
        Self {
            messenger,
            input,
            out,
            hide_secrets,
            session: None,
        }
    }

    /// Runs until the user quits or input ends.
    pub fn run(mut self) -> Result<()> {
        loop {
            let flow = match self.session.clone() {
                None => self.logged_out_menu()?,
                Some(session) => self.logged_in_menu(session)?,
            };
            if let Flow::Quit = flow {
                return Ok(());
            }
        }
    }

    fn logged_out_menu(&mut self) -> Result<Flow> {
        writeln!(self.out, "\n--- cipherchat ---")?;
        writeln!(self.out, "1. Register")?;
        writeln!(self.out, "2. Log in")?;
        writeln!(self.out, "3. Quit")?;

        let Some(choice) = self.prompt("Choose an option: ")? else {
            return Ok(Flow::Quit);
        };

        match choice.as_str() {
            "1" => self.register(),
            "2" => self.login(),
            "3" => {
                writeln!(self.out, "Goodbye!")?;
                Ok(Flow::Quit)
            }
            _ => {
                writeln!(self.out, "Invalid option.")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn logged_in_menu(&mut self, session: Session) -> Result<Flow> {
        writeln!(
            self.out,
            "\n--- Main menu (logged in as @{}) ---",
            session.username()
        )?;
        writeln!(self.out, "1. Write a new message")?;
        writeln!(self.out, "2. Read my messages")?;
        writeln!(self.out, "3. Log out")?;

        let Some(choice) = self.prompt("Choose an option: ")? else {
            return Ok(Flow::Quit);
        };

        match choice.as_str() {
            "1" => self.compose(&session),
            "2" => self.read_messages(&session),
            "3" => {
                writeln!(self.out, "Logging out @{}...", session.username())?;
                self.session = None;
                Ok(Flow::Continue)
            }
            _ => {
                writeln!(self.out, "Invalid option.")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn register(&mut self) -> Result<Flow> {
        writeln!(self.out, "\n--- Register ---")?;
        let Some(username) = self.prompt("Username: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(password) = self.prompt_secret("Password: ")? else {
            return Ok(Flow::Quit);
        };

        match self.messenger.register(&username, &password) {
            Ok(()) => writeln!(self.out, "User @{} registered.", username.trim())?,
            Err(e) => writeln!(self.out, "Error: {e}")?,
        }
        Ok(Flow::Continue)
    }

    fn login(&mut self) -> Result<Flow> {
        writeln!(self.out, "\n--- Log in ---")?;
        let Some(username) = self.prompt("Username: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(password) = self.prompt_secret("Password: ")? else {
            return Ok(Flow::Quit);
        };

        match self.messenger.login(&username, &password) {
            Ok(session) => {
                writeln!(self.out, "Welcome, @{}.", session.username())?;
                self.session = Some(session);
            }
            Err(e) => writeln!(self.out, "Error: {e}")?,
        }
        Ok(Flow::Continue)
    }

    fn compose(&mut self, session: &Session) -> Result<Flow> {
        writeln!(self.out, "\n--- New message ---")?;
        let Some(to) = self.prompt("Recipient @: ")? else {
            return Ok(Flow::Quit);
        };
        if to.is_empty() {
            writeln!(self.out, "Error: recipient must not be empty")?;
            return Ok(Flow::Continue);
        }
        match self.messenger.store().find_by_username(&to) {
            Ok(Some(_)) => {}
            Ok(None) => {
                writeln!(self.out, "Error: user '{to}' not found")?;
                return Ok(Flow::Continue);
            }
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                return Ok(Flow::Continue);
            }
        }

        let min_len = self.messenger.config().min_message_len();
        let body = loop {
            let Some(body) = self.prompt(&format!("Message (at least {min_len} characters): "))?
            else {
                return Ok(Flow::Quit);
            };
            match validate_body(&body, min_len) {
                Ok(()) => break body,
                Err(e) => writeln!(self.out, "{e}")?,
            }
        };

        let Some(passphrase) = self.prompt_secret("Passphrase to seal the message: ")? else {
            return Ok(Flow::Quit);
        };

        match self.messenger.send(session, &to, &body, &passphrase) {
            Ok(_) => writeln!(self.out, "Message sent.")?,
            Err(e) => writeln!(self.out, "Error: {e}")?,
        }
        Ok(Flow::Continue)
    }

    fn read_messages(&mut self, session: &Session) -> Result<Flow> {
        writeln!(self.out, "\n--- My messages ---")?;
        writeln!(self.out, "1. New messages (unread)")?;
        writeln!(self.out, "2. Old messages (read)")?;
        let Some(choice) = self.prompt("Choose an option (1 or 2): ")? else {
            return Ok(Flow::Quit);
        };

        let status = match choice.as_str() {
            "1" => MessageStatus::Unread,
            "2" => MessageStatus::Read,
            _ => {
                writeln!(self.out, "Invalid option.")?;
                return Ok(Flow::Continue);
            }
        };

        let listing = match self.messenger.inbox(session, status) {
            Ok(listing) => listing,
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                return Ok(Flow::Continue);
            }
        };
        if listing.is_empty() {
            writeln!(self.out, "No {status} messages.")?;
            return Ok(Flow::Continue);
        }

        writeln!(self.out, "\nMessages:")?;
        for entry in listing.entries() {
            writeln!(
                self.out,
                "{}. From: @{} - {}",
                entry.position,
                entry.from,
                format_timestamp(entry.timestamp)
            )?;
        }

        let Some(choice) = self.prompt("Number of the message to open (ENTER to cancel): ")?
        else {
            return Ok(Flow::Quit);
        };
        if choice.is_empty() {
            writeln!(self.out, "Cancelled.")?;
            return Ok(Flow::Continue);
        }

        let id = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| listing.resolve(n))
            .cloned();
        match id {
            Some(id) => self.open_with_retry(session, &id),
            None => {
                writeln!(self.out, "Invalid number.")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn open_with_retry(&mut self, session: &Session, id: &EnvelopeId) -> Result<Flow> {
        loop {
            let Some(passphrase) = self.prompt_secret("Passphrase to open the message: ")? else {
                return Ok(Flow::Quit);
            };

            match self.messenger.read(session, id, &passphrase) {
                Ok(msg) => {
                    writeln!(self.out, "\n--- Message ---")?;
                    writeln!(
                        self.out,
                        "From: @{} - {}",
                        msg.from,
                        format_timestamp(msg.timestamp)
                    )?;
                    writeln!(self.out, "{}", msg.body)?;
                    writeln!(self.out, "---------------")?;
                    return Ok(Flow::Continue);
                }
                Err(e) if e.is_retryable() => {
                    writeln!(self.out, "{e}.")?;
                    let Some(answer) = self.prompt("Try again? (y/n): ")? else {
                        return Ok(Flow::Quit);
                    };
                    if !answer.eq_ignore_ascii_case("y") {
                        writeln!(self.out, "Cancelled.")?;
                        return Ok(Flow::Continue);
                    }
                }
                Err(e) => {
                    writeln!(self.out, "Error: {e}")?;
                    return Ok(Flow::Continue);
                }
            }
        }
    }

    /// Next input line, trimmed. `None` at end of input.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt_secret(&mut self, label: &str) -> Result<Option<Zeroizing<String>>> {
        if self.hide_secrets {
            self.out.flush()?;
            return Ok(Some(Zeroizing::new(rpassword::prompt_password(label)?)));
        }

        write!(self.out, "{label}")?;
        self.out.flush()?;

        let mut line = Zeroizing::new(String::new());
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        trim_newline(&mut line);
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherchat::{Config, KdfParams, MemoryStore};

    fn messenger() -> Messenger<MemoryStore> {
        let config = Config::new("unused.json".into())
            .with_kdf(KdfParams::new(1024, 1, 1).unwrap())
            .with_min_message_len(10);
        Messenger::new(MemoryStore::new(), config)
    }

    fn run(m: &mut Messenger<MemoryStore>, script: &str) -> String {
        let mut out = Vec::new();
        Shell::new(m, script.as_bytes(), &mut out, false)
            .run()
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    const SETUP: &str = "1\nalice\napw\n1\nbob\nbpw\n";

    #[test]
    fn quit_and_eof_both_end_the_session() {
        let mut m = messenger();
        assert!(run(&mut m, "3\n").contains("Goodbye!"));
        assert!(run(&mut m, "").contains("Choose an option"));
    }

    #[test]
    fn register_login_send_and_read() {
        let mut m = messenger();
        let script = format!(
            "{SETUP}\
             2\nalice\napw\n\
             1\nbob\nshort\nhello bob, this is long enough\nkey\n\
             3\n\
             2\nbob\nbpw\n\
             2\n1\n1\nkey\n\
             3\n3\n"
        );
        let out = run(&mut m, &script);

        assert!(out.contains("User @alice registered."));
        assert!(out.contains("Welcome, @alice."));
        assert!(out.contains("message too short (5 characters)"));
        assert!(out.contains("Message sent."));
        assert!(out.contains("1. From: @alice - "));
        assert!(out.contains("hello bob, this is long enough"));
        assert!(out.contains("Goodbye!"));
    }

    #[test]
    fn wrong_passphrase_offers_retry_and_keeps_unread() {
        let mut m = messenger();
        let script = format!(
            "{SETUP}\
             2\nalice\napw\n\
             1\nbob\nsecret plans for friday\nkey\n\
             3\n\
             2\nbob\nbpw\n\
             2\n1\n1\nwrong\nn\n\
             2\n1\n1\nwrong\ny\nkey\n\
             3\n3\n"
        );
        let out = run(&mut m, &script);

        assert!(out.contains("wrong passphrase or corrupted message."));
        assert!(out.contains("Cancelled."));
        assert_eq!(out.matches("secret plans for friday").count(), 1);

        let bob = m.login("bob", "bpw").unwrap();
        assert!(m.inbox(&bob, MessageStatus::Unread).unwrap().is_empty());
        assert_eq!(m.inbox(&bob, MessageStatus::Read).unwrap().len(), 1);
    }

    #[test]
    fn unknown_recipient_and_bad_choices_are_reported() {
        let mut m = messenger();
        let script = format!(
            "{SETUP}\
             2\nalice\napw\n\
             1\nghost\n\
             2\n9\n\
             2\n1\n\
             7\n3\n3\n"
        );
        let out = run(&mut m, &script);

        assert!(out.contains("Error: user 'ghost' not found"));
        assert!(out.contains("Invalid option."));
        assert!(out.contains("No unread messages."));
    }

    #[test]
    fn failed_login_stays_logged_out() {
        let mut m = messenger();
        let out = run(&mut m, &format!("{SETUP}2\nalice\nnope\n3\n"));
        assert!(out.contains("Error: invalid username or password"));
        assert!(!out.contains("Main menu"));
    }
}
