use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "CIPHERCHAT_PASSWORD";
pub const PASSPHRASE_ENV: &str = "CIPHERCHAT_PASSPHRASE";

/// Login password: env var, then one piped stdin line, then a hidden prompt.
pub fn read_password() -> Result<Zeroizing<String>> {
    read_secret(PASSWORD_ENV, "Password: ", "no password provided")
}

/// Passphrase that seals or opens a message. Same sources as the password.
pub fn read_passphrase() -> Result<Zeroizing<String>> {
    read_secret(PASSPHRASE_ENV, "Passphrase: ", "no passphrase provided")
}

fn read_secret(env: &str, prompt: &str, missing: &str) -> Result<Zeroizing<String>> {
    //  CIPHERCHAT_PASSWORD="pw" cipherchat inbox --user bob
    if let Ok(value) = std::env::var(env) {
        if !value.is_empty() {
            return Ok(Zeroizing::new(value));
        }
    }

    //  printf 'pw\nkey\n' | cipherchat open <id> --user bob
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);
        if !buf.is_empty() {
            return Ok(buf);
        }
    } else {
        let value = Zeroizing::new(rpassword::prompt_password(prompt)?);
        if !value.is_empty() {
            return Ok(value);
        }
    }

    bail!("{missing}")
}

/// Password for a new account. Interactive use asks twice.
pub fn read_new_password() -> Result<Zeroizing<String>> {
    if let Ok(value) = std::env::var(PASSWORD_ENV) {
        if !value.is_empty() {
            return Ok(Zeroizing::new(value));
        }
    }

    if !io::stdin().is_terminal() {
        let mut handle = io::stdin().lock();
        let mut pw = Zeroizing::new(String::new());
        handle.read_line(&mut pw)?;
        trim_newline(&mut pw);

        if pw.is_empty() {
            bail!("password cannot be empty");
        }
        return Ok(pw);
    }

    let pw1 = Zeroizing::new(rpassword::prompt_password("New password: ")?);
    let pw2 = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);

    if pw1.is_empty() {
        bail!("password cannot be empty");
    }
    if pw1 != pw2 {
        bail!("passwords do not match");
    }

    Ok(pw1)
}

pub fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
