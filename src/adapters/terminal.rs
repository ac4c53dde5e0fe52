use crate::domain::ports::Terminal;
use crate::utils::error::{MigrationError, Result};
use std::io::{self, BufRead, Write};

/// stdin/stdout 終端，密碼透過 rpassword 讀取不回顯
#[derive(Debug, Default)]
pub struct StdTerminal;

impl StdTerminal {
    pub fn new() -> Self {
        Self
    }
}

impl Terminal for StdTerminal {
    fn write_line(&mut self, line: &str) {
        println!("{}", line);
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        let read = io::stdin().lock().read_line(&mut input)?;
        if read == 0 {
            return Err(MigrationError::IoError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "standard input closed",
            )));
        }
        Ok(input.trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    fn read_secret(&mut self, prompt: &str) -> Result<String> {
        Ok(rpassword::prompt_password(prompt)?)
    }
}
