use crate::domain::ports::Terminal;
use crate::utils::error::Result;
use crate::utils::style::Palette;

/// 帶配色的操作人員對話介面
pub struct Console<T: Terminal> {
    terminal: T,
    palette: Palette,
}

impl<T: Terminal> Console<T> {
    pub fn new(terminal: T, palette: Palette) -> Self {
        Self { terminal, palette }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn into_terminal(self) -> T {
        self.terminal
    }

    pub fn line(&mut self, text: &str) {
        self.terminal.write_line(text);
    }

    pub fn blank(&mut self) {
        self.terminal.write_line("");
    }

    pub fn info(&mut self, text: &str) {
        let styled = self.palette.info(text);
        self.terminal.write_line(&styled);
    }

    pub fn success(&mut self, text: &str) {
        let styled = self.palette.success(text);
        self.terminal.write_line(&styled);
    }

    pub fn warn(&mut self, text: &str) {
        let styled = self.palette.warn(text);
        self.terminal.write_line(&styled);
    }

    pub fn error(&mut self, text: &str) {
        let styled = self.palette.error(text);
        self.terminal.write_line(&styled);
    }

    /// Trimmed answer, case preserved.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        let styled = self.palette.prompt(prompt);
        Ok(self.terminal.read_line(&styled)?.trim().to_string())
    }

    /// Trimmed, lower-cased answer for keyword prompts.
    pub fn ask_keyword(&mut self, prompt: &str) -> Result<String> {
        Ok(self.ask(prompt)?.to_lowercase())
    }

    pub fn ask_secret(&mut self, prompt: &str) -> Result<String> {
        let styled = self.palette.prompt(prompt);
        self.terminal.read_secret(&styled)
    }

    /// 只有明確回答 "yes" 才算確認
    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(self.ask_keyword(prompt)? == "yes")
    }

    /// 同上，但空白輸入視為同意 ([yes]/no)
    pub fn confirm_default_yes(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.ask_keyword(prompt)?;
        Ok(answer.is_empty() || answer == "yes")
    }

    pub fn numbered_list<S: AsRef<str>>(&mut self, items: &[S]) {
        for (i, item) in items.iter().enumerate() {
            self.terminal.write_line(&format!("{}. {}", i + 1, item.as_ref()));
        }
    }

    /// Reads a 1-based selection. Invalid or out-of-range input is reported and yields `None`.
    pub fn choose_index(&mut self, prompt: &str, len: usize) -> Result<Option<usize>> {
        let answer = self.ask(prompt)?;
        match parse_selection(&answer, len) {
            Some(index) => Ok(Some(index)),
            None => {
                tracing::warn!("Invalid selection '{}' for a list of {}", answer, len);
                self.error(&format!(
                    "Invalid selection '{}'. Expected a number between 1 and {}.",
                    answer, len
                ));
                Ok(None)
            }
        }
    }
}

/// 1-based 選項轉成 0-based 索引
pub fn parse_selection(answer: &str, len: usize) -> Option<usize> {
    match answer.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= len => Some(n - 1),
        _ => None,
    }
}
