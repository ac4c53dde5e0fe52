use colored::{Color, Colorize};

/// 終端輸出配色。是否上色由配置決定並明確傳遞，不修改全域狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn paint(&self, text: &str, color: Color) -> String {
        if self.enabled {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn prompt(&self, text: &str) -> String {
        self.paint(text, Color::Magenta)
    }

    pub fn info(&self, text: &str) -> String {
        self.paint(text, Color::Cyan)
    }

    pub fn success(&self, text: &str) -> String {
        self.paint(text, Color::Green)
    }

    pub fn warn(&self, text: &str) -> String {
        self.paint(text, Color::Yellow)
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(text, Color::Red)
    }

    /// 用於 VLAN ID 等需要醒目提示的值
    pub fn emphasis(&self, text: &str) -> String {
        if self.enabled {
            text.green().blink().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(true)
    }
}
