use chrono::{DateTime, Utc};

/// 产物文件头信息
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub title: String,
    pub homepage: Option<String>,
    pub version: String,
    pub generated_at: DateTime<Utc>,
}

impl HeaderInfo {
    pub fn new(title: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            homepage: None,
            version: generated_at.format("%Y%m%d").to_string(),
            generated_at,
        }
    }

    pub fn with_homepage(mut self, homepage: Option<String>) -> Self {
        self.homepage = homepage;
        self
    }

    /// 写入注释头，prefix 为 `!`（Adblock）或 `#`（其它）
    pub(crate) fn write(&self, out: &mut String, prefix: char, subtitle: &str, entries: usize) {
        let mut line = |text: String| {
            out.push(prefix);
            if !text.is_empty() {
                out.push(' ');
                out.push_str(&text);
            }
            out.push('\n');
        };
        line(format!("Title: {} {}", self.title, subtitle));
        line(format!("Version: {}", self.version));
        line(format!(
            "Last modified: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        line(format!("Total count: {}", entries));
        if let Some(homepage) = &self.homepage {
            line(format!("Homepage: {}", homepage));
        }
        line(String::new());
        out.push('\n');
    }
}
