// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Write;

use jiff::Zoned;

use crate::Severity;

/// The output template used when a log type doesn't specify one.
pub const DEFAULT_OUTPUT_TEMPLATE: &str =
    "{Timestamp:yyyy-MM-dd HH:mm:ss.fff zzz} [{Level:u3}] {Message:lj}{NewLine}{Exception}";

const DEFAULT_TIMESTAMP_FORMAT: &str = "yyyy-MM-dd HH:mm:ss.fff zzz";

/// A parsed output template.
///
/// Recognized placeholders:
///
/// * `{Timestamp}` or `{Timestamp:<format>}`, where the format uses `yyyy MM dd HH hh mm ss f..
///   zzz tt` tokens. Defaults to `yyyy-MM-dd HH:mm:ss.fff zzz`.
/// * `{Level}` (full name), `{Level:u3}` (`INF`), `{Level:w3}` (`inf`).
/// * `{Message}`, with any format (`{Message:lj}`) ignored.
/// * `{NewLine}` and `{Exception}`.
///
/// `{{` and `}}` escape braces. Unknown placeholders are written verbatim.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
///
/// use jiff::Zoned;
/// use logroute::Severity;
/// use logroute::layout::OutputTemplate;
///
/// let template = OutputTemplate::parse("[{Level:u3}] {Message}");
/// let now = Zoned::from_str("2024-08-10T17:12:52[UTC]").unwrap();
/// assert_eq!(
///     template.render(&now, Severity::Warning, "disk is full", None),
///     "[WRN] disk is full"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Timestamp(String),
    Level(LevelCase),
    Message,
    NewLine,
    Exception,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelCase {
    Full,
    Upper3,
    Lower3,
}

impl Default for OutputTemplate {
    fn default() -> Self {
        OutputTemplate::parse(DEFAULT_OUTPUT_TEMPLATE)
    }
}

impl OutputTemplate {
    /// Parse a template. Parsing never fails; malformed placeholders stay literal.
    pub fn parse(template: &str) -> OutputTemplate {
        let mut tokens = vec![];
        let mut literal = String::new();
        let mut rest = template;

        while let Some(c) = rest.chars().next() {
            match c {
                '{' if rest.starts_with("{{") => {
                    literal.push('{');
                    rest = &rest[2..];
                }
                '}' if rest.starts_with("}}") => {
                    literal.push('}');
                    rest = &rest[2..];
                }
                '{' => match rest.find('}') {
                    Some(end) => {
                        let placeholder = &rest[1..end];
                        match parse_placeholder(placeholder) {
                            Some(token) => {
                                if !literal.is_empty() {
                                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                                }
                                tokens.push(token);
                            }
                            None => literal.push_str(&rest[..=end]),
                        }
                        rest = &rest[end + 1..];
                    }
                    None => {
                        literal.push_str(rest);
                        rest = "";
                    }
                },
                c => {
                    literal.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        OutputTemplate { tokens }
    }

    /// Render one entry.
    pub fn render(
        &self,
        time: &Zoned,
        severity: Severity,
        message: &str,
        exception: Option<&str>,
    ) -> String {
        let mut text = String::with_capacity(message.len() + 64);
        for token in &self.tokens {
            match token {
                Token::Literal(s) => text.push_str(s),
                Token::Timestamp(format) => {
                    let mut stamp = String::new();
                    if write!(&mut stamp, "{}", time.strftime(format)).is_err() {
                        stamp = time.timestamp().to_string();
                    }
                    text.push_str(&stamp);
                }
                Token::Level(LevelCase::Full) => text.push_str(severity.as_str()),
                Token::Level(LevelCase::Upper3) => text.push_str(severity.abbreviation()),
                Token::Level(LevelCase::Lower3) => {
                    text.push_str(&severity.abbreviation().to_ascii_lowercase())
                }
                Token::Message => text.push_str(message),
                Token::NewLine => text.push('\n'),
                Token::Exception => {
                    if let Some(exception) = exception {
                        text.push_str(exception);
                        if !exception.ends_with('\n') {
                            text.push('\n');
                        }
                    }
                }
            }
        }
        text
    }
}

fn parse_placeholder(placeholder: &str) -> Option<Token> {
    let (name, format) = match placeholder.split_once(':') {
        Some((name, format)) => (name, Some(format)),
        None => (placeholder, None),
    };
    // alignment such as `{Level,5}` is accepted and ignored
    let name = name.split(',').next().unwrap_or(name).trim();

    let token = match name {
        "Timestamp" => Token::Timestamp(dotnet_to_strftime(
            format.unwrap_or(DEFAULT_TIMESTAMP_FORMAT),
        )),
        "Level" => match format {
            Some("u3") | Some("u") => Token::Level(LevelCase::Upper3),
            Some("w3") | Some("w") => Token::Level(LevelCase::Lower3),
            _ => Token::Level(LevelCase::Full),
        },
        "Message" => Token::Message,
        "NewLine" => Token::NewLine,
        "Exception" => Token::Exception,
        _ => return None,
    };
    Some(token)
}

/// Translate a .NET custom date format string into a jiff strftime pattern.
pub(crate) fn dotnet_to_strftime(format: &str) -> String {
    let chars = format.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        match (c, run) {
            ('y', 1..=2) => out.push_str("%y"),
            ('y', _) => out.push_str("%Y"),
            ('M', 1) => out.push_str("%-m"),
            ('M', 2) => out.push_str("%m"),
            ('M', 3) => out.push_str("%b"),
            ('M', _) => out.push_str("%B"),
            ('d', 1) => out.push_str("%-d"),
            ('d', 2) => out.push_str("%d"),
            ('d', 3) => out.push_str("%a"),
            ('d', _) => out.push_str("%A"),
            ('H', 1) => out.push_str("%-H"),
            ('H', _) => out.push_str("%H"),
            ('h', 1) => out.push_str("%-I"),
            ('h', _) => out.push_str("%I"),
            ('m', 1) => out.push_str("%-M"),
            ('m', _) => out.push_str("%M"),
            ('s', 1) => out.push_str("%-S"),
            ('s', _) => out.push_str("%S"),
            ('f', n) | ('F', n) => {
                let _ = write!(&mut out, "%{}f", n.min(9));
            }
            ('t', _) => out.push_str("%p"),
            ('z', n) if n >= 3 => out.push_str("%:z"),
            ('z', _) => out.push_str("%z"),
            ('%', _) => {
                for _ in 0..run {
                    out.push_str("%%");
                }
            }
            (c, _) => {
                for _ in 0..run {
                    out.push(c);
                }
            }
        }
        i += run;
    }

    out
}
