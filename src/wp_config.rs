use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Error;

/// Values picked out of a WordPress `wp-config.php`.
///
/// The file is PHP, so this is a best-effort scan for the `define()` calls and the
/// `$table_prefix` assignment a stock install carries. Anything computed at runtime
/// (`getenv()`, concatenation) is not seen and has to come from the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WpConfig {
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_host: Option<String>,
    pub table_prefix: Option<String>,
    pub multisite: bool,
}

impl WpConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = fs::read_to_string(path)?;
        parse(&source)
    }
}

pub fn parse(source: &str) -> Result<WpConfig, Error> {
    let define = Regex::new(
        r#"(?m)^\s*define\(\s*['"](\w+)['"]\s*,\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)"|(\w+))\s*\)"#,
    )?;
    let prefix = Regex::new(r#"(?m)^\s*\$table_prefix\s*=\s*['"]([^'"]*)['"]"#)?;

    let mut constants: HashMap<&str, String> = HashMap::new();
    for caps in define.captures_iter(source) {
        let Some(name) = caps.get(1) else { continue };
        let value = if let Some(m) = caps.get(2) {
            unescape(m.as_str(), Quote::Single)
        } else if let Some(m) = caps.get(3) {
            unescape(m.as_str(), Quote::Double)
        } else {
            caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default()
        };
        // PHP ignores a redefinition; the first define() wins.
        constants.entry(name.as_str()).or_insert(value);
    }

    let multisite = constants
        .get("MULTISITE")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    Ok(WpConfig {
        db_name: constants.remove("DB_NAME"),
        db_user: constants.remove("DB_USER"),
        db_password: constants.remove("DB_PASSWORD"),
        db_host: constants.remove("DB_HOST"),
        table_prefix: prefix
            .captures(source)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
        multisite,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

/// PHP string literal rules: single quotes only collapse `\'` and `\\`; double
/// quotes also know `\"`, `\$`, `\n`, `\t` and `\r`. Any other backslash is kept.
fn unescape(raw: &str, quote: Quote) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let replacement = match (quote, chars.peek().copied()) {
            (_, Some('\\')) => Some('\\'),
            (Quote::Single, Some('\'')) => Some('\''),
            (Quote::Double, Some('"')) => Some('"'),
            (Quote::Double, Some('$')) => Some('$'),
            (Quote::Double, Some('n')) => Some('\n'),
            (Quote::Double, Some('t')) => Some('\t'),
            (Quote::Double, Some('r')) => Some('\r'),
            _ => None,
        };
        match replacement {
            Some(r) => {
                chars.next();
                out.push(r);
            }
            None => out.push('\\'),
        }
    }
    out
}
