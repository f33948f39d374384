//! 容错 JSON 解析
//!
//! 模型返回的 JSON 经常带有小毛病。先严格解析，失败后按顺序做以下修复再解析一次：
//!
//! 1. 去掉首尾空白
//! 2. 去掉 Markdown 代码块围栏（```json ... ```）
//! 3. 截取最外层的 `{ ... }` / `[ ... ]`，丢弃前后的说明文字
//! 4. 删除 `}` / `]` 之前的多余逗号
//! 5. 把不构成合法 JSON 转义的反斜杠加倍（例如 LaTeX 的 `\sqrt`）
//! 6. `\b` `\f` `\r` `\t` 后面紧跟小写字母时按 LaTeX 命令处理（`\frac`、`\beta`、`\theta`、`\rho`）；
//!    `\n` 只有拼成已知命令（`\nabla`、`\neq` 等）时才这样处理，其余仍是换行
//!
//! 修复后仍失败时返回的是原始文本的解析错误。

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

fn fence_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").ok())
        .as_ref()
}

fn trailing_comma_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").ok()).as_ref()
}

/// 容错解析
pub fn parse_tolerant<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let original_err = match serde_json::from_str::<T>(raw.trim()) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let repaired = repair(raw);
    serde_json::from_str::<T>(&repaired).map_err(|_| original_err)
}

/// 按固定顺序应用全部修复规则
pub fn repair(raw: &str) -> String {
    let text = raw.trim();
    let text = strip_code_fence(text);
    let text = outermost_span(text);
    let text = match trailing_comma_regex() {
        Some(re) => re.replace_all(text, "$1").into_owned(),
        None => text.to_string(),
    };
    escape_stray_backslashes(&text)
}

fn strip_code_fence(text: &str) -> &str {
    fence_regex()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

fn outermost_span(text: &str) -> &str {
    let start = match text.find(&['{', '['][..]) {
        Some(idx) => idx,
        None => return text,
    };
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };

    match text.rfind(closer) {
        Some(end) if end > start => &text[start..=end],
        _ => &text[start..],
    }
}

fn escape_stray_backslashes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }

        if starts_latex_command(&chars[i + 1..]) {
            out.push_str("\\\\");
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('"') | Some('\\') | Some('/') | Some('b') | Some('f') | Some('n')
            | Some('r') | Some('t') => {
                out.push('\\');
                out.push(chars[i + 1]);
                i += 2;
            }
            Some('u') if is_unicode_escape(&chars[i + 2..]) => {
                out.push_str("\\u");
                i += 2;
            }
            _ => {
                out.push_str("\\\\");
                i += 1;
            }
        }
    }

    out
}

/// 以 `n` 开头、会被误读成换行的常见 LaTeX 命令
const LATEX_N_COMMANDS: &[&str] = &[
    "nabla", "neq", "ne", "neg", "newline", "ni", "not", "notin", "nu", "ngeq", "nleq", "nmid",
];

/// 反斜杠之后的文本是否是一个会被误读为 JSON 转义的 LaTeX 命令
fn starts_latex_command(rest: &[char]) -> bool {
    let word: String = rest
        .iter()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    match word.chars().next() {
        Some('b') | Some('f') | Some('r') | Some('t') => word
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_ascii_lowercase()),
        Some('n') => LATEX_N_COMMANDS.contains(&word.as_str()),
        _ => false,
    }
}

fn is_unicode_escape(rest: &[char]) -> bool {
    rest.len() >= 4 && rest[..4].iter().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strict_json_is_untouched() {
        let value: Value = parse_tolerant(r#"{"a": "línea\nnueva"}"#).unwrap();
        assert_eq!(value["a"], "línea\nnueva");
    }

    #[test]
    fn test_code_fence_and_chatter() {
        let raw = "Aquí tienes:\n```json\n{\"questions\": []}\n```\nSuerte!";
        let value: Value = parse_tolerant(raw).unwrap();
        assert!(value["questions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_trailing_commas() {
        let value: Value = parse_tolerant(r#"{"options": ["a", "b",], "n": 1,}"#).unwrap();
        assert_eq!(value["options"].as_array().unwrap().len(), 2);
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_latex_backslashes() {
        let raw = r#"{"formula": "$\sqrt{x} + \alpha$"}"#;
        let value: Value = parse_tolerant(raw).unwrap();
        assert_eq!(value["formula"], r"$\sqrt{x} + \alpha$");
    }

    #[test]
    fn test_latex_commands_shadowing_json_escapes() {
        let raw = r#"{"q": "$\sqrt{2}$ y $\frac{1}{2}$ y $\theta$ y $\beta$ y $\rho$ y $\nabla f$"}"#;
        let value: Value = parse_tolerant(raw).unwrap();
        assert_eq!(
            value["q"],
            r"$\sqrt{2}$ y $\frac{1}{2}$ y $\theta$ y $\beta$ y $\rho$ y $\nabla f$"
        );
    }

    #[test]
    fn test_real_escapes_survive_latex_repair() {
        let raw = r#"{"q": "$\sqrt{x}$\nLa respuesta\tfinal\n\t2"}"#;
        let value: Value = parse_tolerant(raw).unwrap();
        // `\tfinal` 形似 LaTeX，按命令保留；`\nLa` 与 `\n\t` 仍是控制字符
        assert_eq!(value["q"], "$\\sqrt{x}$\nLa respuesta\\tfinal\n\t2");
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(escape_stray_backslashes(r"\u00e9"), r"\u00e9");
        assert_eq!(escape_stray_backslashes(r"é \uZZ"), r"é \\uZZ");
    }

    #[test]
    fn test_outermost_span_array() {
        assert_eq!(outermost_span("ok: [1, 2] fin"), "[1, 2]");
        assert_eq!(outermost_span("sin json"), "sin json");
    }

    #[test]
    fn test_unrecoverable_reports_error() {
        let result: Result<Value, _> = parse_tolerant("no es json en absoluto");
        assert!(result.is_err());
    }
}
