//! Turning one line of user input into a [`ParsedCommand`].

const RESOURCE_USAGE: &str = "Usage: @resource <name> <arg1=value1> <arg2=value2> ...";
const PROMPT_USAGE: &str = "Usage: /prompt <name> <arg1=value1> <arg2=value2> ...";

/// Ordered `key=value` arguments as typed by the user.
pub type CommandArgs = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Quit,
    ListResources,
    ReadResource { name: String, args: CommandArgs },
    ListPrompts,
    GetPrompt { name: String, args: CommandArgs },
    InvokeDefault { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Error parsing command: missing closing quote. Check your quotes.")]
    UnterminatedQuote,

    #[error("{usage}")]
    MissingName { usage: &'static str },
}

impl From<shell_words::ParseError> for ParseError {
    fn from(_: shell_words::ParseError) -> Self {
        Self::UnterminatedQuote
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ParsedCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.eq_ignore_ascii_case("quit") {
        return Ok(Some(ParsedCommand::Quit));
    }
    if line == "@resources" {
        return Ok(Some(ParsedCommand::ListResources));
    }
    if line == "/prompts" {
        return Ok(Some(ParsedCommand::ListPrompts));
    }
    if has_keyword(line, "@resource") {
        let (name, args) = named_invocation(line, RESOURCE_USAGE)?;
        return Ok(Some(ParsedCommand::ReadResource { name, args }));
    }
    if has_keyword(line, "/prompt") {
        let (name, args) = named_invocation(line, PROMPT_USAGE)?;
        return Ok(Some(ParsedCommand::GetPrompt { name, args }));
    }
    Ok(Some(ParsedCommand::InvokeDefault {
        text: line.to_string(),
    }))
}

fn has_keyword(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn named_invocation(line: &str, usage: &'static str) -> Result<(String, CommandArgs), ParseError> {
    let mut tokens = tokenize(line)?.into_iter().skip(1);
    let name = tokens.next().ok_or(ParseError::MissingName { usage })?;
    Ok((name, decode_args(tokens)))
}

/// Split a line into words the way a POSIX shell would.
///
/// Single quotes are literal. Double quotes group words and honour `\"`,
/// `\\`, `\$` and `` \` ``. Outside quotes a backslash escapes the next
/// character, and a word starting with `#` comments out the rest of the line.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    shell_words::split(line).map_err(ParseError::from)
}

/// Decode `key=value` tokens, keeping their order.
///
/// Only the first `=` splits, and one layer of matching quotes around the
/// value is removed. Tokens without `=` are skipped.
pub fn decode_args<I>(tokens: I) -> CommandArgs
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    tokens
        .into_iter()
        .filter_map(|token| {
            let (key, value) = token.as_ref().split_once('=')?;
            Some((key.to_string(), strip_quotes(value).to_string()))
        })
        .collect()
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Arguments as a JSON object; a repeated key keeps its last value.
pub fn args_to_json(args: &[(String, String)]) -> serde_json::Map<String, serde_json::Value> {
    args.iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> CommandArgs {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_tokenize_groups_quoted_words() {
        let tokens = tokenize(r#"@resource report year=2024 "title=Q1 Report""#).unwrap();
        assert_eq!(tokens, ["@resource", "report", "year=2024", "title=Q1 Report"]);

        let tokens = tokenize(r#"a 'b c' d"e f"g  h\ i"#).unwrap();
        assert_eq!(tokens, ["a", "b c", "de fg", "h i"]);

        assert_eq!(tokenize("x '' y").unwrap(), ["x", "", "y"]);
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_escapes_inside_double_quotes() {
        let tokens = tokenize(r#""say \"hi\"" "c:\dir" 'it\s'"#).unwrap();
        assert_eq!(tokens, [r#"say "hi""#, r"c:\dir", r"it\s"]);
    }

    #[test]
    fn test_tokenize_rejects_unterminated_input() {
        assert_eq!(
            tokenize(r#"@resource report title="Q1"#),
            Err(ParseError::UnterminatedQuote)
        );
        assert_eq!(
            tokenize("@resource report title='Q1"),
            Err(ParseError::UnterminatedQuote)
        );
        assert_eq!(
            tokenize(r#"@resource report title="say \"hi"#),
            Err(ParseError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_decode_args() {
        let decoded = decode_args(["year=2024", "title=Q1 Report", "flag", "expr=a=b", "q='x y'"]);
        assert_eq!(
            decoded,
            args(&[
                ("year", "2024"),
                ("title", "Q1 Report"),
                ("expr", "a=b"),
                ("q", "x y"),
            ])
        );

        // Only one layer is stripped, and only when both ends match.
        let decoded = decode_args([r#"a=""x"""#, r#"b="x'"#, r#"c=""#]);
        assert_eq!(decoded, args(&[("a", r#""x""#), ("b", r#""x'"#), ("c", r#"""#)]));
    }

    #[test]
    fn test_parse_line_shapes() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("quit"), Ok(Some(ParsedCommand::Quit)));
        assert_eq!(parse_line("  QuIt "), Ok(Some(ParsedCommand::Quit)));
        assert_eq!(parse_line("@resources"), Ok(Some(ParsedCommand::ListResources)));
        assert_eq!(parse_line("/prompts"), Ok(Some(ParsedCommand::ListPrompts)));

        assert_eq!(
            parse_line(r#"@resource report year=2024 "title=Q1 Report""#),
            Ok(Some(ParsedCommand::ReadResource {
                name: "report".to_string(),
                args: args(&[("year", "2024"), ("title", "Q1 Report")]),
            }))
        );
        assert_eq!(
            parse_line("/prompt summarize topic=rust"),
            Ok(Some(ParsedCommand::GetPrompt {
                name: "summarize".to_string(),
                args: args(&[("topic", "rust")]),
            }))
        );
    }

    #[test]
    fn test_parse_line_usage_errors() {
        assert_eq!(
            parse_line("@resource"),
            Err(ParseError::MissingName {
                usage: RESOURCE_USAGE
            })
        );
        assert_eq!(
            parse_line("/prompt   "),
            Err(ParseError::MissingName {
                usage: PROMPT_USAGE
            })
        );
        assert_eq!(
            parse_line(r#"@resource report title="Q1"#),
            Err(ParseError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_free_text_goes_to_default_tool() {
        // Free text is never tokenized, so stray quotes are fine.
        assert_eq!(
            parse_line("what's the weather?"),
            Ok(Some(ParsedCommand::InvokeDefault {
                text: "what's the weather?".to_string()
            }))
        );
        assert_eq!(
            parse_line("@resourcesx and more"),
            Ok(Some(ParsedCommand::InvokeDefault {
                text: "@resourcesx and more".to_string()
            }))
        );
        assert_eq!(
            parse_line("@other thing"),
            Ok(Some(ParsedCommand::InvokeDefault {
                text: "@other thing".to_string()
            }))
        );
    }

    #[test]
    fn test_args_to_json_last_value_wins() {
        let json = args_to_json(&args(&[("k", "1"), ("j", "2"), ("k", "3")]));
        assert_eq!(json.get("k"), Some(&serde_json::json!("3")));
        assert_eq!(json.len(), 2);
    }
}
