//! Tokenizer and recursive-descent parser for timer scripts.

use super::ParseError;
use crate::program::{Program, Step, StepAction, SCHEMA_VERSION};

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    Symbol(char),
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

/// Parse a script into a [`Program`].
///
/// Step durations are resolved against `default-duration` here, so the
/// returned AST always carries explicit per-step durations.
pub fn parse_script(src: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(tokens);

    let mut program = Program::new("");
    let mut saw_title = false;
    let mut saw_version = false;
    let mut saw_default = false;

    while !parser.is_eof() {
        let line = parser.line();
        let keyword = parser.expect_ident()?;
        match keyword.as_str() {
            "title" => {
                reject_duplicate(&mut saw_title, line, "title")?;
                program.title = parser.expect_string()?;
            }
            "version" => {
                reject_duplicate(&mut saw_version, line, "version")?;
                let value = parser.expect_int()?;
                program.schema_version = u16::try_from(value).map_err(|_| {
                    ParseError::InvalidNumber {
                        line,
                        text: value.to_string(),
                    }
                })?;
            }
            "default-duration" => {
                reject_duplicate(&mut saw_default, line, "default-duration")?;
                program.default_duration = Some(parser.expect_int()?);
            }
            "step" => {
                let step = parse_step(&mut parser, program.default_duration)?;
                program.add_step(step);
            }
            _ => return Err(ParseError::UnknownField { line, field: keyword }),
        }
    }

    if !saw_version {
        program.schema_version = SCHEMA_VERSION;
    }

    Ok(program)
}

fn reject_duplicate(seen: &mut bool, line: usize, field: &str) -> Result<(), ParseError> {
    if *seen {
        return Err(ParseError::DuplicateField {
            line,
            field: field.to_string(),
        });
    }
    *seen = true;
    Ok(())
}

fn parse_step(parser: &mut Parser, default_duration: Option<i64>) -> Result<Step, ParseError> {
    let step_line = parser.line();
    let id = parser.expect_ident()?;
    parser.expect_symbol('{')?;

    let mut title = None;
    let mut body = None;
    let mut duration = None;
    let mut next = None;
    let mut action = None;
    let mut assets = Vec::new();

    while !parser.accept_symbol('}') {
        let line = parser.line();
        let field = parser.expect_ident()?;
        match field.as_str() {
            "title" => {
                reject_set(&title, line, "title")?;
                title = Some(parser.expect_string()?);
            }
            "body" => {
                reject_set(&body, line, "body")?;
                body = Some(parser.expect_string()?);
            }
            "duration" => {
                reject_set(&duration, line, "duration")?;
                duration = Some(parser.expect_int()?);
            }
            "next" => {
                reject_set(&next, line, "next")?;
                next = Some(parser.expect_ident()?);
            }
            "action" => {
                reject_set(&action, line, "action")?;
                let word = parser.expect_ident()?;
                action = Some(StepAction::from_keyword(&word).ok_or(
                    ParseError::UnknownAction { line, word },
                )?);
            }
            "asset" => assets.push(parser.expect_string()?),
            _ => return Err(ParseError::UnknownField { line, field }),
        }
    }

    let duration = duration
        .or(default_duration)
        .ok_or_else(|| ParseError::MissingDuration {
            line: step_line,
            step: id.clone(),
        })?;

    Ok(Step {
        id,
        title: title.unwrap_or_default(),
        body: body.unwrap_or_default(),
        duration,
        next,
        assets,
        action: action.unwrap_or(StepAction::None),
    })
}

fn reject_set<T>(slot: &Option<T>, line: usize, field: &str) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::DuplicateField {
            line,
            field: field.to_string(),
        });
    }
    Ok(())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&EOF_TOKEN)
    }

    fn line(&self) -> usize {
        self.peek().line
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Ident(name) => Ok(name),
            kind => Err(unexpected(kind, tok.line)),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Str(value) => Ok(value),
            kind => Err(unexpected(kind, tok.line)),
        }
    }

    fn expect_int(&mut self) -> Result<i64, ParseError> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Int(value) => Ok(value),
            kind => Err(unexpected(kind, tok.line)),
        }
    }

    fn expect_symbol(&mut self, expected: char) -> Result<(), ParseError> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Symbol(ch) if ch == expected => Ok(()),
            kind => Err(unexpected(kind, tok.line)),
        }
    }

    fn accept_symbol(&mut self, expected: char) -> bool {
        if matches!(self.peek().kind, TokenKind::Symbol(ch) if ch == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

static EOF_TOKEN: Token = Token {
    kind: TokenKind::Eof,
    line: 0,
};

fn unexpected(kind: TokenKind, line: usize) -> ParseError {
    match kind {
        TokenKind::Eof => ParseError::UnexpectedEof,
        TokenKind::Ident(name) => ParseError::UnexpectedToken { line, token: name },
        TokenKind::Str(value) => ParseError::UnexpectedToken {
            line,
            token: format!("\"{value}\""),
        },
        TokenKind::Int(value) => ParseError::UnexpectedToken {
            line,
            token: value.to_string(),
        },
        TokenKind::Symbol(ch) => ParseError::UnexpectedToken {
            line,
            token: ch.to_string(),
        },
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line = 1;

    while let Some(&ch) = chars.peek() {
        if ch == '\n' {
            line += 1;
            chars.next();
            continue;
        }
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '/' {
            chars.next();
            if matches!(chars.peek(), Some('/')) {
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                        break;
                    }
                }
                continue;
            }
            return Err(ParseError::UnexpectedToken {
                line,
                token: "/".to_string(),
            });
        }

        if ch == '"' {
            chars.next();
            tokens.push(Token {
                kind: TokenKind::Str(read_string(&mut chars, &mut line)?),
                line,
            });
            continue;
        }

        if ch.is_ascii_digit() || ch == '-' {
            let start_line = line;
            let mut text = String::new();
            text.push(ch);
            chars.next();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() {
                    text.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = text.parse::<i64>().map_err(|_| ParseError::InvalidNumber {
                line: start_line,
                text: text.clone(),
            })?;
            tokens.push(Token {
                kind: TokenKind::Int(value),
                line: start_line,
            });
            continue;
        }

        if is_ident_start(ch) {
            let mut ident = String::new();
            while let Some(&next) = chars.peek() {
                if is_ident_continue(next) {
                    ident.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident(ident),
                line,
            });
            continue;
        }

        if matches!(ch, '{' | '}') {
            tokens.push(Token {
                kind: TokenKind::Symbol(ch),
                line,
            });
            chars.next();
            continue;
        }

        return Err(ParseError::UnexpectedToken {
            line,
            token: ch.to_string(),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

fn read_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: &mut usize,
) -> Result<String, ParseError> {
    let start_line = *line;
    let mut value = String::new();
    loop {
        match chars.next() {
            None => return Err(ParseError::UnterminatedString { line: start_line }),
            Some('"') => return Ok(value),
            Some('\\') => match chars.next() {
                Some('"') => value.push('"'),
                Some('\\') => value.push('\\'),
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(escape) => {
                    return Err(ParseError::InvalidEscape {
                        line: *line,
                        escape,
                    })
                }
                None => return Err(ParseError::UnterminatedString { line: start_line }),
            },
            Some('\n') => {
                // Literal newlines inside strings would make line numbers
                // in later errors drift silently; require \n instead.
                return Err(ParseError::UnterminatedString { line: start_line });
            }
            Some(other) => value.push(other),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Whether `text` lexes as a single identifier token.
pub(crate) fn is_valid_ident(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) => chars.all(is_ident_continue),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_program() {
        let src = r#"
            title "Pomodoro"

            step prep {
                title "Prepare"
                duration 300
            }
            step work { duration 1500 }
            step break { duration 300 }
        "#;

        let program = parse_script(src).expect("parse");
        assert_eq!(program.title, "Pomodoro");
        assert_eq!(program.schema_version, SCHEMA_VERSION);
        assert_eq!(program.steps.len(), 3);
        assert_eq!(program.steps[0].title, "Prepare");
        assert_eq!(program.steps[1].id, "work");
        assert_eq!(program.steps[1].duration, 1500);
        assert!(program.steps.iter().all(|s| s.next.is_none()));
    }

    #[test]
    fn parse_all_step_fields() {
        let src = r#"
            step rest {
                title "Rest"
                body "Stretch.\nDrink water."
                duration 120
                next rest
                action auto-advance
                asset "sounds/ding.wav"
                asset "icons/bell.png"
            }
        "#;

        let program = parse_script(src).expect("parse");
        let step = &program.steps[0];
        assert_eq!(step.body, "Stretch.\nDrink water.");
        assert_eq!(step.next.as_deref(), Some("rest"));
        assert_eq!(step.action, StepAction::AutoAdvance);
        assert_eq!(step.assets, vec!["sounds/ding.wav", "icons/bell.png"]);
    }

    #[test]
    fn default_duration_fills_missing() {
        let src = r#"
            default-duration 60
            step a {}
            step b { duration 10 }
        "#;

        let program = parse_script(src).expect("parse");
        assert_eq!(program.steps[0].duration, 60);
        assert_eq!(program.steps[1].duration, 10);
    }

    #[test]
    fn missing_duration_without_default_is_an_error() {
        let err = parse_script("step a {}").expect_err("should fail");
        assert!(matches!(err, ParseError::MissingDuration { step, .. } if step == "a"));
    }

    #[test]
    fn unknown_field_is_a_hard_error() {
        let src = "step a {\n    duration 5\n    color \"red\"\n}";
        let err = parse_script(src).expect_err("should fail");
        assert!(matches!(err, ParseError::UnknownField { line: 3, field } if field == "color"));
    }

    #[test]
    fn duplicate_field_is_an_error() {
        let src = "step a { duration 5 duration 6 }";
        let err = parse_script(src).expect_err("should fail");
        assert!(matches!(err, ParseError::DuplicateField { field, .. } if field == "duration"));
    }

    #[test]
    fn negative_duration_parses() {
        // The validator, not the parser, rejects negatives.
        let program = parse_script("step a { duration -5 }").expect("parse");
        assert_eq!(program.steps[0].duration, -5);
    }

    #[test]
    fn unknown_action_is_an_error() {
        let err = parse_script("step a { duration 5 action ring }").expect_err("should fail");
        assert!(matches!(err, ParseError::UnknownAction { word, .. } if word == "ring"));
    }

    #[test]
    fn comments_are_skipped() {
        let src = "// header\nstep a { duration 5 } // trailing";
        let program = parse_script(src).expect("parse");
        assert_eq!(program.steps.len(), 1);
    }

    #[test]
    fn ident_validation_matches_the_tokenizer() {
        assert!(is_valid_ident("auto-advance_2"));
        assert!(is_valid_ident("_x"));
        assert!(!is_valid_ident("bad id"));
        assert!(!is_valid_ident("9lives"));
        assert!(!is_valid_ident(""));
    }

    #[test]
    fn unterminated_string_reports_start_line() {
        let err = parse_script("title \"oops").expect_err("should fail");
        assert!(matches!(err, ParseError::UnterminatedString { line: 1 }));
    }
}
