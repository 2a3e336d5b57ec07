//! Renders a [`Program`] back into script text.
//!
//! The output is accepted verbatim by [`super::parse_script`], which is
//! what makes extract → create round-trips work. Emission is purely a
//! function of the program, so re-running it is byte-stable.

use std::fmt::Write;

use crate::program::{Program, StepAction};

/// Render `program` as a timer script.
pub fn emit_script(program: &Program) -> String {
    let mut out = String::new();

    if !program.title.is_empty() {
        let _ = writeln!(out, "title {}", quote(&program.title));
    }
    let _ = writeln!(out, "version {}", program.schema_version);
    if let Some(default) = program.default_duration {
        let _ = writeln!(out, "default-duration {default}");
    }

    for step in &program.steps {
        let _ = writeln!(out);
        let _ = writeln!(out, "step {} {{", step.id);
        if !step.title.is_empty() {
            let _ = writeln!(out, "    title {}", quote(&step.title));
        }
        if !step.body.is_empty() {
            let _ = writeln!(out, "    body {}", quote(&step.body));
        }
        let _ = writeln!(out, "    duration {}", step.duration);
        if let Some(next) = &step.next {
            let _ = writeln!(out, "    next {next}");
        }
        if step.action != StepAction::None {
            let _ = writeln!(out, "    action {}", step.action.keyword());
        }
        for asset in &step.assets {
            let _ = writeln!(out, "    asset {}", quote(asset));
        }
        let _ = writeln!(out, "}}");
    }

    out
}

/// Quote a string with the escapes the tokenizer understands.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Step, StepAction};
    use crate::script::parse_script;

    fn sample() -> Program {
        let mut program = Program::new("Deep \"work\"");
        program.default_duration = Some(60);
        program.add_step(Step {
            id: "prep".to_string(),
            title: "Prepare".to_string(),
            body: "Clear the desk.\nFill water.".to_string(),
            duration: 300,
            next: Some("work".to_string()),
            assets: vec!["sounds/ding.wav".to_string()],
            action: StepAction::Alert,
        });
        program.add_step(Step {
            id: "work".to_string(),
            title: String::new(),
            body: String::new(),
            duration: 1500,
            next: None,
            assets: Vec::new(),
            action: StepAction::None,
        });
        program
    }

    #[test]
    fn emitted_script_parses_back_identically() {
        let program = sample();
        let text = emit_script(&program);
        let reparsed = parse_script(&text).expect("reparse");
        assert_eq!(reparsed, program);
    }

    #[test]
    fn emission_is_stable() {
        let program = sample();
        assert_eq!(emit_script(&program), emit_script(&program));
    }

    #[test]
    fn strings_are_escaped() {
        let text = emit_script(&sample());
        assert!(text.contains(r#"title "Deep \"work\"""#));
        assert!(text.contains(r#"body "Clear the desk.\nFill water.""#));
    }
}
