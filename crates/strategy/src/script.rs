//! Parameter handling for user-authored micro-scripts.
//!
//! A script exposes its tunable parameters as top-level numeric assignments
//! (`period = 22`). Overrides are applied by prepending fresh assignments, so
//! the body's references resolve to the overridden values without parsing
//! any expressions.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use common::{Script, ScriptParam};

/// A `name = <number>` line, optionally followed by a `#` comment. Groups:
/// indent, name, value, trailing text. Only literal constants are
/// parameters; `x = 2 * y` is code.
fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?mR)^([ \t]*)([A-Za-z_][A-Za-z0-9_]*)[ \t]*=[ \t]*([0-9]+(?:\.[0-9]+)?)([ \t]*(?:#.*)?)$")
            .expect("regex assignment")
    })
}

/// Collect every constant assignment in source order. A name assigned twice
/// keeps its first position and takes the last value.
pub fn parse_params(code: &str) -> Vec<ScriptParam> {
    let mut params: Vec<ScriptParam> = Vec::new();
    for caps in assignment_re().captures_iter(code) {
        let Ok(value) = caps[3].parse::<f64>() else {
            continue;
        };
        let name = &caps[2];
        match params.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => params.push(ScriptParam::new(name, value)),
        }
    }
    params
}

/// Rewrite the script's constant assignments to the override values,
/// preserving indentation, comments and line endings. Returns `None` when
/// no line changed.
pub fn sync_overrides(code: &str, overrides: &[ScriptParam]) -> Option<String> {
    let mut changed = false;
    let synced = assignment_re().replace_all(code, |caps: &Captures| {
        let line = &caps[0];
        let Some(param) = overrides.iter().find(|p| p.name == &caps[2]) else {
            return line.to_string();
        };
        let candidate = format!("{}{} = {}{}", &caps[1], &caps[2], param.value, &caps[4]);
        if same_ignoring_whitespace(&candidate, line) {
            line.to_string()
        } else {
            changed = true;
            candidate
        }
    });

    changed.then(|| synced.into_owned())
}

/// Override assignments, one per line, followed by the raw body.
pub fn assemble(script: &Script) -> String {
    let mut out = String::new();
    for param in &script.overrides {
        out.push_str(&format!("{} = {}\n", param.name, param.value));
    }
    out.push_str(&script.body);
    out
}

fn same_ignoring_whitespace(a: &str, b: &str) -> bool {
    a.chars()
        .filter(|c| !c.is_whitespace())
        .eq(b.chars().filter(|c| !c.is_whitespace()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WVF: &str = "# Parameters:\npd = 22\n\n# Code:\nhc = highest('close', pd)\nwvf = ((hc - low) / hc) * 100\nplot('WVF', wvf, '#888', 'histogram', 'lower')\n";

    #[test]
    fn parses_only_constant_assignments() {
        let params = parse_params(WVF);
        assert_eq!(params, vec![ScriptParam::new("pd", 22.0)]);
    }

    #[test]
    fn parses_decimals_indentation_and_comments() {
        let code = "  mult = 2.5  # width\nlen=14\nflag == 3\n9lives = 1\nx = 1.\n";
        let params = parse_params(code);
        assert_eq!(
            params,
            vec![
                ScriptParam::new("mult", 2.5),
                ScriptParam::new("len", 14.0),
            ]
        );
    }

    #[test]
    fn repeated_names_keep_first_position_and_last_value() {
        let params = parse_params("a = 1\nb = 2\na = 3\n");
        assert_eq!(
            params,
            vec![ScriptParam::new("a", 3.0), ScriptParam::new("b", 2.0)]
        );
    }

    #[test]
    fn sync_rewrites_matching_lines_only() {
        let code = "pd = 22\n    mult = 2 # keep\nother = 5\n";
        let overrides = vec![ScriptParam::new("pd", 30.0), ScriptParam::new("mult", 2.5)];
        let synced = sync_overrides(code, &overrides).unwrap();
        assert_eq!(synced, "pd = 30\n    mult = 2.5 # keep\nother = 5\n");
    }

    #[test]
    fn sync_reports_no_change() {
        let code = "pd=22\r\nplot(pd)";
        assert!(sync_overrides(code, &[ScriptParam::new("pd", 22.0)]).is_none());

        let synced = sync_overrides(code, &[ScriptParam::new("pd", 10.0)]).unwrap();
        assert_eq!(synced, "pd = 10\r\nplot(pd)");
    }

    #[test]
    fn sync_keeps_comments_and_crlf_endings() {
        let code = "len = 5 # bars\r\nplot(len)\r\n";
        let synced = sync_overrides(code, &[ScriptParam::new("len", 8.0)]).unwrap();
        assert_eq!(synced, "len = 8 # bars\r\nplot(len)\r\n");
        assert_eq!(parse_params(code), vec![ScriptParam::new("len", 5.0)]);
    }

    #[test]
    fn assemble_prepends_overrides_in_order() {
        let script = Script::new("plot(pd)").with_overrides(vec![
            ScriptParam::new("pd", 30.0),
            ScriptParam::new("mult", 1.5),
        ]);
        assert_eq!(assemble(&script), "pd = 30\nmult = 1.5\nplot(pd)");
    }
}
