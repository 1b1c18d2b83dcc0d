//! Command variable expansion.
//!
//! Manifest commands are whitespace-tokenised respecting double-quoted
//! strings. Within a token, `%var%` and `%env:NAME%` expand; `env:` keys
//! not covered by the supplied table resolve to the process environment,
//! and unknown plain variables are left untouched. The first expanded
//! token becomes the application name; the rest are prepended to the
//! user's arguments.

/// A resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Application name.
    pub application: String,
    /// Arguments, command-supplied first, then user arguments.
    pub args: Vec<String>,
}

/// Split into whitespace-separated tokens, treating double-quoted spans as
/// single tokens.
#[must_use]
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Expand `%var%` / `%env:NAME%` occurrences in one token.
#[must_use]
pub fn expand_token(token: &str, vars: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let key = &after[..end];
                match lookup(key, vars) {
                    Some(value) => out.push_str(&value),
                    // Unknown variables stay verbatim.
                    None => {
                        out.push('%');
                        out.push_str(key);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup(key: &str, vars: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(value) = vars(key) {
        return Some(value);
    }
    key.strip_prefix("env:")
        .and_then(|name| std::env::var(name).ok())
}

/// Tokenise and expand a command string.
#[must_use]
pub fn expand_command(command: &str, vars: &dyn Fn(&str) -> Option<String>) -> Vec<String> {
    tokenize(command)
        .iter()
        .map(|token| expand_token(token, vars))
        .collect()
}

/// Look `name` up in the manifest command map; on a match, expand it and
/// prepend its arguments to `user_args`.
#[must_use]
pub fn resolve_command(
    commands: &std::collections::BTreeMap<String, String>,
    name: &str,
    user_args: &[String],
    vars: &dyn Fn(&str) -> Option<String>,
) -> Option<CommandLine> {
    let command = commands.get(name)?;
    let mut tokens = expand_command(command, vars);
    if tokens.is_empty() {
        return None;
    }
    let application = tokens.remove(0);
    tokens.extend(user_args.iter().cloned());
    Some(CommandLine {
        application,
        args: tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn tokenize_respects_quotes() {
        assert_eq!(
            tokenize(r#"run "hello world" plain"#),
            vec!["run", "hello world", "plain"]
        );
    }

    #[test]
    fn expand_known_variable() {
        let vars = |key: &str| (key == "project").then(|| "App".to_string());
        assert_eq!(expand_token("%project%.dll", &vars), "App.dll");
    }

    #[test]
    fn unknown_variable_stays_verbatim() {
        assert_eq!(expand_token("%nope%", &no_vars), "%nope%");
    }

    #[test]
    fn env_keys_fall_back_to_process_environment() {
        // Process env fallback for unknown env: keys.
        unsafe { std::env::set_var("CARAVEL_TEST_PORT", "5000") };
        assert_eq!(
            expand_token("--server %env:CARAVEL_TEST_PORT%", &no_vars),
            "--server 5000"
        );
    }

    #[test]
    fn host_web_scenario() {
        // "web": "Microsoft.Host --server %env:PORT% app.dll", PORT=5000,
        // invoked as `host web extra`.
        unsafe { std::env::set_var("PORT", "5000") };
        let mut commands = BTreeMap::new();
        commands.insert(
            "web".to_string(),
            "Microsoft.Host --server %env:PORT% app.dll".to_string(),
        );

        let line = resolve_command(&commands, "web", &["extra".to_string()], &no_vars).unwrap();
        assert_eq!(line.application, "Microsoft.Host");
        assert_eq!(line.args, vec!["--server", "5000", "app.dll", "extra"]);
    }

    #[test]
    fn unknown_command_is_none() {
        let commands = BTreeMap::new();
        assert!(resolve_command(&commands, "web", &[], &no_vars).is_none());
    }
}
