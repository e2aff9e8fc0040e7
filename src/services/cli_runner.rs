use crate::error::CommandError;
use crate::model::ConsoleConfig;
use serde_json::Value as JsonValue;
use std::process::Command;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Dsconf,
    Dsctl,
}

/// Tool plus subcommand path and arguments; the connection part of the
/// argument vector is added by [`ConnectionContext::argv`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn dsconf<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool: Tool::Dsconf,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dsctl<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool: Tool::Dsctl,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }

    pub fn extend<I, S>(mut self, more: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(more.into_iter().map(Into::into));
        self
    }

    #[cfg(test)]
    pub fn has_arg(&self, a: &str) -> bool {
        self.args.iter().any(|x| x == a)
    }
}

/// Flags whose values never leave the process except in the real argv.
const SECRET_FLAGS: &[&str] = &["--bind-pw"];

const MASK: &str = "REDACTED";

/// `--bind-pw=x` and `--bind-pw x` both lose the value.
fn redact(argv: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(argv.len());
    let mut hide_next = false;
    for a in argv {
        if hide_next {
            out.push(MASK.to_string());
            hide_next = false;
            continue;
        }
        match a.split_once('=') {
            Some((flag, _)) if SECRET_FLAGS.contains(&flag) => out.push(format!("{flag}={MASK}")),
            _ => {
                hide_next = SECRET_FLAGS.contains(&a.as_str());
                out.push(a.clone());
            }
        }
    }
    out
}

/// Where and how to reach the instance. Passed to every command builder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionContext {
    pub server_id: String,
    pub dsconf: String,
    pub dsctl: String,
    pub run_dir: String,
    pub privilege: Vec<String>,
}

impl ConnectionContext {
    pub fn from_config(cfg: &ConsoleConfig) -> Self {
        Self {
            server_id: cfg.server_id.trim().to_string(),
            dsconf: cfg.dsconf.clone(),
            dsctl: cfg.dsctl.clone(),
            run_dir: cfg.run_dir.clone(),
            privilege: cfg.privilege.clone(),
        }
    }

    /// `ldapi://%2fvar%2frun%2fslapd-<id>.socket`
    pub fn ldapi_url(&self) -> String {
        let dir = self.run_dir.trim_end_matches('/');
        let path = format!("{dir}/slapd-{}.socket", self.server_id);
        format!("ldapi://{}", path.replace('/', "%2f"))
    }

    pub fn argv(&self, inv: &Invocation) -> Vec<String> {
        let mut out = self.privilege.clone();
        match inv.tool {
            Tool::Dsconf => {
                out.push(self.dsconf.clone());
                out.push("-j".into());
                out.push(self.ldapi_url());
            }
            Tool::Dsctl => {
                out.push(self.dsctl.clone());
                out.push("-j".into());
                out.push(self.server_id.clone());
            }
        }
        out.extend(inv.args.iter().cloned());
        out
    }

    /// Shell-quoted command line for logs and the clipboard, secrets masked.
    pub fn render(&self, inv: &Invocation) -> String {
        let argv = redact(&self.argv(inv));
        shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
    }
}

/// Runs one invocation to a single JSON outcome.
pub trait Executor: Send + Sync {
    fn run(&self, ctx: &ConnectionContext, inv: &Invocation) -> Result<JsonValue, CommandError>;
}

/// Spawns the real tools.
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn run(&self, ctx: &ConnectionContext, inv: &Invocation) -> Result<JsonValue, CommandError> {
        let argv = ctx.argv(inv);
        let Some((program, args)) = argv.split_first() else {
            return Err(CommandError::Empty);
        };
        let rendered = ctx.render(inv);
        tracing::info!(command = %rendered, "running");
        let started = Instant::now();
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let text = if stderr.trim().is_empty() { stdout } else { stderr };
            let desc = error_desc(&text);
            tracing::warn!(command = %rendered, status = ?output.status.code(), elapsed_ms, %desc, "command failed");
            return Err(CommandError::Failed { desc });
        }
        tracing::debug!(command = %rendered, elapsed_ms, "command finished");
        parse_output(program, &String::from_utf8_lossy(&output.stdout))
    }
}

pub fn parse_output(program: &str, text: &str) -> Result<JsonValue, CommandError> {
    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(text).map_err(|source| CommandError::Parse {
        program: program.to_string(),
        source,
    })
}

/// `desc` of a JSON error document, else the trimmed text itself.
pub fn error_desc(text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<JsonValue>(text.trim()) {
        if let Some(desc) = v.get("desc").and_then(|d| d.as_str()) {
            let info = v.get("info").and_then(|i| i.as_str()).unwrap_or("");
            if info.is_empty() {
                return desc.to_string();
            }
            return format!("{desc} ({info})");
        }
    }
    let t = text.trim();
    if t.is_empty() {
        "command failed without output".to_string()
    } else {
        t.to_string()
    }
}

/// Run steps in order; the first failure ends the plan.
pub fn run_plan(
    exec: &dyn Executor,
    ctx: &ConnectionContext,
    steps: &[Invocation],
) -> Result<Vec<JsonValue>, CommandError> {
    let mut outputs = Vec::with_capacity(steps.len());
    for step in steps {
        outputs.push(exec.run(ctx, step)?);
    }
    Ok(outputs)
}
