//! Builds adb invocations for the direct and shell-wrapped command shapes

use std::fmt;
use std::time::Duration;

use crate::error::{AdbError, Result};

/// A fully-formed external process call
///
/// `display` is the command line as a human would type it; `args` is what is
/// actually handed to the OS, without host-shell reinterpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    display: String,
}

impl Invocation {
    /// Build an invocation from a program and its argument vector
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let display = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            program,
            args,
            timeout: None,
            display,
        }
    }

    /// Split a full command line (`"adb devices"`) into an invocation
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = split_command(line)?.into_iter();
        let program = tokens.next().ok_or_else(|| AdbError::InvalidCommand {
            command: line.to_string(),
            reason: "empty command line".to_string(),
        })?;
        Ok(Self::new(program, tokens).with_display(line.trim()))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Command line used for logging and error context
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

fn split_command(cmd: &str) -> Result<Vec<String>> {
    shlex::split(cmd).ok_or_else(|| AdbError::InvalidCommand {
        command: cmd.to_string(),
        reason: "unbalanced quotes".to_string(),
    })
}

/// Composes target-qualified adb command lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFormatter {
    tool: String,
    target: Option<String>,
}

impl CommandFormatter {
    pub fn new(tool: impl Into<String>, target: Option<String>) -> Self {
        Self {
            tool: tool.into(),
            target: target.filter(|t| !t.is_empty()),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// `-s <id>` when a target is bound, empty otherwise
    pub fn target_flag(&self) -> String {
        match &self.target {
            Some(id) => format!("-s {}", id),
            None => String::new(),
        }
    }

    fn target_args(&self) -> Vec<String> {
        match &self.target {
            Some(id) => vec!["-s".to_string(), id.clone()],
            None => Vec::new(),
        }
    }

    /// `<tool> <target-flag> <command>`
    ///
    /// The command is tokenized with POSIX shell quoting rules and passed as a
    /// structured argument vector.
    pub fn direct(&self, cmd: &str) -> Result<Invocation> {
        let mut args = self.target_args();
        args.extend(split_command(cmd)?);
        let display = format!("{} {} {}", self.tool, self.target_flag(), cmd);
        Ok(Invocation::new(self.tool.clone(), args).with_display(display))
    }

    /// Direct variant with caller-supplied tokens, for paths containing spaces
    pub fn direct_args<S: AsRef<str>>(&self, cmd: &[S]) -> Invocation {
        let mut args = self.target_args();
        args.extend(cmd.iter().map(|a| a.as_ref().to_string()));
        Invocation::new(self.tool.clone(), args)
    }

    /// `<tool> <target-flag> shell <command>`
    ///
    /// The command travels as one argument and is interpreted by the device
    /// shell; callers quote device-side metacharacters themselves.
    pub fn shell(&self, cmd: &str) -> Invocation {
        let mut args = self.target_args();
        args.push("shell".to_string());
        args.push(cmd.to_string());
        let display = format!("{} {} shell {}", self.tool, self.target_flag(), cmd);
        Invocation::new(self.tool.clone(), args).with_display(display)
    }

    /// `<tool> <command>` with no target, for enumeration commands
    pub fn untargeted(&self, cmd: &str) -> Result<Invocation> {
        let args = split_command(cmd)?;
        let display = format!("{} {}", self.tool, cmd);
        Ok(Invocation::new(self.tool.clone(), args).with_display(display))
    }
}
